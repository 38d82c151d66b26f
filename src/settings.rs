use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::annotation::UiBindings;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub model_version: String,
    pub data_root: PathBuf,
    pub pdf_dir: PathBuf,
    pub text_layer_pdf_dir: PathBuf,
    pub png_dir: PathBuf,
    pub out_dir: PathBuf,
    pub predictions_file: PathBuf,
    pub ground_truth_file: PathBuf,
    pub pipeline_command: Option<String>,
    pub pipeline_args: Vec<String>,
    pub ocr_languages: String,
    pub ocr_psm: u32,
    pub image_key: String,
    pub bindings: UiBindings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_version: "0.0.1".to_string(),
            data_root: PathBuf::from("/data"),
            pdf_dir: PathBuf::from("/data/pdf"),
            text_layer_pdf_dir: PathBuf::from("/data/validation"),
            png_dir: PathBuf::from("/data/test_png"),
            out_dir: PathBuf::from("/data/_temp"),
            predictions_file: PathBuf::from("/data/_temp/predictions.json"),
            ground_truth_file: PathBuf::from("/data/validation/ground_truth.json"),
            pipeline_command: None,
            pipeline_args: Vec::new(),
            ocr_languages: "chi_sim+eng+deu".to_string(),
            ocr_psm: 6,
            image_key: "ocr".to_string(),
            bindings: UiBindings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    model: Option<ModelSettings>,
    paths: Option<PathSettings>,
    pipeline: Option<PipelineSettings>,
    ocr: Option<OcrSettings>,
    labels: Option<LabelSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ModelSettings {
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PathSettings {
    data_root: Option<PathBuf>,
    pdf_dir: Option<PathBuf>,
    text_layer_pdf_dir: Option<PathBuf>,
    png_dir: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    predictions_file: Option<PathBuf>,
    ground_truth_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelineSettings {
    command: Option<String>,
    args: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSettings {
    languages: Option<String>,
    psm: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LabelSettings {
    image_key: Option<String>,
    bbox: Option<String>,
    label: Option<String>,
    transcription: Option<String>,
    image: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
    }
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        ordered_paths.push(extra.to_path_buf());
    }

    load_settings_from(&ordered_paths)
}

/// Merges the existing files of `paths` in order over the defaults.
pub fn load_settings_from(paths: &[PathBuf]) -> Result<Settings> {
    let mut settings = Settings::default();
    for path in paths {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }
    Ok(settings)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(model) = incoming.model {
            if let Some(version) = non_blank(model.version) {
                self.model_version = version;
            }
        }
        if let Some(paths) = incoming.paths {
            let targets = [
                (paths.data_root, &mut self.data_root),
                (paths.pdf_dir, &mut self.pdf_dir),
                (paths.text_layer_pdf_dir, &mut self.text_layer_pdf_dir),
                (paths.png_dir, &mut self.png_dir),
                (paths.out_dir, &mut self.out_dir),
                (paths.predictions_file, &mut self.predictions_file),
                (paths.ground_truth_file, &mut self.ground_truth_file),
            ];
            for (value, target) in targets {
                if let Some(path) = value.filter(|path| !path.as_os_str().is_empty()) {
                    *target = path;
                }
            }
        }
        if let Some(pipeline) = incoming.pipeline {
            if let Some(command) = pipeline.command {
                self.pipeline_command = non_blank(Some(command));
            }
            if let Some(args) = pipeline.args {
                self.pipeline_args = args;
            }
        }
        if let Some(ocr) = incoming.ocr {
            if let Some(languages) = non_blank(ocr.languages) {
                self.ocr_languages = languages;
            }
            if let Some(psm) = ocr.psm {
                self.ocr_psm = psm;
            }
        }
        if let Some(labels) = incoming.labels {
            if let Some(key) = non_blank(labels.image_key) {
                self.image_key = key;
            }
            if let Some(name) = non_blank(labels.bbox) {
                self.bindings.bbox = name;
            }
            if let Some(name) = non_blank(labels.label) {
                self.bindings.label = name;
            }
            if let Some(name) = non_blank(labels.transcription) {
                self.bindings.transcription = name;
            }
            if let Some(name) = non_blank(labels.image) {
                self.bindings.image = name;
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".borehole-annotator"))
        }
    })
}
