use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};

pub mod annotation;
pub mod backend;
mod command;
pub mod depth_interval;
pub mod logging;
pub mod pipeline;
pub mod pre_annotation;
pub mod prediction;
pub mod region_text;
pub mod settings;
pub mod task;
pub mod transcription;

pub use annotation::{AnnotationResult, ModelPrediction, RelationLink, ResultItem};
pub use backend::{LayerExtractionBackend, TranscriptionBackend};
pub use depth_interval::extract_depth_interval;
pub use pre_annotation::{build_model_predictions, to_percentage};
pub use region_text::Strategy;

#[derive(Debug, Clone)]
pub enum Action {
    /// Pre-annotate the page of a task with the layout pipeline's layers.
    Predict {
        task: PathBuf,
        predictions: Option<PathBuf>,
    },
    /// Fill in the transcription of the region drawn last.
    Transcribe {
        task: PathBuf,
        context: PathBuf,
        strategy: Strategy,
    },
    /// Map a stored predictions file without a task.
    Map {
        predictions: PathBuf,
        document: Option<String>,
        page: usize,
        ls_page_width: f64,
    },
    DepthInterval {
        text: String,
    },
    ShowSettings,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub settings_path: Option<String>,
    pub action: Action,
}

pub fn run(config: Config) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    match config.action {
        Action::Predict { task, predictions } => {
            let tasks = task::load_tasks(&task)?;
            let pipeline: Box<dyn pipeline::LayoutPipeline> = match predictions {
                Some(path) => Box::new(pipeline::PredictionsFile { path }),
                None => pipeline::from_settings(&settings),
            };
            let backend = LayerExtractionBackend::new(settings, pipeline);
            to_json(&backend.predict(&tasks)?)
        }
        Action::Transcribe {
            task,
            context,
            strategy,
        } => {
            let tasks = task::load_tasks(&task)?;
            let context = task::load_context(&context)?;
            let source = region_text::build_source(strategy, &settings);
            let backend = TranscriptionBackend::new(settings, source);
            to_json(&backend.predict(&tasks, Some(&context))?)
        }
        Action::Map {
            predictions,
            document,
            page,
            ls_page_width,
        } => {
            if ls_page_width <= 0.0 {
                return Err(anyhow!("ls page width must be positive"));
            }
            let set = prediction::PredictionSet::load(&predictions)?;
            let document = match document {
                Some(name) if set.get(&name).is_none() => {
                    return Err(anyhow!("document not in predictions: {}", name));
                }
                Some(name) => name,
                None => set
                    .first()
                    .map(|(name, _)| name.to_string())
                    .with_context(|| format!("no documents in {}", predictions.display()))?,
            };
            let backend = LayerExtractionBackend::new(
                settings,
                Box::new(pipeline::PredictionsFile { path: predictions }),
            );
            to_json(&backend.map_predictions(&set, &document, page, ls_page_width))
        }
        Action::DepthInterval { text } => Ok(extract_depth_interval(&text)),
        Action::ShowSettings => Ok(format_settings(&settings)),
    }
}

fn to_json(predictions: &[ModelPrediction]) -> Result<String> {
    serde_json::to_string_pretty(predictions).with_context(|| "failed to serialize predictions")
}

fn format_settings(settings: &settings::Settings) -> String {
    let mut lines = Vec::new();
    lines.push(format!("model version: {}", settings.model_version));
    lines.push(format!("data root: {}", settings.data_root.display()));
    lines.push(format!("pdf dir: {}", settings.pdf_dir.display()));
    lines.push(format!(
        "text layer pdf dir: {}",
        settings.text_layer_pdf_dir.display()
    ));
    lines.push(format!("png dir: {}", settings.png_dir.display()));
    lines.push(format!(
        "predictions: {}",
        settings.predictions_file.display()
    ));
    lines.push(format!(
        "pipeline: {}",
        settings.pipeline_command.as_deref().unwrap_or("(stored predictions)")
    ));
    lines.push(format!(
        "ocr: {} (psm {})",
        settings.ocr_languages, settings.ocr_psm
    ));
    lines.push(format!(
        "labels: image={} bbox={} label={} transcription={} to={}",
        settings.image_key,
        settings.bindings.bbox,
        settings.bindings.label,
        settings.bindings.transcription,
        settings.bindings.image
    ));
    lines.join("\n")
}
