use anyhow::{Context, Result, anyhow};
use image::{DynamicImage, GenericImageView};
use std::ffi::OsStr;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::{ImageRegion, RegionTextSource};
use crate::command::run_command;
use crate::settings::Settings;
use crate::task::PageImageRef;

pub fn list_tesseract_languages() -> Result<Vec<String>> {
    let stdout = run_command("tesseract", ["--list-langs"])
        .with_context(|| "failed to run tesseract --list-langs")?;
    let mut langs = Vec::new();
    for (idx, line) in stdout.lines().enumerate() {
        if idx == 0 {
            continue;
        }
        let value = line.trim();
        if !value.is_empty() {
            langs.push(value.to_string());
        }
    }
    Ok(langs)
}

fn normalize_ocr_languages(requested: &str, available: Option<&[String]>) -> Result<String> {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("ocr languages is empty"));
    }
    let Some(available) = available else {
        return Ok(trimmed.to_string());
    };

    let mut chosen = Vec::new();
    let mut missing = Vec::new();
    for raw in trimmed.split(['+', ',', ' ']) {
        let lang = raw.trim();
        if lang.is_empty() {
            continue;
        }
        if available.iter().any(|value| value == lang) {
            chosen.push(lang.to_string());
        } else {
            missing.push(lang.to_string());
        }
    }

    if chosen.is_empty() {
        return Err(anyhow!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        ));
    }
    if !missing.is_empty() {
        warn!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        );
    }

    Ok(chosen.join("+"))
}

/// OCR on a crop of the rendered page image.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    pub png_dir: PathBuf,
    pub languages: String,
    pub psm: u32,
}

impl TesseractOcr {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            png_dir: settings.png_dir.clone(),
            languages: settings.ocr_languages.clone(),
            psm: settings.ocr_psm,
        }
    }

    fn load_page_image(&self, page: &PageImageRef) -> Result<DynamicImage> {
        if page.is_s3() {
            return Err(anyhow!(
                "remote storage images are not supported: {}",
                page.reference
            ));
        }
        let path = self.png_dir.join(page.file_name());
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read page image: {}", path.display()))?;
        image::load_from_memory(&bytes).with_context(|| "failed to decode image for OCR")
    }

    fn run_tesseract(&self, crop: &DynamicImage) -> Result<String> {
        let available = list_tesseract_languages().ok();
        let languages = normalize_ocr_languages(&self.languages, available.as_deref())?;

        let mut tmp = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .with_context(|| "failed to create temp file for OCR")?;
        crop.write_to(&mut tmp, image::ImageFormat::Png)
            .with_context(|| "failed to write temp image for OCR")?;
        tmp.flush()
            .with_context(|| "failed to flush temp image for OCR")?;

        let psm = self.psm.to_string();
        let args: [&OsStr; 6] = [
            tmp.path().as_os_str(),
            OsStr::new("stdout"),
            OsStr::new("-l"),
            OsStr::new(&languages),
            OsStr::new("--psm"),
            OsStr::new(&psm),
        ];
        run_command("tesseract", args)
    }
}

/// Pixel crop box of `region` within an image of `width` x `height`.
fn crop_box(region: &ImageRegion, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let scaled = region.rescale(width as f64, height as f64);
    let x0 = scaled.x.max(0.0).floor().min(width as f64) as u32;
    let y0 = scaled.y.max(0.0).floor().min(height as f64) as u32;
    let x1 = (scaled.x + scaled.width).ceil().clamp(0.0, width as f64) as u32;
    let y1 = (scaled.y + scaled.height).ceil().clamp(0.0, height as f64) as u32;
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0, y0, x1 - x0, y1 - y0))
}

impl RegionTextSource for TesseractOcr {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn extract_text(&self, page: &PageImageRef, region: &ImageRegion) -> Result<String> {
        let image = self.load_page_image(page)?;
        let (width, height) = image.dimensions();
        let Some((x, y, w, h)) = crop_box(region, width, height) else {
            debug!("region lies outside of page image {}", page.file_name());
            return Ok(String::new());
        };
        let crop = image.crop_imm(x, y, w, h);
        let text = self.run_tesseract(&crop)?;
        Ok(text.trim().to_string())
    }
}
