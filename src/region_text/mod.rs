mod pdf_text;
mod tesseract;

use anyhow::Result;
use std::str::FromStr;

use crate::task::PageImageRef;

pub use pdf_text::PdfTextLayer;
pub use tesseract::{TesseractOcr, list_tesseract_languages};

/// A region drawn on the page image, in pixels of the image as rendered by
/// the annotation tool (`image_width` x `image_height`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub image_width: f64,
    pub image_height: f64,
}

impl ImageRegion {
    pub fn from_percent(
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        image_width: f64,
        image_height: f64,
    ) -> Self {
        Self {
            x: x * image_width / 100.0,
            y: y * image_height / 100.0,
            width: width * image_width / 100.0,
            height: height * image_height / 100.0,
            image_width,
            image_height,
        }
    }

    /// The same region on a surface of `target_width` x `target_height`.
    pub fn rescale(&self, target_width: f64, target_height: f64) -> ScaledRegion {
        let sx = target_width / self.image_width;
        let sy = target_height / self.image_height;
        ScaledRegion {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Reads the text inside a region of a page.
pub trait RegionTextSource {
    fn name(&self) -> &'static str;

    fn extract_text(&self, page: &PageImageRef, region: &ImageRegion) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Ocr,
    PdfText,
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ocr" | "tesseract" => Ok(Strategy::Ocr),
            "pdf" | "pdf-text" | "text-layer" => Ok(Strategy::PdfText),
            other => Err(anyhow::anyhow!("unknown text strategy: {}", other)),
        }
    }
}

pub fn build_source(strategy: Strategy, settings: &crate::settings::Settings) -> Box<dyn RegionTextSource> {
    match strategy {
        Strategy::Ocr => Box::new(TesseractOcr::from_settings(settings)),
        Strategy::PdfText => Box::new(PdfTextLayer::from_settings(settings)),
    }
}
