use anyhow::{Context, Result, anyhow};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use super::{ImageRegion, RegionTextSource, ScaledRegion};
use crate::command::run_command;
use crate::settings::Settings;
use crate::task::PageImageRef;

/// Reads the embedded text layer of the source PDF inside the region,
/// using poppler's `pdfinfo` and `pdftotext`.
#[derive(Debug, Clone)]
pub struct PdfTextLayer {
    pub pdf_dir: PathBuf,
}

impl PdfTextLayer {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            pdf_dir: settings.text_layer_pdf_dir.clone(),
        }
    }

    fn pdf_path(&self, page: &PageImageRef) -> PathBuf {
        self.pdf_dir.join(page.pdf_file_name())
    }
}

fn page_size_points(pdf: &Path, page: usize) -> Result<(f64, f64)> {
    let page = page.to_string();
    let args: [&OsStr; 5] = [
        OsStr::new("-f"),
        OsStr::new(&page),
        OsStr::new("-l"),
        OsStr::new(&page),
        pdf.as_os_str(),
    ];
    let info = run_command("pdfinfo", args)
        .with_context(|| format!("failed to read pdf info: {}", pdf.display()))?;
    parse_page_size(&info)
}

/// Parses `Page size: 595.32 x 841.92 pts` or `Page    3 size: ...` lines.
fn parse_page_size(info: &str) -> Result<(f64, f64)> {
    for line in info.lines() {
        if !line.starts_with("Page") {
            continue;
        }
        let Some((_, size)) = line.split_once("size:") else {
            continue;
        };
        let mut parts = size.split_whitespace();
        let width = parts.next().and_then(|value| value.parse::<f64>().ok());
        let separator = parts.next();
        let height = parts.next().and_then(|value| value.parse::<f64>().ok());
        if let (Some(width), Some("x"), Some(height)) = (width, separator, height) {
            return Ok((width, height));
        }
    }
    Err(anyhow!("pdfinfo output has no page size"))
}

/// Integer clip box for `pdftotext -r 72`, where one pixel is one point.
fn clip_args(points: &ScaledRegion) -> [String; 4] {
    let x = points.x.max(0.0).floor();
    let y = points.y.max(0.0).floor();
    let right = (points.x + points.width).ceil();
    let bottom = (points.y + points.height).ceil();
    [
        format!("{}", x as i64),
        format!("{}", y as i64),
        format!("{}", (right - x).max(0.0) as i64),
        format!("{}", (bottom - y).max(0.0) as i64),
    ]
}

fn flatten_text(raw: &str) -> String {
    raw.replace('\u{c}', "").replace('\n', " ").trim().to_string()
}

impl RegionTextSource for PdfTextLayer {
    fn name(&self) -> &'static str {
        "pdf-text"
    }

    fn extract_text(&self, page: &PageImageRef, region: &ImageRegion) -> Result<String> {
        let pdf = self.pdf_path(page);
        if !pdf.exists() {
            return Err(anyhow!("pdf not found: {}", pdf.display()));
        }
        let page_index = page.page_number + 1;
        let (page_width, page_height) = page_size_points(&pdf, page_index)?;
        let points = region.rescale(page_width, page_height);
        let [x, y, w, h] = clip_args(&points);
        let page_arg = page_index.to_string();
        let args: [&OsStr; 16] = [
            OsStr::new("-f"),
            OsStr::new(&page_arg),
            OsStr::new("-l"),
            OsStr::new(&page_arg),
            OsStr::new("-r"),
            OsStr::new("72"),
            OsStr::new("-x"),
            OsStr::new(&x),
            OsStr::new("-y"),
            OsStr::new(&y),
            OsStr::new("-W"),
            OsStr::new(&w),
            OsStr::new("-H"),
            OsStr::new(&h),
            pdf.as_os_str(),
            OsStr::new("-"),
        ];
        let raw = run_command("pdftotext", args)
            .with_context(|| format!("failed to extract text from {}", pdf.display()))?;
        Ok(flatten_text(&raw))
    }
}
