use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Task {
    pub fn data_str(&self, key: &str) -> Result<&str> {
        self.data
            .get(key)
            .and_then(|value| value.as_str())
            .ok_or_else(|| anyhow!("task data has no string field {:?}", key))
    }

    pub fn page_image(&self, key: &str) -> Result<PageImageRef> {
        PageImageRef::parse(self.data_str(key)?)
    }
}

/// Interaction context sent along with a task: the regions drawn so far.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionContext {
    #[serde(default)]
    pub result: Vec<serde_json::Value>,
}

pub fn load_tasks(path: &Path) -> Result<Vec<Task>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read tasks: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse tasks: {}", path.display()))?;
    let tasks = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(tasks)
}

pub fn load_context(path: &Path) -> Result<InteractionContext> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read context: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse context: {}", path.display()))
}

/// A rendered page image named `<document>_<page>.png`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImageRef {
    pub reference: String,
    /// Path part after the `?d=` query of local file URLs.
    pub image_path: String,
    pub project: Option<String>,
    pub document: String,
    /// 0-based.
    pub page_number: usize,
}

impl PageImageRef {
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        let image_path = reference
            .rsplit_once('=')
            .map(|(_, path)| path)
            .unwrap_or(reference);
        let mut segments = image_path.rsplit('/');
        let file_name = segments
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| anyhow!("image reference has no file name: {}", reference))?;
        let project = segments
            .next()
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let stem = file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(file_name);
        let (document, page) = stem
            .rsplit_once('_')
            .ok_or_else(|| anyhow!("image name lacks a page suffix: {}", file_name))?;
        let page_number = page
            .parse::<usize>()
            .with_context(|| format!("invalid page number in image name: {}", file_name))?;
        Ok(Self {
            reference: reference.to_string(),
            image_path: image_path.to_string(),
            project,
            document: document.to_string(),
            page_number,
        })
    }

    pub fn file_name(&self) -> &str {
        self.image_path.rsplit('/').next().unwrap_or(&self.image_path)
    }

    pub fn pdf_file_name(&self) -> String {
        format!("{}.pdf", self.document)
    }

    pub fn is_s3(&self) -> bool {
        self.reference.starts_with("s3:")
    }
}
