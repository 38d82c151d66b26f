use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::annotation::ModelPrediction;
use crate::pipeline::LayoutPipeline;
use crate::pre_annotation::{PreAnnotationConfig, build_model_predictions};
use crate::prediction::PredictionSet;
use crate::region_text::RegionTextSource;
use crate::settings::Settings;
use crate::task::{InteractionContext, PageImageRef, Task};
use crate::transcription::transcribe_region;

/// Pre-annotates a page image with the layers the layout pipeline found.
pub struct LayerExtractionBackend {
    settings: Settings,
    pipeline: Box<dyn LayoutPipeline>,
}

impl LayerExtractionBackend {
    pub fn new(settings: Settings, pipeline: Box<dyn LayoutPipeline>) -> Self {
        Self { settings, pipeline }
    }

    fn pdf_path(&self, page: &PageImageRef) -> PathBuf {
        let mut path = self.settings.pdf_dir.clone();
        if let Some(project) = &page.project {
            path.push(project);
        }
        path.push(page.pdf_file_name());
        path
    }

    fn image_path(&self, page: &PageImageRef) -> PathBuf {
        self.settings.data_root.join(&page.image_path)
    }

    pub fn predict(&self, tasks: &[Task]) -> Result<Vec<ModelPrediction>> {
        let Some(task) = tasks.first() else {
            return Ok(Vec::new());
        };
        let page = task.page_image(&self.settings.image_key)?;
        let pdf = self.pdf_path(&page);
        info!("running prediction on {} page {}", pdf.display(), page.page_number);

        let predictions = self.pipeline.run(&pdf)?;
        let image = self.image_path(&page);
        let (ls_page_width, _) = image::image_dimensions(&image)
            .with_context(|| format!("failed to read page image size: {}", image.display()))?;
        Ok(self.map_predictions(
            &predictions,
            &page.pdf_file_name(),
            page.page_number,
            ls_page_width as f64,
        ))
    }

    /// Maps `document` out of `predictions`. A set holding a single document
    /// is used as is, whatever its key.
    pub fn map_predictions(
        &self,
        predictions: &PredictionSet,
        document: &str,
        page_number: usize,
        ls_page_width: f64,
    ) -> Vec<ModelPrediction> {
        let file = match predictions.get(document) {
            Some(file) => file,
            None if predictions.documents.len() == 1 => match predictions.first() {
                Some((_, file)) => file,
                None => return Vec::new(),
            },
            None => {
                info!("no prediction found for {}", document);
                return Vec::new();
            }
        };
        if file.page_size(page_number).is_none() {
            info!("no prediction found for {} page {}", document, page_number);
            return Vec::new();
        }
        let config = PreAnnotationConfig {
            model_version: self.settings.model_version.clone(),
            bindings: self.settings.bindings.clone(),
        };
        build_model_predictions(file, page_number, ls_page_width, &config)
    }
}

/// Fills in the transcription of a freshly drawn region.
pub struct TranscriptionBackend {
    settings: Settings,
    source: Box<dyn RegionTextSource>,
}

impl TranscriptionBackend {
    pub fn new(settings: Settings, source: Box<dyn RegionTextSource>) -> Self {
        Self { settings, source }
    }

    pub fn predict(
        &self,
        tasks: &[Task],
        context: Option<&InteractionContext>,
    ) -> Result<Vec<ModelPrediction>> {
        let (Some(task), Some(context)) = (tasks.first(), context) else {
            return Ok(Vec::new());
        };
        if context.result.is_empty() {
            return Ok(Vec::new());
        }
        let page = task.page_image(&self.settings.image_key)?;
        transcribe_region(
            self.source.as_ref(),
            &page,
            context,
            &self.settings.bindings,
        )
    }
}
