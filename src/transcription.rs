use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::annotation::{AnnotationResult, ModelPrediction, Payload, PercentBox, ResultItem, UiBindings};
use crate::depth_interval::{DEPTH_INTERVAL_LABEL, extract_depth_interval};
use crate::region_text::{ImageRegion, RegionTextSource};
use crate::task::{InteractionContext, PageImageRef};

#[derive(Debug, Clone, Deserialize)]
struct DrawnValue {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    #[serde(default)]
    labels: Option<Vec<String>>,
}

/// A region result as the annotation tool reports it.
#[derive(Debug, Clone, Deserialize)]
struct DrawnRegion {
    id: String,
    #[serde(default)]
    from_name: Option<String>,
    to_name: String,
    value: DrawnValue,
    original_width: f64,
    original_height: f64,
}

#[derive(Debug, Deserialize)]
struct LabelledResult {
    #[serde(default)]
    from_name: Option<String>,
    #[serde(default)]
    value: Option<LabelledValue>,
}

#[derive(Debug, Deserialize)]
struct LabelledValue {
    #[serde(default)]
    labels: Option<Vec<String>>,
}

fn is_depth_interval(result: &serde_json::Value, bindings: &UiBindings) -> bool {
    let Ok(labelled) = LabelledResult::deserialize(result) else {
        return false;
    };
    labelled.from_name.as_deref() == Some(bindings.label.as_str())
        && labelled
            .value
            .and_then(|value| value.labels)
            .is_some_and(|labels| labels == [DEPTH_INTERVAL_LABEL])
}

/// Fills the transcription of the region drawn last with text read from
/// the page by `source`.
///
/// Returns no prediction when nothing has been drawn yet. When the context
/// marks the region as a depth interval, the text is reduced to
/// `start: X end: Y`.
pub fn transcribe_region(
    source: &dyn RegionTextSource,
    page: &PageImageRef,
    context: &InteractionContext,
    bindings: &UiBindings,
) -> Result<Vec<ModelPrediction>> {
    let Some(last) = context.result.last() else {
        return Ok(Vec::new());
    };
    let drawn = DrawnRegion::deserialize(last).with_context(|| "invalid region in context")?;
    debug!(
        "transcribing region {} from {:?} labels {:?}",
        drawn.id, drawn.from_name, drawn.value.labels
    );

    let region = ImageRegion::from_percent(
        drawn.value.x,
        drawn.value.y,
        drawn.value.width,
        drawn.value.height,
        drawn.original_width,
        drawn.original_height,
    );
    let mut text = source
        .extract_text(page, &region)
        .with_context(|| format!("{} failed to read region {}", source.name(), drawn.id))?;

    if context
        .result
        .iter()
        .any(|result| is_depth_interval(result, bindings))
    {
        text = extract_depth_interval(&text);
    }
    info!("{} read {:?} for region {}", source.name(), text, drawn.id);

    let geometry = PercentBox {
        x: region.x / region.image_width * 100.0,
        y: region.y / region.image_height * 100.0,
        width: region.width / region.image_width * 100.0,
        height: region.height / region.image_height * 100.0,
    };
    let mut transcription = AnnotationResult::new(
        drawn.id,
        geometry,
        (drawn.original_width as u32, drawn.original_height as u32),
        Payload::Text(Some(text)),
        bindings,
    );
    transcription.to_name = drawn.to_name;

    Ok(vec![ModelPrediction {
        model_version: None,
        result: vec![
            ResultItem::Annotation(transcription),
            ResultItem::Passthrough(last.clone()),
        ],
        score: Some(0.0),
    }])
}
