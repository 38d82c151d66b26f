use tracing::{info, warn};

use crate::annotation::{
    AnnotationResult, ModelPrediction, Payload, PercentBox, RelationLink, ResultItem, UiBindings,
};
use crate::depth_interval::{DEPTH_INTERVAL_LABEL, format_interval};
use crate::prediction::{FilePredictions, LayerPrediction, PageSize, Rect};

pub const MATERIAL_DESCRIPTION_LABEL: &str = "Material Description";
pub const COORDINATES_LABEL: &str = "Coordinates";

#[derive(Debug, Clone)]
pub struct PreAnnotationConfig {
    pub model_version: String,
    pub bindings: UiBindings,
}

impl Default for PreAnnotationConfig {
    fn default() -> Self {
        Self {
            model_version: "0.0.1".to_string(),
            bindings: UiBindings::default(),
        }
    }
}

pub fn to_percentage(pixel_position: f64, axis_length: f64) -> f64 {
    100.0 * pixel_position / axis_length
}

pub fn percent_box(rect: &Rect, page: PageSize) -> PercentBox {
    PercentBox {
        x: to_percentage(rect.x0, page.width),
        y: to_percentage(rect.y0, page.height),
        width: to_percentage(rect.width(), page.width),
        height: to_percentage(rect.height(), page.height),
    }
}

/// One labelled bounding box before it is expanded into UI primitives.
#[derive(Debug, Clone, PartialEq)]
struct Region {
    id: String,
    label: String,
    geometry: PercentBox,
    text: Option<String>,
}

/// Flattens the predictions of one page into pre-annotation results.
///
/// `page_number` is 0-based. `ls_page_width` is the width of the page image
/// shown in the annotation tool, which may be rendered at a different
/// resolution than the pipeline worked on.
pub fn build_model_predictions(
    predictions: &FilePredictions,
    page_number: usize,
    ls_page_width: f64,
    config: &PreAnnotationConfig,
) -> Vec<ModelPrediction> {
    let result = build_page_results(predictions, page_number, ls_page_width, config);
    vec![ModelPrediction {
        model_version: Some(config.model_version.clone()),
        result,
        score: None,
    }]
}

pub fn build_page_results(
    predictions: &FilePredictions,
    page_number: usize,
    ls_page_width: f64,
    config: &PreAnnotationConfig,
) -> Vec<ResultItem> {
    let Some(page) = predictions.page_size(page_number) else {
        info!("no prediction found for page {}", page_number);
        return Vec::new();
    };
    let scale_factor = ls_page_width / page.width;
    let original_size = (
        (page.width * scale_factor) as u32,
        (page.height * scale_factor) as u32,
    );

    let mut regions = Vec::new();
    if let Some(region) = coordinates_region(predictions, page_number, page) {
        regions.push(region);
    }

    let mut relations = Vec::new();
    for layer in predictions.layers_on_page(page_number) {
        let description = description_region(layer, page);
        match depth_interval_region(layer, page) {
            Some(interval) => {
                relations.push(RelationLink::new(&description.id, &interval.id));
                regions.push(description);
                regions.push(interval);
            }
            None => regions.push(description),
        }
    }

    let mut result: Vec<ResultItem> = regions
        .into_iter()
        .flat_map(|region| expand_region(region, original_size, &config.bindings))
        .map(ResultItem::Annotation)
        .collect();
    result.extend(relations.into_iter().map(ResultItem::Relation));
    result
}

fn coordinates_region(
    predictions: &FilePredictions,
    page_number: usize,
    page: PageSize,
) -> Option<Region> {
    let coordinates = predictions.metadata.coordinates.as_ref()?;
    if coordinates.page != page_number + 1 {
        return None;
    }
    let label = COORDINATES_LABEL.to_string();
    Some(Region {
        id: uuid::Uuid::new_v4().simple().to_string(),
        text: metadata_text(&label, predictions),
        label,
        geometry: percent_box(&coordinates.rect, page),
    })
}

fn metadata_text(label: &str, predictions: &FilePredictions) -> Option<String> {
    match label {
        COORDINATES_LABEL => predictions
            .metadata
            .coordinates
            .as_ref()
            .map(|coordinates| coordinates.to_string()),
        other => {
            warn!("metadata label not found: {}", other);
            None
        }
    }
}

fn description_region(layer: &LayerPrediction, page: PageSize) -> Region {
    let description = &layer.material_description;
    Region {
        id: format!("{}_{}", layer.id, MATERIAL_DESCRIPTION_LABEL),
        label: MATERIAL_DESCRIPTION_LABEL.to_string(),
        geometry: percent_box(&description.rect, page),
        text: Some(description.text.clone()),
    }
}

fn depth_interval_region(layer: &LayerPrediction, page: PageSize) -> Option<Region> {
    let interval = layer.depth_interval.as_ref()?;
    let (rect, text) = match (&interval.start, &interval.end) {
        (None, Some(end)) => (end.rect, format_interval(None, end.value)),
        (Some(start), Some(end)) => (
            interval
                .background_rect
                .unwrap_or_else(|| start.rect.union(&end.rect)),
            format_interval(Some(start.value), end.value),
        ),
        (Some(_), None) => {
            warn!("depth interval for layer {} is not complete", layer.id);
            return None;
        }
        (None, None) => return None,
    };
    Some(Region {
        id: format!("{}_{}", layer.id, DEPTH_INTERVAL_LABEL),
        label: DEPTH_INTERVAL_LABEL.to_string(),
        geometry: percent_box(&rect, page),
        text: Some(text),
    })
}

fn expand_region(
    region: Region,
    original_size: (u32, u32),
    bindings: &UiBindings,
) -> [AnnotationResult; 3] {
    let Region {
        id,
        label,
        geometry,
        text,
    } = region;
    [
        AnnotationResult::new(&id, geometry, original_size, Payload::Outline, bindings),
        AnnotationResult::new(&id, geometry, original_size, Payload::Label(label), bindings),
        AnnotationResult::new(id, geometry, original_size, Payload::Text(text), bindings),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::ResultType;
    use crate::prediction::{
        BoreholeMetadata, CoordinateValue, Coordinates, DepthBound, DepthInterval,
        MaterialDescription,
    };

    fn page() -> PageSize {
        PageSize {
            width: 600.0,
            height: 800.0,
        }
    }

    fn bound(rect: Rect, value: f64) -> DepthBound {
        DepthBound { rect, value }
    }

    fn layer(id: &str, page_number: usize, interval: Option<DepthInterval>) -> LayerPrediction {
        LayerPrediction {
            id: id.to_string(),
            material_description: MaterialDescription {
                rect: Rect::new(120.0, 200.0, 420.0, 280.0),
                text: "Sandy clay".to_string(),
                page_number,
            },
            depth_interval: interval,
        }
    }

    fn complete_interval() -> DepthInterval {
        DepthInterval {
            start: Some(bound(Rect::new(30.0, 200.0, 90.0, 216.0), 0.5)),
            end: Some(bound(Rect::new(30.0, 264.0, 90.0, 280.0), 2.0)),
            background_rect: Some(Rect::new(30.0, 200.0, 90.0, 280.0)),
        }
    }

    fn predictions(layers: Vec<LayerPrediction>) -> FilePredictions {
        FilePredictions {
            page_sizes: vec![page(), page()],
            metadata: BoreholeMetadata::default(),
            layers,
        }
    }

    fn coordinates_on(page: usize) -> BoreholeMetadata {
        BoreholeMetadata {
            coordinates: Some(Coordinates {
                east: CoordinateValue {
                    coordinate_value: 2600000.0,
                },
                north: CoordinateValue {
                    coordinate_value: 1200000.0,
                },
                rect: Rect::new(60.0, 80.0, 240.0, 120.0),
                page,
            }),
        }
    }

    fn annotations(items: &[ResultItem]) -> Vec<&AnnotationResult> {
        items.iter().filter_map(ResultItem::as_annotation).collect()
    }

    fn relations(items: &[ResultItem]) -> Vec<&RelationLink> {
        items.iter().filter_map(ResultItem::as_relation).collect()
    }

    #[test]
    fn percentage_stays_in_range_and_round_trips() {
        let lengths = [1.0, 37.5, 595.0, 842.0, 2480.0];
        for length in lengths {
            for step in 0..=10 {
                let pixel = length * step as f64 / 10.0;
                let percent = to_percentage(pixel, length);
                assert!((0.0..=100.0).contains(&percent));
                let back = percent * length / 100.0;
                assert!((back - pixel).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn complete_layer_gives_six_results_and_one_relation() {
        let file = predictions(vec![layer("a1", 1, Some(complete_interval()))]);
        let items = build_page_results(&file, 0, 1200.0, &PreAnnotationConfig::default());

        let results = annotations(&items);
        assert_eq!(results.len(), 6);
        let links = relations(&items);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].from_id, "a1_Material Description");
        assert_eq!(links[0].to_id, "a1_Depth Interval");
        assert!(matches!(items.last(), Some(ResultItem::Relation(_))));

        let kinds: Vec<_> = results.iter().take(3).map(|result| result.kind).collect();
        assert_eq!(kinds, ResultType::ALL.to_vec());

        let interval: Vec<_> = results
            .iter()
            .filter(|result| result.id == "a1_Depth Interval")
            .collect();
        assert_eq!(interval.len(), 3);
        assert_eq!(interval[0].value.geometry.x, 5.0);
        assert_eq!(interval[0].value.geometry.y, 25.0);
        assert_eq!(interval[0].value.geometry.width, 10.0);
        assert_eq!(interval[0].value.geometry.height, 10.0);
        assert_eq!(
            interval[2].value.text,
            Some(vec!["start: 0.5 end: 2.0".to_string()])
        );
        assert_eq!(
            interval[1].value.labels,
            Some(vec![DEPTH_INTERVAL_LABEL.to_string()])
        );
    }

    #[test]
    fn variants_of_a_region_share_geometry() {
        let file = predictions(vec![layer("a1", 1, Some(complete_interval()))]);
        let items = build_page_results(&file, 0, 600.0, &PreAnnotationConfig::default());
        for chunk in annotations(&items).chunks(3) {
            assert!(chunk.iter().all(|result| result.id == chunk[0].id));
            assert!(chunk.iter().all(|result| result.value.geometry == chunk[0].value.geometry));
        }
    }

    #[test]
    fn start_only_interval_is_skipped() {
        let interval = DepthInterval {
            start: Some(bound(Rect::new(30.0, 200.0, 90.0, 216.0), 0.5)),
            end: None,
            background_rect: None,
        };
        let file = predictions(vec![layer("a1", 1, Some(interval))]);
        let items = build_page_results(&file, 0, 600.0, &PreAnnotationConfig::default());
        assert_eq!(annotations(&items).len(), 3);
        assert!(relations(&items).is_empty());
        assert!(
            annotations(&items)
                .iter()
                .all(|result| result.id == "a1_Material Description")
        );
    }

    #[test]
    fn empty_interval_keeps_only_the_description() {
        let empty = DepthInterval {
            start: None,
            end: None,
            background_rect: None,
        };
        let file = predictions(vec![layer("a1", 1, Some(empty))]);
        let items = build_page_results(&file, 0, 600.0, &PreAnnotationConfig::default());
        assert_eq!(items.len(), 3);
        assert!(relations(&items).is_empty());
        assert!(
            annotations(&items)
                .iter()
                .all(|result| result.id == "a1_Material Description")
        );
    }

    #[test]
    fn end_only_interval_uses_end_rect_and_zero_start() {
        let interval = DepthInterval {
            start: None,
            end: Some(bound(Rect::new(60.0, 400.0, 120.0, 480.0), 12.0)),
            background_rect: None,
        };
        let file = predictions(vec![layer("c3", 1, Some(interval))]);
        let items = build_page_results(&file, 0, 600.0, &PreAnnotationConfig::default());
        let interval: Vec<_> = annotations(&items)
            .into_iter()
            .filter(|result| result.id == "c3_Depth Interval")
            .collect();
        assert_eq!(interval[0].value.geometry.x, 10.0);
        assert_eq!(interval[0].value.geometry.y, 50.0);
        assert_eq!(
            interval[2].value.text,
            Some(vec!["start: 0 end: 12.0".to_string()])
        );
        assert_eq!(relations(&items).len(), 1);
    }

    #[test]
    fn missing_background_rect_falls_back_to_union() {
        let mut interval = complete_interval();
        interval.background_rect = None;
        let file = predictions(vec![layer("a1", 1, Some(interval))]);
        let items = build_page_results(&file, 0, 600.0, &PreAnnotationConfig::default());
        let result = annotations(&items)
            .into_iter()
            .find(|result| result.id == "a1_Depth Interval")
            .expect("interval region");
        assert_eq!(result.value.geometry.y, 25.0);
        assert_eq!(result.value.geometry.height, 10.0);
    }

    #[test]
    fn only_layers_of_requested_page_are_mapped() {
        let file = predictions(vec![
            layer("a1", 1, None),
            layer("b2", 2, Some(complete_interval())),
        ]);
        let items = build_page_results(&file, 1, 600.0, &PreAnnotationConfig::default());
        assert!(annotations(&items).iter().all(|result| result.id.starts_with("b2_")));
        assert_eq!(annotations(&items).len(), 6);
    }

    #[test]
    fn original_size_is_scaled_and_truncated() {
        let file = predictions(vec![layer("a1", 1, None)]);
        let items = build_page_results(&file, 0, 1500.0, &PreAnnotationConfig::default());
        let result = annotations(&items)[0];
        assert_eq!(result.original_width, 1500);
        assert_eq!(result.original_height, 2000);
    }

    #[test]
    fn coordinates_on_other_page_are_not_emitted() {
        let mut file = predictions(Vec::new());
        file.metadata = coordinates_on(2);
        let items = build_page_results(&file, 0, 600.0, &PreAnnotationConfig::default());
        assert!(items.is_empty());
    }

    #[test]
    fn coordinates_on_requested_page_are_emitted() {
        let mut file = predictions(Vec::new());
        file.metadata = coordinates_on(1);
        let items = build_page_results(&file, 0, 600.0, &PreAnnotationConfig::default());
        let results = annotations(&items);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id.len(), 32);
        assert!(results.iter().all(|result| result.id == results[0].id));
        assert_eq!(
            results[1].value.labels,
            Some(vec![COORDINATES_LABEL.to_string()])
        );
        assert_eq!(
            results[2].value.text,
            Some(vec!["E: 2600000, N: 1200000".to_string()])
        );
        assert_eq!(results[0].value.geometry.x, 10.0);
        assert_eq!(results[0].value.geometry.height, 5.0);
    }

    #[test]
    fn unknown_page_yields_nothing() {
        let file = predictions(vec![layer("a1", 1, None)]);
        let items = build_page_results(&file, 5, 600.0, &PreAnnotationConfig::default());
        assert!(items.is_empty());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let file = predictions(vec![
            layer("a1", 1, Some(complete_interval())),
            layer("b2", 1, None),
        ]);
        let config = PreAnnotationConfig::default();
        let first = build_model_predictions(&file, 0, 900.0, &config);
        let second = build_model_predictions(&file, 0, 900.0, &config);
        assert_eq!(first, second);
        assert_eq!(first[0].model_version.as_deref(), Some("0.0.1"));
    }

    #[test]
    fn unknown_metadata_label_has_no_text() {
        let file = predictions(Vec::new());
        assert_eq!(metadata_text("Elevation", &file), None);
    }
}
