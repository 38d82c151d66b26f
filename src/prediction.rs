use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Axis-aligned rectangle in source pixel units, y growing downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RectRepr {
    Corners([f64; 4]),
    Named { x0: f64, y0: f64, x1: f64, y1: f64 },
}

impl<'de> Deserialize<'de> for Rect {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rect = match RectRepr::deserialize(deserializer)? {
            RectRepr::Corners([x0, y0, x1, y1]) => Rect::new(x0, y0, x1, y1),
            RectRepr::Named { x0, y0, x1, y1 } => Rect::new(x0, y0, x1, y1),
        };
        Ok(rect)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialDescription {
    pub rect: Rect,
    #[serde(default)]
    pub text: String,
    /// 1-based page the description was found on.
    pub page_number: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepthBound {
    pub rect: Rect,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepthInterval {
    #[serde(default)]
    pub start: Option<DepthBound>,
    #[serde(default)]
    pub end: Option<DepthBound>,
    #[serde(default)]
    pub background_rect: Option<Rect>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayerPrediction {
    pub id: String,
    pub material_description: MaterialDescription,
    #[serde(default)]
    pub depth_interval: Option<DepthInterval>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoordinateValue {
    pub coordinate_value: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Coordinates {
    pub east: CoordinateValue,
    pub north: CoordinateValue,
    pub rect: Rect,
    /// 1-based page the coordinates were found on.
    pub page: usize,
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "E: {}, N: {}",
            self.east.coordinate_value, self.north.coordinate_value
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoreholeMetadata {
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilePredictions {
    #[serde(default)]
    pub page_sizes: Vec<PageSize>,
    #[serde(default)]
    pub metadata: BoreholeMetadata,
    #[serde(default)]
    pub layers: Vec<LayerPrediction>,
}

impl FilePredictions {
    pub fn page_size(&self, page_number: usize) -> Option<PageSize> {
        self.page_sizes.get(page_number).copied()
    }

    /// Layers whose material description sits on the given 0-based page.
    pub fn layers_on_page(&self, page_number: usize) -> impl Iterator<Item = &LayerPrediction> {
        self.layers
            .iter()
            .filter(move |layer| layer.material_description.page_number == page_number + 1)
    }
}

/// Pipeline output keyed by document file name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct PredictionSet {
    pub documents: BTreeMap<String, FilePredictions>,
}

impl PredictionSet {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).with_context(|| "failed to parse pipeline predictions")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read predictions: {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("invalid predictions file: {}", path.display()))
    }

    pub fn get(&self, document: &str) -> Option<&FilePredictions> {
        self.documents.get(document)
    }

    pub fn first(&self) -> Option<(&str, &FilePredictions)> {
        self.documents
            .iter()
            .next()
            .map(|(name, predictions)| (name.as_str(), predictions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "borehole_1.pdf": {
            "page_sizes": [{"width": 600.0, "height": 800.0}, {"width": 600.0, "height": 800.0}],
            "metadata": {
                "coordinates": {
                    "east": {"coordinate_value": 2600000.0},
                    "north": {"coordinate_value": 1200000.0},
                    "rect": [10.0, 20.0, 110.0, 40.0],
                    "page": 1
                }
            },
            "layers": [
                {
                    "id": "a1",
                    "material_description": {"rect": {"x0": 100.0, "y0": 100.0, "x1": 300.0, "y1": 150.0}, "text": "Sandy clay", "page_number": 1},
                    "depth_interval": {
                        "start": {"rect": [20.0, 100.0, 50.0, 110.0], "value": 0.5},
                        "end": {"rect": [20.0, 140.0, 50.0, 150.0], "value": 2.0},
                        "background_rect": [20.0, 100.0, 50.0, 150.0]
                    }
                },
                {
                    "id": "b2",
                    "material_description": {"rect": [100.0, 100.0, 300.0, 150.0], "text": "Gravel", "page_number": 2}
                }
            ]
        }
    }"#;

    #[test]
    fn parses_pipeline_output_with_both_rect_forms() {
        let set = PredictionSet::from_json(SAMPLE).expect("parse");
        let (name, file) = set.first().expect("document");
        assert_eq!(name, "borehole_1.pdf");
        assert_eq!(file.page_sizes.len(), 2);
        let layer = &file.layers[0];
        assert_eq!(layer.material_description.rect.width(), 200.0);
        assert_eq!(layer.material_description.rect.height(), 50.0);
        let interval = layer.depth_interval.as_ref().expect("interval");
        assert_eq!(interval.end.as_ref().map(|end| end.value), Some(2.0));
        assert!(file.layers[1].depth_interval.is_none());
    }

    #[test]
    fn layers_on_page_uses_one_based_storage() {
        let set = PredictionSet::from_json(SAMPLE).expect("parse");
        let file = set.get("borehole_1.pdf").expect("document");
        let first: Vec<_> = file.layers_on_page(0).map(|layer| layer.id.as_str()).collect();
        let second: Vec<_> = file.layers_on_page(1).map(|layer| layer.id.as_str()).collect();
        assert_eq!(first, vec!["a1"]);
        assert_eq!(second, vec!["b2"]);
        assert!(file.page_size(2).is_none());
    }

    #[test]
    fn coordinates_display_both_axes() {
        let set = PredictionSet::from_json(SAMPLE).expect("parse");
        let file = set.get("borehole_1.pdf").expect("document");
        let coordinates = file.metadata.coordinates.as_ref().expect("coordinates");
        assert_eq!(coordinates.to_string(), "E: 2600000, N: 1200000");
    }
}
