use serde::{Deserialize, Serialize};

pub const ORIGIN_MANUAL: &str = "manual";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Rectangle,
    Labels,
    Textarea,
}

impl ResultType {
    pub const ALL: [ResultType; 3] = [ResultType::Rectangle, ResultType::Labels, ResultType::Textarea];
}

/// Control tag names of the labelling interface the results are bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiBindings {
    pub bbox: String,
    pub label: String,
    pub transcription: String,
    pub image: String,
}

impl Default for UiBindings {
    fn default() -> Self {
        Self {
            bbox: "bbox".to_string(),
            label: "label".to_string(),
            transcription: "transcription".to_string(),
            image: "image".to_string(),
        }
    }
}

impl UiBindings {
    pub fn from_name(&self, kind: ResultType) -> &str {
        match kind {
            ResultType::Rectangle => &self.bbox,
            ResultType::Labels => &self.label,
            ResultType::Textarea => &self.transcription,
        }
    }
}

/// Region geometry in percent of the page dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationValue {
    #[serde(flatten)]
    pub geometry: PercentBox,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
}

/// What a single UI primitive carries on top of the shared geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Outline,
    Label(String),
    Text(Option<String>),
}

impl Payload {
    pub fn kind(&self) -> ResultType {
        match self {
            Payload::Outline => ResultType::Rectangle,
            Payload::Label(_) => ResultType::Labels,
            Payload::Text(_) => ResultType::Textarea,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationResult {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResultType,
    pub value: AnnotationValue,
    pub original_width: u32,
    pub original_height: u32,
    #[serde(default)]
    pub image_rotation: u32,
    pub origin: String,
    pub from_name: String,
    pub to_name: String,
}

impl AnnotationResult {
    pub fn new(
        id: impl Into<String>,
        geometry: PercentBox,
        original_size: (u32, u32),
        payload: Payload,
        bindings: &UiBindings,
    ) -> Self {
        let kind = payload.kind();
        let (labels, text) = match payload {
            Payload::Outline => (None, None),
            Payload::Label(label) => (Some(vec![label]), None),
            Payload::Text(text) => (None, text.map(|text| vec![text])),
        };
        Self {
            id: id.into(),
            kind,
            value: AnnotationValue {
                geometry,
                rotation: 0.0,
                labels,
                text,
            },
            original_width: original_size.0,
            original_height: original_size.1,
            image_rotation: 0,
            origin: ORIGIN_MANUAL.to_string(),
            from_name: bindings.from_name(kind).to_string(),
            to_name: bindings.image.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Relation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationDirection {
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationLink {
    #[serde(rename = "type")]
    pub kind: RelationType,
    pub from_id: String,
    pub to_id: String,
    pub direction: RelationDirection,
}

impl RelationLink {
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>) -> Self {
        Self {
            kind: RelationType::Relation,
            from_id: from_id.into(),
            to_id: to_id.into(),
            direction: RelationDirection::Right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultItem {
    Annotation(AnnotationResult),
    Relation(RelationLink),
    /// A result received from the annotation tool and handed back unchanged.
    Passthrough(serde_json::Value),
}

impl ResultItem {
    pub fn as_annotation(&self) -> Option<&AnnotationResult> {
        match self {
            ResultItem::Annotation(result) => Some(result),
            _ => None,
        }
    }

    pub fn as_relation(&self) -> Option<&RelationLink> {
        match self {
            ResultItem::Relation(link) => Some(link),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPrediction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    pub result: Vec<ResultItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}
