use serde::{Deserialize, Serialize};

/// Detections at or above this confidence gate recommendation fetches and display.
pub const HIGH_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Rectangle in source-frame pixel coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectedIngredient {
    pub name: String,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

impl DetectedIngredient {
    pub fn new(name: impl Into<String>, confidence: f32) -> Self {
        Self {
            name: name.into(),
            confidence: confidence.clamp(0.0, 1.0),
            bounding_box: None,
        }
    }

    pub fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }

    /// Key used for every membership test against previously seen ingredients.
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }

    /// Inclusive: a detection exactly at `threshold` passes.
    pub fn meets(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }

    /// Overlay label, e.g. `tomato (87%)`.
    pub fn label(&self) -> String {
        format!("{} ({:.0}%)", self.name, self.confidence * 100.0)
    }
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
