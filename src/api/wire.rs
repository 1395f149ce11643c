//! JSON shapes of the REST backend. Everything optional or alternate in the
//! payloads is resolved here so the core only sees the types in `models`.

use serde::{Deserialize, Serialize};

use crate::models::{normalize_name, BoundingBox, DetectedIngredient, Recipe};

#[derive(Debug, Deserialize)]
pub struct LiveScanResponse {
    #[serde(default)]
    pub detected_ingredients: Vec<WireDetection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireDetection {
    pub name: String,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

impl From<WireDetection> for DetectedIngredient {
    fn from(wire: WireDetection) -> Self {
        let ingredient = DetectedIngredient::new(wire.name, wire.confidence);
        match wire.bbox {
            Some(bbox) => ingredient.with_bounding_box(bbox),
            None => ingredient,
        }
    }
}

impl From<&DetectedIngredient> for WireDetection {
    fn from(ingredient: &DetectedIngredient) -> Self {
        Self {
            name: ingredient.name.clone(),
            confidence: ingredient.confidence,
            class_id: None,
            bbox: ingredient.bounding_box,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaveDetectionsRequest {
    pub ingredients: Vec<WireDetection>,
}

#[derive(Debug, Deserialize)]
pub struct SaveDetectionsResponse {
    #[serde(default)]
    pub saved_count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecommendRequest {
    pub detected_ingredients: Vec<WireDetection>,
    pub confidence_threshold: f32,
}

#[derive(Debug, Deserialize)]
pub struct RecommendResponse {
    #[serde(default)]
    pub recommendations: Vec<Recipe>,
    #[serde(default)]
    pub high_confidence_ingredients: Vec<HighConfidenceEntry>,
}

/// The recommend endpoint reports high-confidence ingredients either as
/// `{name, confidence}` objects or, on its degraded paths, as bare names.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum HighConfidenceEntry {
    Scored { name: String, confidence: f32 },
    Name(String),
}

impl RecommendResponse {
    /// Resolves bare names against the submitted detections and drops
    /// anything below `threshold`.
    pub fn high_confidence(
        &self,
        submitted: &[DetectedIngredient],
        threshold: f32,
    ) -> Vec<DetectedIngredient> {
        self.high_confidence_ingredients
            .iter()
            .filter_map(|entry| match entry {
                HighConfidenceEntry::Scored { name, confidence } => {
                    Some(DetectedIngredient::new(name.clone(), *confidence))
                }
                HighConfidenceEntry::Name(name) => {
                    let key = normalize_name(name);
                    submitted.iter().find(|candidate| candidate.key() == key).cloned()
                }
            })
            .filter(|ingredient| ingredient.meets(threshold))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct RecipeListResponse {
    #[serde(default, alias = "data")]
    pub recipes: Vec<Recipe>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
