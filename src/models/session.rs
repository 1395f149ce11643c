use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DetectedIngredient, Recipe};

/// Where the recipes of a session came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RecipeSource {
    Matched,
    Popular,
}

impl RecipeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeSource::Matched => "Matched",
            RecipeSource::Popular => "Popular",
        }
    }
}

/// Snapshot recorded for each recommendation fetch that produced recipes.
/// Only `scan_complete` ever changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSession {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub ingredients: Vec<DetectedIngredient>,
    pub recipes: Vec<Recipe>,
    pub source: RecipeSource,
    pub scan_complete: bool,
}
