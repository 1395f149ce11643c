use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Backend recipe identifier. The REST service emits both integer and string ids,
/// so both are accepted and kept in string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RecipeId(pub String);

impl<'de> Deserialize<'de> for RecipeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(value) => RecipeId(value.to_string()),
            RawId::Text(value) => RecipeId(value),
        })
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecipeId {
    fn from(value: &str) -> Self {
        RecipeId(value.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub recipe_id: RecipeId,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time_mins: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time_mins: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time_mins: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredient_match_percentage: Option<f64>,
    #[serde(default)]
    pub matched_ingredients: Vec<String>,
}

impl Recipe {
    pub fn new(recipe_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            recipe_id: RecipeId(recipe_id.into()),
            title: title.into(),
            difficulty: None,
            prep_time_mins: None,
            cook_time_mins: None,
            total_time_mins: None,
            servings: None,
            recommendation_score: None,
            ingredient_match_percentage: None,
            matched_ingredients: Vec::new(),
        }
    }
}
