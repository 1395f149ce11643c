mod detection;
mod recipe;
mod session;

pub use detection::{normalize_name, BoundingBox, DetectedIngredient, HIGH_CONFIDENCE_THRESHOLD};
pub use recipe::{Recipe, RecipeId};
pub use session::{RecipeSource, RecommendationSession};
