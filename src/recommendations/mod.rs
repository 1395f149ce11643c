mod ingredients;
mod manager;
mod merge;
mod state;

pub use ingredients::IngredientSet;
pub use manager::{FetchOutcome, RecommendationConfig, RecommendationManager};
pub use merge::merge_recipes;
pub use state::{RecommendationSnapshot, SessionHistory};
