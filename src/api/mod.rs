mod error;
mod http;
pub mod wire;

pub use error::{BackendError, BackendResult};
pub use http::HttpBackend;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::models::{DetectedIngredient, Recipe};

/// Result of a recommendation request, normalised at the transport boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recommendations {
    pub recipes: Vec<Recipe>,
    pub high_confidence_ingredients: Vec<DetectedIngredient>,
}

/// REST backend consumed by the scanner and the recommendation manager.
#[async_trait]
pub trait ScanBackend: Send + Sync {
    /// Runs ingredient detection on one JPEG-encoded frame. Implementations must
    /// return `BackendError::Aborted` promptly once `cancel` fires.
    async fn detect_ingredients(
        &self,
        jpeg: Vec<u8>,
        cancel: CancellationToken,
    ) -> BackendResult<Vec<DetectedIngredient>>;

    /// Persists a detection set to the user's pantry.
    async fn save_detections(&self, ingredients: &[DetectedIngredient]) -> BackendResult<usize>;

    async fn recommend_recipes(
        &self,
        ingredients: &[DetectedIngredient],
        confidence_threshold: f32,
    ) -> BackendResult<Recommendations>;

    /// Unfiltered recipe listing used when matching yields nothing.
    async fn popular_recipes(&self, limit: usize) -> BackendResult<Vec<Recipe>>;
}
