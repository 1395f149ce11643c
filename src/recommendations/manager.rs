use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::api::ScanBackend;
use crate::events::{EventBus, NoticeLevel, ScannerEvent};
use crate::models::{
    DetectedIngredient, Recipe, RecipeSource, RecommendationSession, HIGH_CONFIDENCE_THRESHOLD,
};

use super::merge::merge_recipes;
use super::state::{RecommendationSnapshot, RecommendationState};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecommendationConfig {
    pub confidence_threshold: f32,
    pub history_limit: usize,
    pub fallback_limit: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: HIGH_CONFIDENCE_THRESHOLD,
            history_limit: 10,
            fallback_limit: 5,
        }
    }
}

/// What a recommendation fetch did to the visible list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Matching recipes arrived; `added` of them were new to the list.
    Matched { added: usize },
    /// Nothing matched and the list was empty, so popular recipes were shown.
    Fallback { count: usize },
    /// Nothing usable arrived; the existing list was kept as is.
    Preserved,
    /// Nothing usable arrived and there was nothing to fall back to.
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FallbackReason {
    NoMatches,
    Unavailable,
}

/// Turns detection batches into a merged, monotonically growing recipe list
/// plus a bounded history of sessions. All mutation goes through this handle.
#[derive(Clone)]
pub struct RecommendationManager {
    state: Arc<Mutex<RecommendationState>>,
    backend: Arc<dyn ScanBackend>,
    events: EventBus,
    config: RecommendationConfig,
}

impl RecommendationManager {
    pub fn new(
        backend: Arc<dyn ScanBackend>,
        events: EventBus,
        config: RecommendationConfig,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(RecommendationState::new(config.history_limit))),
            backend,
            events,
            config,
        }
    }

    /// Feeds one detection batch in. Returns `None` when no unseen
    /// high-confidence ingredient was in it, in which case nothing is fetched.
    pub async fn on_detection_batch(&self, batch: &[DetectedIngredient]) -> Option<FetchOutcome> {
        let threshold = self.config.confidence_threshold;
        let ingredients = {
            let mut state = self.state.lock().await;
            let high_confidence: Vec<DetectedIngredient> = batch
                .iter()
                .filter(|ingredient| ingredient.meets(threshold))
                .cloned()
                .collect();

            let fresh = state.processed.absorb(&high_confidence);
            if fresh.is_empty() {
                debug!("no new ingredients in batch of {}, keeping recommendations", batch.len());
                return None;
            }

            info!(
                "found {} new ingredients: {}",
                fresh.len(),
                fresh
                    .iter()
                    .map(|ingredient| ingredient.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            state.processed.to_vec()
        };

        Some(self.fetch_recommendations(ingredients).await)
    }

    pub async fn fetch_recommendations(
        &self,
        ingredients: Vec<DetectedIngredient>,
    ) -> FetchOutcome {
        info!(
            "fetching recommendations for {}",
            ingredients
                .iter()
                .map(DetectedIngredient::label)
                .collect::<Vec<_>>()
                .join(", ")
        );

        match self
            .backend
            .recommend_recipes(&ingredients, self.config.confidence_threshold)
            .await
        {
            Ok(response) if !response.recipes.is_empty() => {
                let high_confidence = response
                    .high_confidence_ingredients
                    .into_iter()
                    .filter(|ingredient| ingredient.meets(self.config.confidence_threshold))
                    .collect();
                self.apply(ingredients, response.recipes, high_confidence, RecipeSource::Matched)
                    .await
            }
            Ok(_) => {
                info!("recommendation service matched no recipes");
                self.fallback_or_preserve(ingredients, FallbackReason::NoMatches)
                    .await
            }
            Err(err) => {
                warn!("failed to fetch recommendations: {err}");
                self.fallback_or_preserve(ingredients, FallbackReason::Unavailable)
                    .await
            }
        }
    }

    async fn apply(
        &self,
        ingredients: Vec<DetectedIngredient>,
        recipes: Vec<Recipe>,
        high_confidence: Vec<DetectedIngredient>,
        source: RecipeSource,
    ) -> FetchOutcome {
        let count = recipes.len();
        let (had_existing, added, total) = {
            let mut state = self.state.lock().await;
            let had_existing = !state.current.current_recommendations.is_empty();
            let added = merge_recipes(&mut state.current.current_recommendations, &recipes);

            state.current.last_scan_ingredients = ingredients.clone();
            state.current.high_confidence_ingredients = high_confidence;
            state.current.is_available = true;

            let id = state
                .history
                .record(ingredients, recipes, source, Utc::now());
            debug!("recorded {} session {id} with {count} recipes", source.as_str());

            (had_existing, added, state.current.current_recommendations.len())
        };

        info!("merged {added} new recipes into {total} recommendations");
        self.events
            .emit(ScannerEvent::RecommendationsUpdated { total, added });

        match source {
            RecipeSource::Matched => {
                if had_existing && added > 0 {
                    let plural = if added > 1 { "s" } else { "" };
                    self.events.notify(
                        NoticeLevel::Success,
                        format!("Found {added} additional recipe recommendation{plural}!"),
                    );
                }
                FetchOutcome::Matched { added }
            }
            RecipeSource::Popular => FetchOutcome::Fallback { count },
        }
    }

    async fn fallback_or_preserve(
        &self,
        ingredients: Vec<DetectedIngredient>,
        reason: FallbackReason,
    ) -> FetchOutcome {
        let has_existing = !self
            .state
            .lock()
            .await
            .current
            .current_recommendations
            .is_empty();

        if has_existing {
            info!("keeping existing recommendations");
            if reason == FallbackReason::Unavailable {
                self.events.notify(
                    NoticeLevel::Warning,
                    "Failed to fetch additional recommendations",
                );
            }
            return FetchOutcome::Preserved;
        }

        match self.backend.popular_recipes(self.config.fallback_limit).await {
            Ok(recipes) if !recipes.is_empty() => {
                let message = match reason {
                    FallbackReason::NoMatches => {
                        "Showing popular recipes since no matches found for detected ingredients"
                    }
                    FallbackReason::Unavailable => {
                        "Showing popular recipes (recommendation service unavailable)"
                    }
                };
                let outcome = self
                    .apply(ingredients, recipes, Vec::new(), RecipeSource::Popular)
                    .await;
                self.events.notify(NoticeLevel::Info, message);
                outcome
            }
            Ok(_) => {
                self.events.notify(
                    NoticeLevel::Info,
                    "No recipe recommendations found for detected ingredients",
                );
                FetchOutcome::Empty
            }
            Err(err) => {
                warn!("fallback recipe listing failed: {err}");
                self.events
                    .notify(NoticeLevel::Error, "Failed to load recipe recommendations");
                FetchOutcome::Empty
            }
        }
    }

    /// Flags the newest session as complete. Idempotent.
    pub async fn mark_scan_complete(&self) -> bool {
        self.state.lock().await.history.mark_head_complete()
    }

    /// Empties the current recommendations and forgets processed ingredients.
    /// History is kept.
    pub async fn clear(&self) {
        self.state.lock().await.reset_current();
    }

    pub async fn get_session(&self, id: u64) -> Option<RecommendationSession> {
        self.state.lock().await.history.get(id).cloned()
    }

    pub async fn snapshot(&self) -> RecommendationSnapshot {
        self.state.lock().await.current.clone()
    }

    pub async fn history(&self) -> Vec<RecommendationSession> {
        self.state.lock().await.history.to_vec()
    }

    pub fn config(&self) -> &RecommendationConfig {
        &self.config
    }
}
