use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{DetectedIngredient, Recipe, RecipeSource, RecommendationSession};

use super::IngredientSet;

/// Read-only view handed to presentation.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSnapshot {
    pub current_recommendations: Vec<Recipe>,
    pub last_scan_ingredients: Vec<DetectedIngredient>,
    pub high_confidence_ingredients: Vec<DetectedIngredient>,
    pub is_available: bool,
}

#[derive(Debug)]
pub(super) struct RecommendationState {
    pub current: RecommendationSnapshot,
    pub processed: IngredientSet,
    pub history: SessionHistory,
}

impl RecommendationState {
    pub fn new(history_limit: usize) -> Self {
        Self {
            current: RecommendationSnapshot::default(),
            processed: IngredientSet::new(),
            history: SessionHistory::new(history_limit),
        }
    }

    pub fn reset_current(&mut self) {
        self.current = RecommendationSnapshot::default();
        self.processed.clear();
    }
}

/// Most-recent-first list of sessions, capped at `limit`.
#[derive(Debug)]
pub struct SessionHistory {
    sessions: VecDeque<RecommendationSession>,
    limit: usize,
    last_id: u64,
}

impl SessionHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            sessions: VecDeque::with_capacity(limit),
            limit: limit.max(1),
            last_id: 0,
        }
    }

    pub fn record(
        &mut self,
        ingredients: Vec<DetectedIngredient>,
        recipes: Vec<Recipe>,
        source: RecipeSource,
        timestamp: DateTime<Utc>,
    ) -> u64 {
        let id = (timestamp.timestamp_millis().max(0) as u64).max(self.last_id + 1);
        self.last_id = id;

        self.sessions.push_front(RecommendationSession {
            id,
            timestamp,
            ingredients,
            recipes,
            source,
            scan_complete: false,
        });
        self.sessions.truncate(self.limit);

        id
    }

    /// Flags the newest session as complete. Returns false when history is empty.
    pub fn mark_head_complete(&mut self) -> bool {
        match self.sessions.front_mut() {
            Some(head) => {
                head.scan_complete = true;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: u64) -> Option<&RecommendationSession> {
        self.sessions.iter().find(|session| session.id == id)
    }

    pub fn to_vec(&self) -> Vec<RecommendationSession> {
        self.sessions.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
