use std::collections::HashMap;

use crate::models::DetectedIngredient;

/// Ingredients already handled in this session, keyed by normalised name and
/// kept in first-seen order. Each entry holds the most confident sighting.
#[derive(Debug, Clone, Default)]
pub struct IngredientSet {
    entries: Vec<DetectedIngredient>,
    index: HashMap<String, usize>,
}

impl IngredientSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `batch` in and returns the detections whose names were not seen
    /// before. Known names only have their confidence raised.
    pub fn absorb(&mut self, batch: &[DetectedIngredient]) -> Vec<DetectedIngredient> {
        let mut fresh = Vec::new();

        for ingredient in batch {
            let key = ingredient.key();
            match self.index.get(&key) {
                Some(&slot) => {
                    if ingredient.confidence > self.entries[slot].confidence {
                        self.entries[slot] = ingredient.clone();
                    }
                }
                None => {
                    self.index.insert(key, self.entries.len());
                    self.entries.push(ingredient.clone());
                    fresh.push(ingredient.clone());
                }
            }
        }

        fresh
    }

    pub fn to_vec(&self) -> Vec<DetectedIngredient> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}
