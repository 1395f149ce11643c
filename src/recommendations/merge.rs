use std::collections::HashSet;

use crate::models::{Recipe, RecipeId};

/// Appends the recipes of `incoming` whose ids are not yet in `existing`.
/// Existing entries keep their position and content. Returns how many were added.
pub fn merge_recipes(existing: &mut Vec<Recipe>, incoming: &[Recipe]) -> usize {
    let mut seen: HashSet<RecipeId> = existing.iter().map(|r| r.recipe_id.clone()).collect();
    let before = existing.len();

    for recipe in incoming {
        if seen.insert(recipe.recipe_id.clone()) {
            existing.push(recipe.clone());
        }
    }

    existing.len() - before
}
