//! Pure plan transformations: generate, re-roll one slot, mark an item.
//!
//! Nothing here touches storage; [`crate::service::Planner`] wraps these in
//! the read / compute / write cycle.

use chrono::Utc;

use crate::aggregate::aggregate;
use crate::error::{PlanError, PlanResult};
use crate::models::{DAYS_PER_PLAN, LAST_SLOT, MealPlan, Recipe};
use crate::random::IndexSource;

fn draw<'a, T>(items: &'a [T], rng: &mut dyn IndexSource) -> &'a T {
    // Reduce again so a misbehaving source cannot index out of bounds
    &items[rng.next_index(items.len()) % items.len()]
}

/// Draw seven recipes with replacement and build a fresh shopping list.
///
/// Pools smaller than seven recipes are fine; days simply repeat.
pub fn generate(pool: &[Recipe], rng: &mut dyn IndexSource) -> PlanResult<MealPlan> {
    if pool.is_empty() {
        return Err(PlanError::EmptyPool);
    }
    let recipes: [Recipe; DAYS_PER_PLAN] = std::array::from_fn(|_| draw(pool, rng).clone());
    let shopping_list = aggregate(&recipes, None);
    Ok(MealPlan {
        recipes,
        shopping_list,
        version: 0,
        generated_at: Utc::now(),
    })
}

/// Replace the recipe in `slot` with a different one from `pool`.
///
/// When the pool holds nothing but the current recipe, the draw falls back to
/// the whole pool and the slot keeps the same recipe.
pub fn reroll(
    plan: &MealPlan,
    slot: usize,
    pool: &[Recipe],
    rng: &mut dyn IndexSource,
) -> PlanResult<MealPlan> {
    if slot > LAST_SLOT {
        return Err(PlanError::InvalidSlot { slot });
    }
    if pool.is_empty() {
        return Err(PlanError::EmptyPool);
    }

    let excluded = plan.recipes[slot].id.as_str();
    let candidates: Vec<&Recipe> = pool.iter().filter(|r| r.id != excluded).collect();
    let replacement = if candidates.is_empty() {
        draw(pool, rng).clone()
    } else {
        (*draw(&candidates, rng)).clone()
    };

    let mut next = plan.clone();
    next.recipes[slot] = replacement;
    next.shopping_list = aggregate(&next.recipes, Some(&plan.shopping_list));
    Ok(next)
}

/// Set the acquired flag on the item named exactly `name`.
pub fn toggle_item(plan: &MealPlan, name: &str, acquired: bool) -> PlanResult<MealPlan> {
    let mut next = plan.clone();
    let item = next
        .shopping_list
        .iter_mut()
        .find(|i| i.name == name)
        .ok_or_else(|| PlanError::ItemNotFound(name.to_string()))?;
    item.acquired = acquired;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::models::Ingredient;
    use crate::random::{ScriptedIndices, ThreadRandom};

    fn recipe(id: &str, ingredients: &[&str]) -> Recipe {
        Recipe {
            id: id.to_string(),
            title: format!("Recipe {id}"),
            main: "main".to_string(),
            other: ingredients
                .iter()
                .map(|name| Ingredient {
                    name: (*name).to_string(),
                    quantity: 1.0,
                    unit: String::new(),
                })
                .collect(),
            instructions: vec!["Cook".to_string()],
        }
    }

    fn pool() -> Vec<Recipe> {
        vec![
            recipe("a", &["Onion", "Garlic"]),
            recipe("b", &["Rice", "onion"]),
            recipe("c", &["Pasta", "Tomato"]),
            recipe("d", &["Tofu", "Soy sauce"]),
        ]
    }

    #[test]
    fn test_generate_empty_pool() {
        let err = generate(&[], &mut ThreadRandom).unwrap_err();
        assert!(matches!(err, PlanError::EmptyPool));
    }

    #[test]
    fn test_generate_follows_draws() {
        let pool = pool();
        let mut rng = ScriptedIndices::new(vec![0, 1, 2, 3, 0, 1, 2]);
        let plan = generate(&pool, &mut rng).unwrap();

        let ids: Vec<&str> = plan.recipes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d", "a", "b", "c"]);
        assert!(plan.shopping_list.iter().all(|i| !i.acquired));
        let onion = plan.shopping_list.iter().find(|i| i.name == "onion").unwrap();
        assert_eq!(onion.quantity.get(), 4);
    }

    #[test]
    fn test_generate_single_recipe_pool_repeats() {
        let pool = vec![recipe("only", &["Egg"])];
        let plan = generate(&pool, &mut ThreadRandom).unwrap();
        assert_eq!(plan.recipes.len(), DAYS_PER_PLAN);
        assert!(plan.recipes.iter().all(|r| r.id == "only"));
        assert_eq!(plan.shopping_list[0].quantity.get(), 7);
    }

    #[test]
    fn test_reroll_invalid_slot() {
        let pool = pool();
        let plan = generate(&pool, &mut ThreadRandom).unwrap();
        let err = reroll(&plan, 7, &pool, &mut ThreadRandom).unwrap_err();
        assert!(matches!(err, PlanError::InvalidSlot { slot: 7 }));
    }

    #[test]
    fn test_reroll_empty_pool() {
        let pool = pool();
        let plan = generate(&pool, &mut ThreadRandom).unwrap();
        let err = reroll(&plan, 0, &[], &mut ThreadRandom).unwrap_err();
        assert!(matches!(err, PlanError::EmptyPool));
    }

    #[test]
    fn test_reroll_changes_only_target_slot() {
        let pool = pool();
        for slot in 0..DAYS_PER_PLAN {
            let plan = generate(&pool, &mut ThreadRandom).unwrap();
            let next = reroll(&plan, slot, &pool, &mut ThreadRandom).unwrap();

            assert_eq!(next.recipes.len(), DAYS_PER_PLAN);
            assert_ne!(next.recipes[slot].id, plan.recipes[slot].id);
            for other in (0..DAYS_PER_PLAN).filter(|i| *i != slot) {
                assert_eq!(next.recipes[other], plan.recipes[other]);
            }
        }
    }

    #[test]
    fn test_reroll_draws_from_candidates_without_current() {
        let pool = pool();
        let mut rng = ScriptedIndices::new(vec![0]);
        let plan = generate(&pool, &mut rng).unwrap();
        assert_eq!(plan.recipes[3].id, "a");

        // Candidates are [b, c, d]; index 0 picks b
        let next = reroll(&plan, 3, &pool, &mut ScriptedIndices::new(vec![0])).unwrap();
        assert_eq!(next.recipes[3].id, "b");
    }

    #[test]
    fn test_reroll_single_recipe_pool_keeps_plan() {
        let pool = vec![recipe("only", &["Egg"])];
        let plan = generate(&pool, &mut ThreadRandom).unwrap();
        let plan = toggle_item(&plan, "egg", true).unwrap();

        let next = reroll(&plan, 3, &pool, &mut ThreadRandom).unwrap();
        assert_eq!(next, plan);
    }

    #[test]
    fn test_reroll_preserves_acquired_flags() {
        let pool = pool();
        // All seven days are "a": onion + garlic
        let plan = generate(&pool, &mut ScriptedIndices::new(vec![0])).unwrap();
        let plan = toggle_item(&plan, "onion", true).unwrap();
        let plan = toggle_item(&plan, "garlic", true).unwrap();

        // Swap day 0 for "b": rice + onion
        let next = reroll(&plan, 0, &pool, &mut ScriptedIndices::new(vec![0])).unwrap();
        assert_eq!(next.recipes[0].id, "b");

        let onion = next.item("onion").unwrap();
        assert!(onion.acquired);
        assert_eq!(onion.quantity.get(), 7);
        let garlic = next.item("garlic").unwrap();
        assert!(garlic.acquired);
        assert_eq!(garlic.quantity.get(), 6);
        assert!(!next.item("rice").unwrap().acquired);

        let names: HashSet<&str> = next.shopping_list.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names.len(), next.shopping_list.len());
    }

    #[test]
    fn test_reroll_drops_items_no_longer_needed() {
        let pool = vec![recipe("a", &["Onion"]), recipe("b", &["Leek"])];
        let mut plan = generate(&pool, &mut ScriptedIndices::new(vec![0])).unwrap();
        plan.recipes[6] = pool[1].clone();
        plan.shopping_list = aggregate(&plan.recipes, None);
        let plan = toggle_item(&plan, "leek", true).unwrap();

        let next = reroll(&plan, 6, &pool, &mut ThreadRandom).unwrap();
        assert_eq!(next.recipes[6].id, "a");
        assert!(next.item("leek").is_none());
    }

    #[test]
    fn test_toggle_sets_flag_and_is_idempotent() {
        let pool = pool();
        let plan = generate(&pool, &mut ScriptedIndices::new(vec![0])).unwrap();

        let once = toggle_item(&plan, "onion", true).unwrap();
        let twice = toggle_item(&once, "onion", true).unwrap();
        assert_eq!(once, twice);
        assert!(once.item("onion").unwrap().acquired);
        assert!(!once.item("garlic").unwrap().acquired);

        let cleared = toggle_item(&twice, "onion", false).unwrap();
        assert!(!cleared.item("onion").unwrap().acquired);
    }

    #[test]
    fn test_toggle_matches_stored_name_exactly() {
        let pool = pool();
        let plan = generate(&pool, &mut ScriptedIndices::new(vec![0])).unwrap();

        let err = toggle_item(&plan, "Onion", true).unwrap_err();
        assert!(matches!(err, PlanError::ItemNotFound(ref n) if n == "Onion"));
        let err = toggle_item(&plan, "nonexistent-item", true).unwrap_err();
        assert!(matches!(err, PlanError::ItemNotFound(_)));
    }
}
