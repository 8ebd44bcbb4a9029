use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, anyhow};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{PlanError, PlanResult};
use crate::models::{
    ImportSummary, LAST_SLOT, MealPlan, RawRecipe, Recipe, ShoppingListItem, normalize_recipe,
};
use crate::planner;
use crate::random::{IndexSource, ThreadRandom};
use crate::recipes::{self, RecipeFilter};
use crate::store::{KvStore, MemoryStore};

/// Key of the single current meal plan document.
pub const PLAN_KEY: &str = "meal_plan:current";

/// Recipe box and meal planner over an injected store.
///
/// Every plan mutation reads the stored document, computes the new plan and
/// writes it back with compare-and-swap against the document it read, so a
/// concurrent writer surfaces as [`PlanError::VersionConflict`] instead of a
/// silently lost update.
pub struct Planner<S, R = ThreadRandom> {
    store: S,
    rng: Mutex<R>,
}

/// Just the version of a stored plan, readable even when the rest of the
/// document no longer parses.
#[derive(Deserialize)]
struct StoredVersion {
    #[serde(default)]
    version: u64,
}

fn stored_version(raw: &str) -> u64 {
    serde_json::from_str::<StoredVersion>(raw).map_or(0, |v| v.version)
}

fn next_version(version: u64) -> PlanResult<u64> {
    version
        .checked_add(1)
        .ok_or_else(|| PlanError::Store(anyhow!("meal plan version {version} cannot be incremented")))
}

impl Planner<MemoryStore> {
    #[must_use]
    pub fn new_in_memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl<S: KvStore> Planner<S> {
    pub fn new(store: S) -> Self {
        Self::with_rng(store, ThreadRandom)
    }
}

impl<S: KvStore, R: IndexSource> Planner<S, R> {
    pub fn with_rng(store: S, rng: R) -> Self {
        Self {
            store,
            rng: Mutex::new(rng),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn rng(&self) -> MutexGuard<'_, R> {
        self.rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn pool(&self) -> PlanResult<Vec<Recipe>> {
        Ok(recipes::list_all_recipes(&self.store)?)
    }

    /// The stored plan together with the raw document it was parsed from.
    fn load_plan(&self) -> PlanResult<Option<(String, MealPlan)>> {
        let Some(raw) = self.store.get(PLAN_KEY)? else {
            return Ok(None);
        };
        let plan: MealPlan =
            serde_json::from_str(&raw).context("stored meal plan is malformed")?;
        Ok(Some((raw, plan)))
    }

    fn load_plan_for_update(
        &self,
        expected_version: Option<u64>,
    ) -> PlanResult<(String, MealPlan)> {
        let (raw, plan) = self.load_plan()?.ok_or(PlanError::PlanNotFound)?;
        if let Some(expected) = expected_version {
            if expected != plan.version {
                return Err(PlanError::VersionConflict {
                    expected,
                    found: plan.version,
                });
            }
        }
        Ok((raw, plan))
    }

    /// Write `next` only if the plan key still holds `previous`.
    fn swap_plan(
        &self,
        previous: Option<&str>,
        previous_version: u64,
        mut next: MealPlan,
    ) -> PlanResult<MealPlan> {
        next.version = next_version(previous_version)?;
        let document = serde_json::to_string(&next).context("failed to serialize meal plan")?;
        if self.store.compare_and_swap(PLAN_KEY, previous, &document)? {
            return Ok(next);
        }
        let found = self.store.get(PLAN_KEY)?.as_deref().map_or(0, stored_version);
        warn!(expected = previous_version, found, "meal plan changed concurrently");
        Err(PlanError::VersionConflict {
            expected: previous_version,
            found,
        })
    }

    fn commit(&self, raw: &str, current: &MealPlan, next: MealPlan) -> PlanResult<MealPlan> {
        self.swap_plan(Some(raw), current.version, next)
    }

    // --- Meal plan ---

    pub fn current_plan(&self) -> PlanResult<Option<MealPlan>> {
        Ok(self.load_plan()?.map(|(_, plan)| plan))
    }

    /// Draw a new week from every stored recipe, replacing any current plan.
    ///
    /// The write is a compare-and-swap against the document read here, so a
    /// concurrent generate or update fails with
    /// [`PlanError::VersionConflict`] instead of reusing a version number.
    pub fn generate_plan(&self) -> PlanResult<MealPlan> {
        let pool = self.pool()?;
        let plan = planner::generate(&pool, &mut *self.rng())?;

        // A previous document that no longer parses must not block a fresh
        // plan; its version is still honoured when readable
        let previous = self.store.get(PLAN_KEY)?;
        let previous_version = previous.as_deref().map_or(0, stored_version);

        let plan = self.swap_plan(previous.as_deref(), previous_version, plan)?;
        info!(
            version = plan.version,
            pool = pool.len(),
            items = plan.shopping_list.len(),
            "generated meal plan"
        );
        Ok(plan)
    }

    /// Swap the recipe in `slot` (0-based) for a different one.
    pub fn reroll_slot(&self, slot: usize, expected_version: Option<u64>) -> PlanResult<MealPlan> {
        if slot > LAST_SLOT {
            return Err(PlanError::InvalidSlot { slot });
        }
        let (raw, current) = self.load_plan_for_update(expected_version)?;
        let pool = self.pool()?;
        let next = planner::reroll(&current, slot, &pool, &mut *self.rng())?;
        let next = self.commit(&raw, &current, next)?;
        info!(
            slot,
            version = next.version,
            from = %current.recipes[slot].id,
            to = %next.recipes[slot].id,
            "re-rolled meal plan slot"
        );
        Ok(next)
    }

    /// Mark a shopping list item as acquired or not. Setting a flag to the
    /// value it already has writes nothing.
    pub fn set_item_acquired(
        &self,
        name: &str,
        acquired: bool,
        expected_version: Option<u64>,
    ) -> PlanResult<ShoppingListItem> {
        let (raw, current) = self.load_plan_for_update(expected_version)?;
        let next = planner::toggle_item(&current, name, acquired)?;
        let next = if next == current {
            current
        } else {
            let next = self.commit(&raw, &current, next)?;
            info!(item = name, acquired, version = next.version, "updated shopping list item");
            next
        };
        next.item(name)
            .cloned()
            .ok_or_else(|| PlanError::ItemNotFound(name.to_string()))
    }

    pub fn clear_plan(&self) -> PlanResult<bool> {
        Ok(self.store.del(PLAN_KEY)?)
    }

    // --- Recipes ---

    pub fn list_recipes(&self, filter: &RecipeFilter) -> PlanResult<Vec<Recipe>> {
        Ok(filter.apply(self.pool()?))
    }

    pub fn get_recipe(&self, id: &str) -> PlanResult<Recipe> {
        recipes::get_recipe(&self.store, id)?.ok_or_else(|| PlanError::RecipeNotFound(id.to_string()))
    }

    pub fn create_recipe(&self, raw: &RawRecipe) -> PlanResult<Recipe> {
        let id = Uuid::new_v4().to_string();
        let recipe =
            normalize_recipe(raw, &id).map_err(|e| PlanError::InvalidRecipe(format!("{e:#}")))?;
        recipes::put_recipe(&self.store, &recipe)?;
        info!(recipe_id = %recipe.id, title = %recipe.title, "created recipe");
        Ok(recipe)
    }

    /// Replace a stored recipe wholesale.
    pub fn update_recipe(&self, id: &str, raw: &RawRecipe) -> PlanResult<Recipe> {
        let id = id.trim();
        if self.store.get(&recipes::recipe_key(id))?.is_none() {
            return Err(PlanError::RecipeNotFound(id.to_string()));
        }
        let recipe =
            normalize_recipe(raw, id).map_err(|e| PlanError::InvalidRecipe(format!("{e:#}")))?;
        recipes::put_recipe(&self.store, &recipe)?;
        Ok(recipe)
    }

    pub fn delete_recipe(&self, id: &str) -> PlanResult<()> {
        if !recipes::delete_recipe(&self.store, id)? {
            return Err(PlanError::RecipeNotFound(id.to_string()));
        }
        info!(recipe_id = id, "deleted recipe");
        Ok(())
    }

    pub fn export_recipes(&self) -> PlanResult<Vec<Recipe>> {
        self.pool()
    }

    /// Store every valid document; invalid ones are counted and reported.
    /// Documents carrying an `id` overwrite the recipe with that id.
    pub fn import_recipes(&self, documents: &[RawRecipe]) -> PlanResult<ImportSummary> {
        let mut summary = ImportSummary::default();
        for (index, raw) in documents.iter().enumerate() {
            let id = raw
                .id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
            match normalize_recipe(raw, &id) {
                Ok(recipe) => {
                    recipes::put_recipe(&self.store, &recipe)?;
                    summary.imported += 1;
                }
                Err(e) => {
                    summary.skipped += 1;
                    summary.errors.push(format!("#{}: {e:#}", index + 1));
                }
            }
        }
        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            "imported recipes"
        );
        Ok(summary)
    }
}
