//! Recipe documents in the key-value store.
//!
//! Every recipe lives at `recipe:<id>` as JSON. Reads go through
//! [`normalize_recipe`] so legacy quantity shapes never reach the planner, and
//! documents that fail validation are left out of the pool.

use anyhow::{Context, Result};
use tracing::warn;

use crate::models::{RawRecipe, Recipe, normalize_recipe};
use crate::store::KvStore;

pub const RECIPE_PREFIX: &str = "recipe:";

#[must_use]
pub fn recipe_key(id: &str) -> String {
    format!("{RECIPE_PREFIX}{id}")
}

/// Parse and normalize a stored document. The storage key wins over any `id`
/// field inside the document.
pub fn parse_recipe_document(id: &str, document: &str) -> Result<Recipe> {
    let raw: RawRecipe = serde_json::from_str(document)
        .with_context(|| format!("Recipe '{id}' is not a valid recipe document"))?;
    normalize_recipe(&raw, id)
}

/// Every well-formed recipe in the store, in key order.
pub fn list_all_recipes<S: KvStore + ?Sized>(store: &S) -> Result<Vec<Recipe>> {
    let keys = store.scan(RECIPE_PREFIX)?;
    let documents = store.mget(&keys)?;

    let mut recipes = Vec::with_capacity(keys.len());
    for (key, document) in keys.iter().zip(documents) {
        // Deleted between scan and mget
        let Some(document) = document else {
            continue;
        };
        let id = key.strip_prefix(RECIPE_PREFIX).unwrap_or(key);
        match parse_recipe_document(id, &document) {
            Ok(recipe) => recipes.push(recipe),
            Err(e) => warn!(recipe_id = id, error = %format!("{e:#}"), "skipping malformed recipe"),
        }
    }
    Ok(recipes)
}

pub fn get_recipe<S: KvStore + ?Sized>(store: &S, id: &str) -> Result<Option<Recipe>> {
    store
        .get(&recipe_key(id))?
        .map(|document| parse_recipe_document(id, &document))
        .transpose()
}

pub fn put_recipe<S: KvStore + ?Sized>(store: &S, recipe: &Recipe) -> Result<()> {
    let document = serde_json::to_string(recipe).context("failed to serialize recipe")?;
    store.set(&recipe_key(&recipe.id), &document)
}

pub fn delete_recipe<S: KvStore + ?Sized>(store: &S, id: &str) -> Result<bool> {
    store.del(&recipe_key(id))
}

/// Browse filter for the recipe list.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    /// Case-insensitive substring of the title, main ingredient or any other ingredient.
    pub search: Option<String>,
    /// Case-insensitive exact main ingredient.
    pub main: Option<String>,
}

impl RecipeFilter {
    #[must_use]
    pub fn matches(&self, recipe: &Recipe) -> bool {
        if let Some(main) = self.main.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            if recipe.main.to_lowercase() != main.to_lowercase() {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = recipe.title.to_lowercase().contains(&needle)
                || recipe.main.to_lowercase().contains(&needle)
                || recipe
                    .other
                    .iter()
                    .any(|i| i.name.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }

    /// Apply the filter and sort by title, then id.
    #[must_use]
    pub fn apply(&self, recipes: Vec<Recipe>) -> Vec<Recipe> {
        let mut matched: Vec<Recipe> = recipes.into_iter().filter(|r| self.matches(r)).collect();
        matched.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ingredient;
    use crate::store::MemoryStore;

    fn recipe(id: &str, title: &str, main: &str, others: &[&str]) -> Recipe {
        Recipe {
            id: id.to_string(),
            title: title.to_string(),
            main: main.to_string(),
            other: others
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

    #[test]
    fn test_put_get_delete() {
        let store = MemoryStore::new();
        let r = recipe("r1", "Risotto", "Rice", &["Parmesan"]);
        put_recipe(&store, &r).unwrap();

        assert_eq!(get_recipe(&store, "r1").unwrap(), Some(r));
        assert!(delete_recipe(&store, "r1").unwrap());
        assert!(get_recipe(&store, "r1").unwrap().is_none());
    }

    #[test]
    fn test_list_skips_malformed_documents() {
        let store = MemoryStore::new();
        put_recipe(&store, &recipe("a", "Curry", "Chickpeas", &["Onion"])).unwrap();
        store.set("recipe:broken", "not json").unwrap();
        store
            .set(
                "recipe:empty",
                r#"{"title":"","main":"x","other":[{"name":"y"}],"instructions":["z"]}"#,
            )
            .unwrap();
        store
            .set(
                "recipe:scalar-other",
                r#"{"title":"T","main":"x","other":"salt","instructions":["z"]}"#,
            )
            .unwrap();

        let recipes = list_all_recipes(&store).unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].id, "a");
    }

    #[test]
    fn test_list_normalizes_legacy_quantities() {
        let store = MemoryStore::new();
        store
            .set(
                "recipe:legacy",
                r#"{"id":"old-id","title":"Pancakes","main":"Flour","other":[{"name":"Milk","quantity":"1 1/2","unit":"cups"}],"instructions":["Mix","Fry"]}"#,
            )
            .unwrap();

        let recipes = list_all_recipes(&store).unwrap();
        assert_eq!(recipes.len(), 1);
        // Storage key wins over the embedded id
        assert_eq!(recipes[0].id, "legacy");
        assert!((recipes[0].other[0].quantity - 1.5).abs() < f64::EPSILON);
        assert_eq!(recipes[0].other[0].unit, "cup");
    }

    #[test]
    fn test_get_malformed_is_error() {
        let store = MemoryStore::new();
        store.set("recipe:bad", "{").unwrap();
        assert!(get_recipe(&store, "bad").is_err());
    }

    #[test]
    fn test_filter_search_and_main() {
        let recipes = vec![
            recipe("1", "Tomato Soup", "Tomato", &["Basil"]),
            recipe("2", "basil pesto", "Basil", &["Pine nuts"]),
            recipe("3", "Omelette", "Egg", &["Chives"]),
        ];

        let by_search = RecipeFilter {
            search: Some("BASIL".to_string()),
            main: None,
        }
        .apply(recipes.clone());
        let ids: Vec<&str> = by_search.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);

        let by_main = RecipeFilter {
            search: None,
            main: Some("egg".to_string()),
        }
        .apply(recipes.clone());
        assert_eq!(by_main.len(), 1);
        assert_eq!(by_main[0].id, "3");

        let everything = RecipeFilter::default().apply(recipes);
        let titles: Vec<&str> = everything.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["basil pesto", "Omelette", "Tomato Soup"]);
    }
}
