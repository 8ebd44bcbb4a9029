use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::models::{OccurrenceCount, Recipe, ShoppingListItem};

/// Build the shopping list for a set of recipes.
///
/// Ingredients are merged by lower-cased name in first-seen order. Each item
/// counts how many times the ingredient appears; the unit is the one from the
/// first occurrence. When `previous` is given, the `acquired` flag of a
/// same-named item carries over and new items start unacquired.
#[must_use]
pub fn aggregate(recipes: &[Recipe], previous: Option<&[ShoppingListItem]>) -> Vec<ShoppingListItem> {
    let mut items: Vec<ShoppingListItem> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for ingredient in recipes.iter().flat_map(|r| &r.other) {
        match positions.entry(ingredient.name.to_lowercase()) {
            Entry::Occupied(slot) => items[*slot.get()].quantity.increment(),
            Entry::Vacant(slot) => {
                let name = slot.key().clone();
                slot.insert(items.len());
                items.push(ShoppingListItem {
                    name,
                    quantity: OccurrenceCount::ONE,
                    unit: ingredient.unit.clone(),
                    acquired: false,
                });
            }
        }
    }

    if let Some(previous) = previous {
        let mut acquired: HashMap<&str, bool> = HashMap::with_capacity(previous.len());
        for item in previous {
            acquired.entry(item.name.as_str()).or_insert(item.acquired);
        }
        for item in &mut items {
            item.acquired = acquired.get(item.name.as_str()).copied().unwrap_or(false);
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::models::Ingredient;

    fn ingredient(name: &str, unit: &str) -> Ingredient {
        Ingredient {
            name: name.to_string(),
            quantity: 1.0,
            unit: unit.to_string(),
        }
    }

    fn recipe(id: &str, other: Vec<Ingredient>) -> Recipe {
        Recipe {
            id: id.to_string(),
            title: format!("Recipe {id}"),
            main: "main".to_string(),
            other,
            instructions: vec!["Cook".to_string()],
        }
    }

    #[test]
    fn test_counts_occurrences_case_insensitively() {
        let a = recipe("a", vec![ingredient("Egg", "pc")]);
        let b = recipe("b", vec![ingredient("egg", "")]);
        let week = vec![a.clone(), b, a.clone(), a.clone(), a.clone(), a.clone(), a];

        let list = aggregate(&week, None);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "egg");
        assert_eq!(list[0].quantity.get(), 7);
        assert_eq!(list[0].unit, "pc");
        assert!(!list[0].acquired);
    }

    #[test]
    fn test_counts_are_not_unit_sums() {
        let a = recipe(
            "a",
            vec![Ingredient {
                name: "Rice".to_string(),
                quantity: 500.0,
                unit: "g".to_string(),
            }],
        );
        let b = recipe(
            "b",
            vec![Ingredient {
                name: "rice".to_string(),
                quantity: 2.0,
                unit: "cup".to_string(),
            }],
        );
        let list = aggregate(&[a, b], None);
        assert_eq!(list[0].quantity.get(), 2);
        assert_eq!(list[0].unit, "g");
    }

    #[test]
    fn test_first_seen_order_and_unique_names() {
        let a = recipe("a", vec![ingredient("Onion", ""), ingredient("Garlic", "clove")]);
        let b = recipe("b", vec![ingredient("garlic", ""), ingredient("Basil", "")]);
        let list = aggregate(&[a, b], None);

        let names: Vec<&str> = list.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["onion", "garlic", "basil"]);
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_recipe_without_ingredients_contributes_nothing() {
        let empty = recipe("e", vec![]);
        let a = recipe("a", vec![ingredient("Salt", "pinch")]);
        let list = aggregate(&[empty, a], None);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_carries_acquired_flags_by_name() {
        let previous = vec![
            ShoppingListItem {
                name: "onion".to_string(),
                quantity: OccurrenceCount::new(3),
                unit: String::new(),
                acquired: true,
            },
            ShoppingListItem {
                name: "leek".to_string(),
                quantity: OccurrenceCount::ONE,
                unit: String::new(),
                acquired: true,
            },
        ];
        let a = recipe("a", vec![ingredient("Onion", ""), ingredient("Carrot", "")]);

        let list = aggregate(&[a], Some(&previous));
        assert_eq!(list.len(), 2);
        assert!(list[0].acquired, "onion keeps its flag");
        assert_eq!(list[0].quantity.get(), 1, "count is recomputed");
        assert!(!list[1].acquired, "carrot is new");
        assert!(list.iter().all(|i| i.name != "leek"));
    }

    #[test]
    fn test_deterministic() {
        let a = recipe("a", vec![ingredient("Onion", ""), ingredient("Egg", "pc")]);
        let b = recipe("b", vec![ingredient("Flour", "g"), ingredient("egg", "")]);
        let week = vec![a.clone(), b.clone(), a, b];
        assert_eq!(aggregate(&week, None), aggregate(&week, None));
    }
}
