use std::fmt;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of day slots in a meal plan.
pub const DAYS_PER_PLAN: usize = 7;

/// Index of the last slot in a meal plan.
pub const LAST_SLOT: usize = DAYS_PER_PLAN - 1;

/// Units an ingredient may carry. The empty string means "no unit" (e.g. 2 eggs).
pub const UNITS: &[&str] = &[
    "", "g", "kg", "mg", "ml", "l", "tsp", "tbsp", "cup", "oz", "lb", "pc", "pinch", "clove",
    "can", "slice", "bunch",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    /// The primary ingredient.
    pub main: String,
    pub other: Vec<Ingredient>,
    pub instructions: Vec<String>,
}

/// A quantity as it may appear in stored documents: older entries saved free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawQuantity {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawIngredient {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: Option<RawQuantity>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// A recipe document before normalization. Used for stored documents, API
/// bodies and imports alike.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecipe {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub other: Vec<RawIngredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
}

/// How many times an ingredient shows up across the plan's slots.
///
/// This is a count of references, not an amount: "2 cups of rice" in one
/// recipe and "100 g rice" in another aggregate to a count of 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OccurrenceCount(u32);

impl OccurrenceCount {
    pub const ONE: Self = Self(1);

    #[must_use]
    pub fn new(count: u32) -> Self {
        Self(count)
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    pub fn increment(&mut self) {
        self.0 = self.0.saturating_add(1);
    }
}

impl fmt::Display for OccurrenceCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    /// Lower-cased ingredient name, unique within one list.
    pub name: String,
    pub quantity: OccurrenceCount,
    pub unit: String,
    pub acquired: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    pub recipes: [Recipe; DAYS_PER_PLAN],
    pub shopping_list: Vec<ShoppingListItem>,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub generated_at: DateTime<Utc>,
}

impl MealPlan {
    #[must_use]
    pub fn item(&self, name: &str) -> Option<&ShoppingListItem> {
        self.shopping_list.iter().find(|i| i.name == name)
    }

    #[must_use]
    pub fn remaining_items(&self) -> usize {
        self.shopping_list.iter().filter(|i| !i.acquired).count()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Parse a free-text quantity from an older document.
///
/// Accepts "2", "0.5", "1/2", "1 1/2", "½", "2-3" (lower bound) and leading
/// numbers followed by words ("2 large"). Returns `None` when nothing numeric
/// and positive can be read.
#[must_use]
pub fn parse_legacy_quantity(text: &str) -> Option<f64> {
    let text = text.trim();
    let lower_bound = text.split(['-', '–']).next().unwrap_or(text).trim();

    let mut total = 0.0;
    let mut parsed_any = false;
    for token in lower_bound.split_whitespace() {
        let Some(value) = parse_number_token(token) else {
            break;
        };
        total += value;
        parsed_any = true;
    }

    (parsed_any && total.is_finite() && total > 0.0).then_some(total)
}

fn parse_number_token(token: &str) -> Option<f64> {
    if let Some(v) = vulgar_fraction(token) {
        return Some(v);
    }
    if let Ok(v) = token.replace(',', ".").parse::<f64>() {
        return Some(v);
    }
    if let Some((num, den)) = token.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den == 0.0 {
            return None;
        }
        return Some(num / den);
    }
    // "1½"
    let split = token.char_indices().find(|(_, c)| vulgar_fraction_char(*c).is_some())?;
    let whole: f64 = token[..split.0].parse().ok()?;
    Some(whole + vulgar_fraction_char(split.1)?)
}

fn vulgar_fraction(token: &str) -> Option<f64> {
    let mut chars = token.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    vulgar_fraction_char(c)
}

fn vulgar_fraction_char(c: char) -> Option<f64> {
    match c {
        '½' => Some(0.5),
        '⅓' => Some(1.0 / 3.0),
        '⅔' => Some(2.0 / 3.0),
        '¼' => Some(0.25),
        '¾' => Some(0.75),
        '⅛' => Some(0.125),
        _ => None,
    }
}

/// Map a unit onto the fixed vocabulary, accepting common spellings.
#[must_use]
pub fn normalize_unit(unit: &str) -> Option<String> {
    let unit = unit.trim().trim_end_matches('.').to_lowercase();
    let canonical = match unit.as_str() {
        "gram" | "grams" | "gr" => "g",
        "kilogram" | "kilograms" | "kgs" => "kg",
        "milligram" | "milligrams" => "mg",
        "milliliter" | "milliliters" | "millilitre" | "millilitres" => "ml",
        "liter" | "liters" | "litre" | "litres" => "l",
        "teaspoon" | "teaspoons" => "tsp",
        "tablespoon" | "tablespoons" | "tbs" => "tbsp",
        "cups" => "cup",
        "ounce" | "ounces" => "oz",
        "pound" | "pounds" | "lbs" => "lb",
        "piece" | "pieces" | "pcs" => "pc",
        "pinches" => "pinch",
        "cloves" => "clove",
        "cans" => "can",
        "slices" => "slice",
        "bunches" => "bunch",
        other => other,
    };
    UNITS.contains(&canonical).then(|| canonical.to_string())
}

fn normalize_quantity(quantity: Option<&RawQuantity>) -> f64 {
    let value = match quantity {
        Some(RawQuantity::Number(n)) => Some(*n),
        Some(RawQuantity::Text(s)) => parse_legacy_quantity(s),
        None => None,
    };
    value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(1.0)
}

pub fn normalize_ingredient(raw: &RawIngredient) -> Result<Ingredient> {
    let name = raw.name.trim();
    if name.is_empty() {
        bail!("Ingredient name must not be empty");
    }
    let unit_text = raw.unit.as_deref().unwrap_or("");
    let Some(unit) = normalize_unit(unit_text) else {
        bail!("Unknown unit '{unit_text}' for ingredient '{name}'");
    };
    Ok(Ingredient {
        name: name.to_string(),
        quantity: normalize_quantity(raw.quantity.as_ref()),
        unit,
    })
}

/// Turn a raw document into a valid [`Recipe`] stored under `id`.
pub fn normalize_recipe(raw: &RawRecipe, id: &str) -> Result<Recipe> {
    let id = id.trim();
    if id.is_empty() {
        bail!("Recipe id must not be empty");
    }
    let title = raw.title.trim();
    if title.is_empty() {
        bail!("Recipe title must not be empty");
    }
    let main = raw.main.trim();
    if main.is_empty() {
        bail!("Recipe '{title}' has no main ingredient");
    }
    if raw.other.is_empty() {
        bail!("Recipe '{title}' needs at least one ingredient");
    }
    let other = raw
        .other
        .iter()
        .map(normalize_ingredient)
        .collect::<Result<Vec<_>>>()?;

    // Blank lines from pasted or scraped text are dropped rather than rejected
    let instructions: Vec<String> = raw
        .instructions
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if instructions.is_empty() {
        bail!("Recipe '{title}' needs at least one instruction");
    }

    Ok(Recipe {
        id: id.to_string(),
        title: title.to_string(),
        main: main.to_string(),
        other,
        instructions,
    })
}
