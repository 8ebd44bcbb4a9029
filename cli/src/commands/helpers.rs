use anyhow::{Result, bail};
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use weekplate_core::models::{DAYS_PER_PLAN, MealPlan, Recipe, ShoppingListItem};

pub(crate) const DAY_NAMES: [&str; DAYS_PER_PLAN] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Map a 1-based day number or a day name ("mon", "Tuesday") to a plan slot.
pub(crate) fn parse_day(day: &str) -> Result<usize> {
    let day = day.trim();
    if let Ok(n) = day.parse::<usize>() {
        if (1..=DAYS_PER_PLAN).contains(&n) {
            return Ok(n - 1);
        }
        bail!("Invalid day: {day}. Use 1-{DAYS_PER_PLAN} or a day name");
    }
    let lower = day.to_lowercase();
    DAY_NAMES
        .iter()
        .position(|name| {
            let name = name.to_lowercase();
            lower.len() >= 3 && name.starts_with(&lower)
        })
        .ok_or_else(|| anyhow::anyhow!("Invalid day: {day}. Use 1-{DAYS_PER_PLAN} or a day name"))
}

pub(crate) fn print_week_table(plan: &MealPlan) {
    #[derive(Tabled)]
    struct DayRow {
        #[tabled(rename = "#")]
        day: usize,
        #[tabled(rename = "Day")]
        name: &'static str,
        #[tabled(rename = "Recipe")]
        title: String,
        #[tabled(rename = "Main")]
        main: String,
    }

    let rows: Vec<DayRow> = plan
        .recipes
        .iter()
        .enumerate()
        .map(|(i, r)| DayRow {
            day: i + 1,
            name: DAY_NAMES[i],
            title: truncate(&r.title, 35),
            main: truncate(&r.main, 20),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
}

pub(crate) fn print_shopping_list(items: &[ShoppingListItem]) {
    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "")]
        check: &'static str,
        #[tabled(rename = "Item")]
        name: String,
        #[tabled(rename = "Count")]
        count: String,
        #[tabled(rename = "Unit")]
        unit: String,
    }

    let rows: Vec<ItemRow> = items
        .iter()
        .map(|i| ItemRow {
            check: if i.acquired { "[x]" } else { "[ ]" },
            name: truncate(&i.name, 35),
            count: format!("x{}", i.quantity),
            unit: i.unit.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_recipe_table(recipes: &[Recipe]) {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Main")]
        main: String,
        #[tabled(rename = "Ingredients")]
        ingredients: usize,
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: r.id.clone(),
            title: truncate(&r.title, 30),
            main: truncate(&r.main, 20),
            ingredients: r.other.len(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Render a quantity without a trailing ".0" for whole numbers.
pub(crate) fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        format!("{quantity:.0}")
    } else {
        format!("{quantity}")
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
