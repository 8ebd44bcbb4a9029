use anyhow::{Context, Result};
use std::path::Path;
use std::process;

use weekplate_core::error::PlanError;
use weekplate_core::models::RawRecipe;
use weekplate_core::recipes::RecipeFilter;

use super::AppPlanner;
use super::helpers::{format_quantity, json_error, print_recipe_table};

fn read_json_file<T: serde::de::DeserializeOwned>(file: &Path) -> Result<T> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    serde_json::from_str(&input).with_context(|| format!("Invalid JSON in {}", file.display()))
}

pub(crate) fn cmd_recipe_list(
    planner: &AppPlanner,
    search: Option<String>,
    main: Option<String>,
    json: bool,
) -> Result<()> {
    let recipes = planner.list_recipes(&RecipeFilter { search, main })?;
    if recipes.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No recipes found");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
    } else {
        print_recipe_table(&recipes);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_show(planner: &AppPlanner, id: &str, json: bool) -> Result<()> {
    let recipe = match planner.get_recipe(id) {
        Ok(recipe) => recipe,
        Err(e @ PlanError::RecipeNotFound(_)) => {
            if json {
                println!("{}", json_error(&e.to_string()));
            } else {
                eprintln!("{e}");
            }
            process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
        return Ok(());
    }

    let title = &recipe.title;
    let main = &recipe.main;
    println!("=== {title} ===");
    println!("  Main: {main}\n");

    println!("  INGREDIENTS:");
    for ing in &recipe.other {
        let qty = format_quantity(ing.quantity);
        let name = &ing.name;
        if ing.unit.is_empty() {
            println!("    {qty} {name}");
        } else {
            let unit = &ing.unit;
            println!("    {qty} {unit} {name}");
        }
    }

    println!("\n  INSTRUCTIONS:");
    for (i, step) in recipe.instructions.iter().enumerate() {
        let n = i + 1;
        println!("    {n}. {step}");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_add(planner: &AppPlanner, file: &Path, json: bool) -> Result<()> {
    let raw: RawRecipe = read_json_file(file)?;
    let recipe = planner.create_recipe(&raw)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        let title = &recipe.title;
        let id = &recipe.id;
        println!("Added recipe: {title} (id: {id})");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_delete(planner: &AppPlanner, id: &str, json: bool) -> Result<()> {
    match planner.delete_recipe(id) {
        Ok(()) => {
            if json {
                println!("{}", serde_json::json!({ "deleted": id }));
            } else {
                println!("Deleted recipe {id}");
            }
            Ok(())
        }
        Err(e @ PlanError::RecipeNotFound(_)) => {
            if json {
                println!("{}", json_error(&e.to_string()));
            } else {
                eprintln!("{e}");
            }
            process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}

/// Import a JSON array of recipe documents. Older documents with free-text
/// quantities are accepted and normalized.
pub(crate) fn cmd_recipe_import(planner: &AppPlanner, file: &Path, json: bool) -> Result<()> {
    let documents: Vec<RawRecipe> = read_json_file(file)?;
    let summary = planner.import_recipes(&documents)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let imported = summary.imported;
        let skipped = summary.skipped;
        println!("Imported {imported} recipes ({skipped} skipped)");
        for error in &summary.errors {
            eprintln!("  {error}");
        }
    }
    Ok(())
}

pub(crate) fn cmd_recipe_export(planner: &AppPlanner, output: Option<&Path>) -> Result<()> {
    let recipes = planner.export_recipes()?;
    let document = serde_json::to_string_pretty(&recipes)?;
    match output {
        Some(path) => {
            std::fs::write(path, document)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            let count = recipes.len();
            eprintln!("Exported {count} recipes to {}", path.display());
        }
        None => println!("{document}"),
    }
    Ok(())
}
