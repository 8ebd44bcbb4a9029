use anyhow::Result;
use std::process;

use weekplate_core::error::PlanError;
use weekplate_core::models::MealPlan;

use super::AppPlanner;
use super::helpers::{DAY_NAMES, json_error, parse_day, print_shopping_list, print_week_table};

fn print_plan(plan: &MealPlan) {
    let generated = plan.generated_at.format("%Y-%m-%d %H:%M");
    let version = plan.version;
    println!("Meal plan v{version} (generated {generated} UTC)\n");
    print_week_table(plan);
    let remaining = plan.remaining_items();
    let total = plan.shopping_list.len();
    println!("\nShopping list ({remaining} of {total} still needed):");
    print_shopping_list(&plan.shopping_list);
}

/// Report a missing plan or item the way `show` reports "nothing found".
fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn cmd_plan_show(planner: &AppPlanner, json: bool) -> Result<()> {
    let Some(plan) = planner.current_plan()? else {
        exit_not_found("No meal plan yet. Create one with: weekplate plan generate", json);
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

pub(crate) fn cmd_plan_generate(planner: &AppPlanner, json: bool) -> Result<()> {
    let plan = match planner.generate_plan() {
        Ok(plan) => plan,
        Err(PlanError::EmptyPool) => {
            exit_not_found("No recipes available. Add some with: weekplate recipe add <file>", json)
        }
        Err(e) => return Err(e.into()),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

pub(crate) fn cmd_plan_reroll(planner: &AppPlanner, day: &str, json: bool) -> Result<()> {
    let slot = parse_day(day)?;
    let before = planner.current_plan()?;
    let plan = match planner.reroll_slot(slot, before.as_ref().map(|p| p.version)) {
        Ok(plan) => plan,
        Err(e @ PlanError::PlanNotFound) => exit_not_found(&e.to_string(), json),
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let day_name = DAY_NAMES[slot];
    let title = &plan.recipes[slot].title;
    match before {
        Some(before) if before.recipes[slot].id == plan.recipes[slot].id => {
            println!("{day_name}: {title} (no other recipe to swap in)");
        }
        Some(before) => {
            let old = &before.recipes[slot].title;
            println!("{day_name}: {old} -> {title}");
        }
        None => println!("{day_name}: {title}"),
    }
    Ok(())
}

/// Set or clear the acquired flag. Item names are stored lower-cased, so the
/// argument is lower-cased before matching.
pub(crate) fn cmd_plan_mark(
    planner: &AppPlanner,
    item: &str,
    acquired: bool,
    json: bool,
) -> Result<()> {
    let name = item.trim().to_lowercase();
    let updated = match planner.set_item_acquired(&name, acquired, None) {
        Ok(updated) => updated,
        Err(e @ (PlanError::ItemNotFound(_) | PlanError::PlanNotFound)) => {
            exit_not_found(&e.to_string(), json)
        }
        Err(e) => return Err(e.into()),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else {
        let mark = if updated.acquired { "[x]" } else { "[ ]" };
        let item_name = &updated.name;
        println!("{mark} {item_name}");
    }
    Ok(())
}

pub(crate) fn cmd_plan_clear(planner: &AppPlanner, json: bool) -> Result<()> {
    let cleared = planner.clear_plan()?;
    if json {
        println!("{}", serde_json::json!({ "cleared": cleared }));
    } else if cleared {
        println!("Cleared the current meal plan");
    } else {
        println!("No meal plan to clear");
    }
    Ok(())
}
