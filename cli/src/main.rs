mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{
    AppPlanner, cmd_plan_clear, cmd_plan_generate, cmd_plan_mark, cmd_plan_reroll, cmd_plan_show,
    cmd_recipe_add, cmd_recipe_delete, cmd_recipe_export, cmd_recipe_import, cmd_recipe_list,
    cmd_recipe_show,
};
use crate::config::Config;
use weekplate_core::db::SqliteStore;
use weekplate_core::service::Planner;
use weekplate_core::store::{KvStore, MemoryStore};

#[derive(Parser)]
#[command(
    name = "weekplate",
    version,
    about = "A recipe box and weekly meal planner with a shopping list"
)]
struct Cli {
    /// Database file (default: weekplate.db in the data directory)
    #[arg(long, global = true, env = "WEEKPLATE_DB", value_name = "PATH")]
    db: Option<PathBuf>,
    /// Keep everything in memory for this run; nothing is saved. Takes
    /// precedence over `--db`.
    #[arg(long, global = true)]
    ephemeral: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Work with this week's meal plan and shopping list
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Manage the recipe box
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Show the current plan and shopping list
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Draw a new week from the recipe box, replacing the current plan
    Generate {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Swap one day's recipe for a different one
    Reroll {
        /// Day to replace: 1-7 or a day name (mon, tuesday, ...)
        day: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a shopping list item as acquired
    Check {
        /// Item name as shown in the shopping list
        item: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a shopping list item as still needed
    Uncheck {
        /// Item name as shown in the shopping list
        item: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Discard the current plan
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// List recipes
    List {
        /// Filter by title or ingredient (case-insensitive substring)
        #[arg(short, long)]
        search: Option<String>,
        /// Only recipes with this main ingredient
        #[arg(short, long)]
        main: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe with its ingredients and instructions
    Show {
        /// Recipe ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a recipe from a JSON file
    Add {
        /// Path to a JSON recipe document
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe by ID
    Delete {
        /// Recipe ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import recipes from a JSON array (older documents are normalized)
    Import {
        /// Path to the JSON file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export every recipe as a JSON array
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(matches!(cli.command, Commands::Serve { .. }));

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

/// Logs go to stderr so `--json` output on stdout stays machine-readable.
/// `RUST_LOG` overrides the default level.
fn init_tracing(serving: bool) {
    let default = if serving { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_planner(cli: &Cli, config: &Config) -> Result<AppPlanner> {
    let store: Box<dyn KvStore> = if cli.ephemeral {
        Box::new(MemoryStore::new())
    } else {
        Box::new(SqliteStore::open(&config.db_path)?)
    };
    Ok(Planner::new(store))
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.db.clone())?;
    let planner = open_planner(&cli, &config)?;

    match cli.command {
        Commands::Plan { command } => match command {
            PlanCommands::Show { json } => cmd_plan_show(&planner, json),
            PlanCommands::Generate { json } => cmd_plan_generate(&planner, json),
            PlanCommands::Reroll { day, json } => cmd_plan_reroll(&planner, &day, json),
            PlanCommands::Check { item, json } => cmd_plan_mark(&planner, &item, true, json),
            PlanCommands::Uncheck { item, json } => cmd_plan_mark(&planner, &item, false, json),
            PlanCommands::Clear { json } => cmd_plan_clear(&planner, json),
        },
        Commands::Recipe { command } => match command {
            RecipeCommands::List { search, main, json } => {
                cmd_recipe_list(&planner, search, main, json)
            }
            RecipeCommands::Show { id, json } => cmd_recipe_show(&planner, &id, json),
            RecipeCommands::Add { file, json } => cmd_recipe_add(&planner, &file, json),
            RecipeCommands::Delete { id, json } => cmd_recipe_delete(&planner, &id, json),
            RecipeCommands::Import { file, json } => cmd_recipe_import(&planner, &file, json),
            RecipeCommands::Export { output } => cmd_recipe_export(&planner, output.as_deref()),
        },
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let api_key = if no_auth {
                None
            } else {
                Some(config.load_or_create_api_key()?.0)
            };
            server::start_server(planner, port, &bind, api_key).await
        }
    }
}
