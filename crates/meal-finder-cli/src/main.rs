// SPDX-License-Identifier: AGPL-3.0
// Meal Finder CLI - terminal frontend

mod commands;
mod state;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "meal-finder")]
#[command(author, version, about = "Browse recipes and keep a local favorites list", long_about = None)]
struct Cli {
    /// Recipe API base URL (overrides the settings file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory holding the favorites data
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Settings file to use instead of the platform default
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List popular dishes
    Popular,
    /// List recipe categories
    Categories,
    /// List dishes in a category
    Category {
        /// Category name, e.g. Seafood
        name: String,
    },
    /// Search dishes by name
    Search {
        /// Search terms
        #[arg(required = true)]
        terms: Vec<String>,
    },
    /// Show a recipe's ingredients and instructions
    Show {
        /// Recipe id
        id: String,
    },
    /// List favorite recipes
    Favorites,
    /// Add a recipe to favorites
    Add {
        /// Recipe id
        id: String,
    },
    /// Remove a recipe from favorites
    Remove {
        /// Recipe id
        id: String,
    },
    /// Add the recipe if it is not a favorite, remove it otherwise
    Toggle {
        /// Recipe id
        id: String,
    },
    /// Print a shareable message for a recipe
    Share {
        /// Recipe id
        id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("meal_finder_cli=info".parse().unwrap())
                .add_directive("meal_finder_core=warn".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    tracing::debug!("Starting Meal Finder CLI v{}", env!("CARGO_PKG_VERSION"));

    let overrides = state::Overrides {
        api_url: cli.api_url,
        data_dir: cli.data_dir,
        settings_path: cli.settings,
    };

    let app = match state::AppState::new(overrides).await {
        Ok(app) => app,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match commands::run(&app, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
