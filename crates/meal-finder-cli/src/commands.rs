// SPDX-License-Identifier: AGPL-3.0
// Meal Finder CLI - Command handlers
//
// Each command is one screen of the app rendered as text.

use crate::state::AppState;
use crate::Commands;
use meal_finder_core::{share_message, AppError, BrowseView, Category, Recipe, RecipeCard};
use std::fmt::Write;

pub async fn run(app: &AppState, command: Commands) -> Result<(), AppError> {
    match command {
        Commands::Popular => {
            app.browse.load_popular().await?;
            print_listing(app);
        }
        Commands::Categories => {
            app.browse.load_categories().await?;
            print!("{}", render_categories(&app.browse.view().categories));
        }
        Commands::Category { name } => {
            app.browse.select_category(&name).await?;
            print_listing(app);
        }
        Commands::Search { terms } => {
            app.browse.search(&terms.join(" ")).await?;
            print_listing(app);
        }
        Commands::Show { id } => {
            let recipe = fetch_recipe(app, &id).await?;
            print!("{}", render_details(&recipe, app.favorites.is_favorite(&recipe.id)));
        }
        Commands::Favorites => {
            let favorites = app.favorites.favorites();
            if favorites.is_empty() {
                println!("No favorites yet.");
            } else {
                println!("Favorites");
                for recipe in &favorites {
                    println!("  {:>6}  {}", recipe.id, recipe.display_name());
                }
            }
        }
        Commands::Add { id } => {
            if app.favorites.is_favorite(&id) {
                println!("Already in favorites.");
                return Ok(());
            }
            let recipe = fetch_recipe(app, &id).await?;
            app.favorites.add_favorite(recipe).await?;
            println!("Added to favorites.");
        }
        Commands::Remove { id } => {
            let removed = app.favorites.remove_favorite(&id).await?;
            if removed == 0 {
                println!("Recipe {} was not a favorite.", id);
            } else {
                println!("Removed from favorites.");
            }
        }
        Commands::Toggle { id } => {
            let recipe = match app.favorites.snapshot().iter().find(|r| r.id == id) {
                Some(recipe) => recipe.clone(),
                None => fetch_recipe(app, &id).await?,
            };
            if app.favorites.toggle_favorite(recipe).await? {
                println!("Added to favorites.");
            } else {
                println!("Removed from favorites.");
            }
        }
        Commands::Share { id } => {
            let recipe = fetch_recipe(app, &id).await?;
            println!("{}", share_message(&recipe));
        }
    }
    Ok(())
}

/// Full record from the API, falling back to the stored favorite offline
async fn fetch_recipe(app: &AppState, id: &str) -> Result<Recipe, AppError> {
    match app.browse.details(id).await {
        Ok(Some(recipe)) => Ok(recipe),
        Ok(None) => Err(AppError::NotFound(format!(
            "No details available for recipe {}",
            id
        ))),
        Err(e) => app
            .favorites
            .snapshot()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(e),
    }
}

fn print_listing(app: &AppState) {
    print!(
        "{}",
        render_listing(&app.browse.view(), &app.browse.cards(&app.favorites))
    );
}

pub fn render_listing(view: &BrowseView, cards: &[RecipeCard]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.heading());
    if cards.is_empty() {
        let _ = writeln!(out, "  No recipes found.");
    }
    for card in cards {
        let marker = if card.is_favorite { "♥" } else { " " };
        let _ = writeln!(
            out,
            "{} {:>6}  {}",
            marker,
            card.recipe.id,
            card.recipe.display_name()
        );
    }
    out
}

pub fn render_categories(categories: &[Category]) -> String {
    let mut out = String::new();
    for category in categories {
        let _ = writeln!(out, "{:>3}  {}", category.id, category.name);
    }
    out
}

pub fn render_details(recipe: &Recipe, is_favorite: bool) -> String {
    let mut out = String::new();
    let heart = if is_favorite { " ♥" } else { "" };
    let _ = writeln!(out, "{}{}", recipe.display_name(), heart);
    if let Some(category) = recipe.category() {
        let _ = writeln!(out, "Category: {}", category);
    }
    if let Some(area) = recipe.area() {
        let _ = writeln!(out, "Cuisine: {}", area);
    }
    let tags = recipe.tag_list();
    if !tags.is_empty() {
        let _ = writeln!(out, "Tags: {}", tags.join(", "));
    }

    let ingredients = recipe.ingredients();
    if !ingredients.is_empty() {
        let _ = writeln!(out, "\nIngredients:");
        for ingredient in ingredients {
            let _ = writeln!(out, "  - {}", ingredient);
        }
    }
    if let Some(instructions) = recipe.instructions() {
        let _ = writeln!(out, "\nInstructions:\n{}", instructions.trim());
    }
    out
}
