// SPDX-License-Identifier: AGPL-3.0
// Meal Finder Core - Shared logic for all frontends
//
// This crate provides:
// - Recipe/Category records, AppSettings and AppError types
// - SettingsStore for persistent settings
// - Key-value persistence backends
// - FavoritesStore for the persistent favorites list
// - MealDbClient for the recipe API
// - BrowseSession for the home screen listing
//
// Frontend-specific code lives in separate crates.

pub mod browse;
pub mod client;
pub mod favorites;
pub mod persistence;
pub mod settings;
pub mod types;

// Re-export commonly used items
pub use browse::{BrowseSession, BrowseView, FetchOutcome, GenerationCounter, ListingQuery, RecipeCard};
pub use client::{MealDbClient, RecipeSource};
pub use favorites::{FavoritesConfig, FavoritesSnapshot, FavoritesStore};
pub use persistence::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use settings::SettingsStore;
pub use types::{
    is_valid_id, share_message, AppError, AppSettings, Category, DuplicatePolicy, Ingredient,
    Recipe,
};
