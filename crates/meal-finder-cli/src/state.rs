// SPDX-License-Identifier: AGPL-3.0
// Meal Finder CLI - Application State

use meal_finder_core::{
    AppError, AppSettings, BrowseSession, FavoritesConfig, FavoritesStore, FileKeyValueStore,
    MealDbClient, SettingsStore,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line overrides applied on top of the settings file
#[derive(Debug, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub settings_path: Option<PathBuf>,
}

/// Everything a command needs
pub struct AppState {
    pub settings: AppSettings,
    pub favorites: FavoritesStore,
    pub browse: BrowseSession<MealDbClient>,
}

impl AppState {
    /// Load settings, hydrate favorites and build the API client
    pub async fn new(overrides: Overrides) -> Result<Self, AppError> {
        let settings_store = match overrides.settings_path {
            Some(path) => SettingsStore::with_path(path)?,
            None => SettingsStore::new()?,
        };

        let mut settings = settings_store.get();
        if let Some(api_url) = overrides.api_url {
            settings.api_base_url = api_url;
        }
        settings.validate()?;

        let backend = match overrides.data_dir {
            Some(dir) => FileKeyValueStore::new(dir)?,
            None => FileKeyValueStore::open_default()?,
        };

        let favorites =
            FavoritesStore::spawn(Arc::new(backend), FavoritesConfig::from_settings(&settings));
        // Not fatal: the list starts empty and the store logs the failure
        let _ = favorites.initialize().await;

        let browse = BrowseSession::new(MealDbClient::new(&settings)?);

        Ok(Self {
            settings,
            favorites,
            browse,
        })
    }
}
