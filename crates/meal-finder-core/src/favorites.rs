// SPDX-License-Identifier: AGPL-3.0
// Meal Finder Core - Favorites storage
//
// The favorites list is one JSON array stored under a single key.
// All mutations go through one writer task, in arrival order, and the
// in-memory list only changes after the backend accepted the write.

use crate::persistence::KeyValueStore;
use crate::types::{is_valid_id, AppError, AppSettings, DuplicatePolicy, Recipe};
use async_channel::{Receiver, Sender};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

/// Capacity of the pending mutation queue
const COMMAND_QUEUE_SIZE: usize = 32;

/// Shared, immutable view of the favorites list
pub type FavoritesSnapshot = Arc<Vec<Recipe>>;

/// Favorites store configuration
#[derive(Debug, Clone)]
pub struct FavoritesConfig {
    /// Persistence key holding the encoded list
    pub key: String,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self::from_settings(&AppSettings::default())
    }
}

impl FavoritesConfig {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            key: settings.favorites_key.clone(),
            duplicate_policy: settings.duplicate_policy,
        }
    }
}

/// Mutations handled by the writer task
#[derive(Debug)]
enum FavoritesCommand {
    Initialize {
        reply: Sender<Result<usize, AppError>>,
    },
    Add {
        recipe: Recipe,
        reply: Sender<Result<(), AppError>>,
    },
    Remove {
        id: String,
        reply: Sender<Result<usize, AppError>>,
    },
    Toggle {
        recipe: Recipe,
        reply: Sender<Result<bool, AppError>>,
    },
}

/// Handle onto the process-wide favorites list.
///
/// Cloning is cheap; every clone talks to the same writer task. The list
/// starts empty and is hydrated by [`FavoritesStore::initialize`].
#[derive(Clone)]
pub struct FavoritesStore {
    command_tx: Sender<FavoritesCommand>,
    state: Arc<watch::Sender<FavoritesSnapshot>>,
}

impl FavoritesStore {
    /// Start the writer task. Must be called from within a tokio runtime.
    pub fn spawn(backend: Arc<dyn KeyValueStore>, config: FavoritesConfig) -> Self {
        let (command_tx, command_rx) =
            async_channel::bounded::<FavoritesCommand>(COMMAND_QUEUE_SIZE);
        let (state_tx, _) = watch::channel(FavoritesSnapshot::default());
        let state = Arc::new(state_tx);

        let writer = FavoritesWriter {
            backend,
            config,
            state: state.clone(),
        };
        tokio::spawn(writer.run(command_rx));

        Self { command_tx, state }
    }

    /// Load the persisted list, dropping records without a usable identifier.
    ///
    /// On a read or decode failure the list falls back to empty and the error
    /// is returned after being logged. Returns the number of loaded favorites.
    pub async fn initialize(&self) -> Result<usize, AppError> {
        self.request(|reply| FavoritesCommand::Initialize { reply })
            .await
    }

    /// Append a recipe and persist the list
    pub async fn add_favorite(&self, recipe: Recipe) -> Result<(), AppError> {
        self.request(|reply| FavoritesCommand::Add { recipe, reply })
            .await
    }

    /// Remove every entry with this identifier and persist the list.
    /// Returns how many entries were removed.
    pub async fn remove_favorite(&self, id: &str) -> Result<usize, AppError> {
        let id = id.to_string();
        self.request(|reply| FavoritesCommand::Remove { id, reply })
            .await
    }

    /// Remove the recipe if it is a favorite, add it otherwise.
    /// Returns whether it is a favorite afterwards.
    pub async fn toggle_favorite(&self, recipe: Recipe) -> Result<bool, AppError> {
        self.request(|reply| FavoritesCommand::Toggle { recipe, reply })
            .await
    }

    /// Whether any entry carries this identifier
    pub fn is_favorite(&self, id: &str) -> bool {
        self.state.borrow().iter().any(|r| r.id == id)
    }

    /// Copy of the current list
    pub fn favorites(&self) -> Vec<Recipe> {
        self.state.borrow().as_ref().clone()
    }

    /// Shared reference to the current list
    pub fn snapshot(&self) -> FavoritesSnapshot {
        self.state.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver that observes the list after every published change
    pub fn subscribe(&self) -> watch::Receiver<FavoritesSnapshot> {
        self.state.subscribe()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Sender<Result<T, AppError>>) -> FavoritesCommand,
    ) -> Result<T, AppError> {
        let (reply_tx, reply_rx) = async_channel::bounded(1);
        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| AppError::StoreClosed)?;
        reply_rx.recv().await.map_err(|_| AppError::StoreClosed)?
    }
}

/// Sole owner of writes to the backend key
struct FavoritesWriter {
    backend: Arc<dyn KeyValueStore>,
    config: FavoritesConfig,
    state: Arc<watch::Sender<FavoritesSnapshot>>,
}

impl FavoritesWriter {
    async fn run(self, command_rx: Receiver<FavoritesCommand>) {
        while let Ok(command) = command_rx.recv().await {
            match command {
                FavoritesCommand::Initialize { reply } => {
                    let result = self.initialize().await;
                    let _ = reply.send(result).await;
                }
                FavoritesCommand::Add { recipe, reply } => {
                    let result = self.add(recipe).await;
                    let _ = reply.send(result).await;
                }
                FavoritesCommand::Remove { id, reply } => {
                    let result = self.remove(&id).await;
                    let _ = reply.send(result).await;
                }
                FavoritesCommand::Toggle { recipe, reply } => {
                    let result = self.toggle(recipe).await;
                    let _ = reply.send(result).await;
                }
            }
        }
        tracing::debug!("Favorites writer stopped");
    }

    fn current(&self) -> FavoritesSnapshot {
        self.state.borrow().clone()
    }

    async fn initialize(&self) -> Result<usize, AppError> {
        let loaded = match self.backend.get(&self.config.key).await {
            Ok(Some(content)) => decode_favorites(&content),
            Ok(None) => Ok(DecodedFavorites::default()),
            Err(e) => Err(e),
        };

        match loaded {
            Ok(decoded) => {
                if decoded.dropped > 0 {
                    tracing::warn!(
                        "Dropped {} stored favorites without a valid id",
                        decoded.dropped
                    );
                    if let Err(e) = self.write(&decoded.recipes).await {
                        tracing::warn!("Failed to rewrite cleaned favorites: {}", e);
                    }
                }
                let count = decoded.recipes.len();
                self.state.send_replace(Arc::new(decoded.recipes));
                tracing::info!("Loaded {} favorites", count);
                Ok(count)
            }
            Err(e) => {
                tracing::error!("Failed to load favorites, starting empty: {}", e);
                self.state.send_replace(FavoritesSnapshot::default());
                Err(e)
            }
        }
    }

    async fn add(&self, recipe: Recipe) -> Result<(), AppError> {
        if !recipe.has_valid_id() {
            return Err(AppError::InvalidConfig(
                "Cannot favorite a recipe without an id".to_string(),
            ));
        }

        let current = self.current();
        if self.config.duplicate_policy == DuplicatePolicy::Ignore
            && current.iter().any(|r| r.id == recipe.id)
        {
            tracing::debug!("Recipe {} already a favorite", recipe.id);
            return Ok(());
        }

        let mut updated = current.as_ref().clone();
        updated.push(recipe);
        self.commit(updated).await
    }

    async fn remove(&self, id: &str) -> Result<usize, AppError> {
        let current = self.current();
        let updated: Vec<Recipe> = current.iter().filter(|r| r.id != id).cloned().collect();
        let removed = current.len() - updated.len();
        self.commit(updated).await?;
        Ok(removed)
    }

    async fn toggle(&self, recipe: Recipe) -> Result<bool, AppError> {
        if self.current().iter().any(|r| r.id == recipe.id) {
            self.remove(&recipe.id).await?;
            Ok(false)
        } else {
            self.add(recipe).await?;
            Ok(true)
        }
    }

    /// Persist first, publish only once the backend accepted the write
    async fn commit(&self, updated: Vec<Recipe>) -> Result<(), AppError> {
        self.write(&updated).await?;
        tracing::info!("Favorites updated ({} entries)", updated.len());
        self.state.send_replace(Arc::new(updated));
        Ok(())
    }

    async fn write(&self, recipes: &[Recipe]) -> Result<(), AppError> {
        let content = serde_json::to_string(recipes)
            .map_err(|e| AppError::Serialization(format!("Failed to encode favorites: {}", e)))?;
        self.backend
            .set(&self.config.key, content)
            .await
            .map_err(|e| {
                tracing::error!("Failed to persist favorites: {}", e);
                e
            })
    }
}

#[derive(Debug, Default)]
struct DecodedFavorites {
    recipes: Vec<Recipe>,
    dropped: usize,
}

/// Decode a stored list, skipping entries that are not usable records
fn decode_favorites(content: &str) -> Result<DecodedFavorites, AppError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| AppError::Serialization(format!("Failed to parse favorites: {}", e)))?;

    let items = match value {
        Value::Null => return Ok(DecodedFavorites::default()),
        Value::Array(items) => items,
        other => {
            return Err(AppError::Serialization(format!(
                "Favorites must be a JSON array, found {}",
                json_kind(&other)
            )))
        }
    };

    let mut decoded = DecodedFavorites::default();
    for item in items {
        match recipe_from_value(item) {
            Some(recipe) => decoded.recipes.push(recipe),
            None => decoded.dropped += 1,
        }
    }
    Ok(decoded)
}

/// Only the identifier is checked; every other field is kept as stored
fn recipe_from_value(item: Value) -> Option<Recipe> {
    let Value::Object(mut fields) = item else {
        return None;
    };
    let id = match fields.remove("idMeal") {
        Some(Value::String(id)) if is_valid_id(&id) => id,
        _ => return None,
    };
    Some(Recipe { id, fields })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryKeyValueStore;
    use async_trait::async_trait;

    fn store_with(backend: Arc<MemoryKeyValueStore>) -> FavoritesStore {
        FavoritesStore::spawn(backend, FavoritesConfig::default())
    }

    #[test]
    fn test_decode_drops_records_without_id() {
        let decoded = decode_favorites(
            r#"[{"idMeal":"1"},{"strMeal":"no id"},null,{"idMeal":""},{"idMeal":7},"x"]"#,
        )
        .unwrap();
        assert_eq!(decoded.recipes.len(), 1);
        assert_eq!(decoded.recipes[0].id, "1");
        assert_eq!(decoded.dropped, 5);
    }

    #[test]
    fn test_decode_keeps_records_with_odd_display_fields() {
        let decoded =
            decode_favorites(r#"[{"idMeal":"1","strMeal":42},{"idMeal":"2","strTags":["a"]}]"#)
                .unwrap();
        assert_eq!(decoded.dropped, 0);
        assert_eq!(decoded.recipes.len(), 2);
        assert_eq!(decoded.recipes[0].fields["strMeal"], 42);
        assert_eq!(decoded.recipes[1].display_name(), "2");
    }

    #[tokio::test]
    async fn test_odd_display_fields_survive_initialize() {
        let stored = r#"[{"idMeal":"1","strMeal":42},{"idMeal":"2","strTags":["a"]}]"#;
        let backend = Arc::new(MemoryKeyValueStore::new());
        backend.insert("favorites", stored);
        let store = store_with(backend.clone());

        assert_eq!(store.initialize().await.unwrap(), 2);
        assert!(store.is_favorite("1"));
        assert!(store.is_favorite("2"));
        assert_eq!(backend.write_count(), 0);
        assert_eq!(backend.peek("favorites").as_deref(), Some(stored));

        store.add_favorite(Recipe::new("3", "Soup")).await.unwrap();
        let rewritten: Value = serde_json::from_str(&backend.peek("favorites").unwrap()).unwrap();
        assert_eq!(rewritten[0]["strMeal"], 42);
        assert_eq!(rewritten[1]["strTags"], serde_json::json!(["a"]));
        assert_eq!(rewritten[2]["idMeal"], "3");
    }

    #[tokio::test]
    async fn test_failed_cleanup_write_still_publishes_cleaned_list() {
        let dirty = r#"[{"idMeal":"1"},null]"#;
        let backend = Arc::new(MemoryKeyValueStore::new());
        backend.insert("favorites", dirty);
        backend.set_fail_writes(true);
        let store = store_with(backend.clone());

        assert_eq!(store.initialize().await.unwrap(), 1);
        let ids: Vec<String> = store.favorites().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["1"]);
        assert_eq!(backend.peek("favorites").as_deref(), Some(dirty));
        assert_eq!(backend.write_count(), 0);
    }

    #[test]
    fn test_decode_rejects_non_arrays() {
        assert!(matches!(
            decode_favorites(r#"{"favorites":[]}"#),
            Err(AppError::Serialization(_))
        ));
        assert!(decode_favorites("not json").is_err());
        assert!(decode_favorites("null").unwrap().recipes.is_empty());
    }

    #[tokio::test]
    async fn test_add_then_remove() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let store = store_with(backend.clone());
        store.initialize().await.unwrap();

        store.add_favorite(Recipe::new("52772", "Teriyaki")).await.unwrap();
        assert!(store.is_favorite("52772"));
        assert_eq!(backend.write_count(), 1);

        assert_eq!(store.remove_favorite("52772").await.unwrap(), 1);
        assert!(!store.is_favorite("52772"));
        assert_eq!(backend.peek("favorites").as_deref(), Some("[]"));
        assert_eq!(backend.write_count(), 2);
    }

    #[tokio::test]
    async fn test_remove_absent_id_is_not_an_error() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let store = store_with(backend.clone());
        assert_eq!(store.remove_favorite("missing").await.unwrap(), 0);
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_untouched() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let store = store_with(backend.clone());
        store.add_favorite(Recipe::new("1", "Kept")).await.unwrap();

        backend.set_fail_writes(true);
        let err = store.add_favorite(Recipe::new("2", "Lost")).await.unwrap_err();
        assert!(err.is_persistence());
        assert!(!store.is_favorite("2"));
        assert_eq!(store.len(), 1);

        let err = store.remove_favorite("1").await.unwrap_err();
        assert!(err.is_persistence());
        assert!(store.is_favorite("1"));
    }

    #[tokio::test]
    async fn test_read_failure_falls_back_to_empty() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        backend.insert("favorites", r#"[{"idMeal":"1"}]"#);
        backend.set_fail_reads(true);
        let store = store_with(backend);
        assert!(store.initialize().await.unwrap_err().is_persistence());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_value_falls_back_to_empty() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        backend.insert("favorites", "{{{");
        let store = store_with(backend.clone());
        assert!(matches!(
            store.initialize().await,
            Err(AppError::Serialization(_))
        ));
        assert!(store.favorites().is_empty());
        // Corrupt data is left for inspection, not overwritten
        assert_eq!(backend.write_count(), 0);
    }

    #[tokio::test]
    async fn test_clean_load_does_not_write_back() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        backend.insert("favorites", r#"[{"idMeal":"1"},{"idMeal":"2"}]"#);
        let store = store_with(backend.clone());
        assert_eq!(store.initialize().await.unwrap(), 2);
        assert_eq!(backend.write_count(), 0);
    }

    #[tokio::test]
    async fn test_toggle_flips_membership() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let store = store_with(backend);
        let recipe = Recipe::new("9", "Pho");
        assert!(store.toggle_favorite(recipe.clone()).await.unwrap());
        assert!(store.is_favorite("9"));
        assert!(!store.toggle_favorite(recipe).await.unwrap());
        assert!(!store.is_favorite("9"));
    }

    #[tokio::test]
    async fn test_ignore_policy_skips_duplicates() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let store = FavoritesStore::spawn(
            backend.clone(),
            FavoritesConfig {
                key: "favorites".to_string(),
                duplicate_policy: DuplicatePolicy::Ignore,
            },
        );
        let recipe = Recipe::new("5", "Soup");
        store.add_favorite(recipe.clone()).await.unwrap();
        store.add_favorite(recipe).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test]
    async fn test_rejects_recipe_without_id() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let store = store_with(backend.clone());
        let err = store.add_favorite(Recipe::new(" ", "Nameless")).await;
        assert!(matches!(err, Err(AppError::InvalidConfig(_))));
        assert_eq!(backend.write_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_see_each_publish() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let store = store_with(backend);
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.add_favorite(Recipe::new("1", "A")).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
        assert!(!rx.has_changed().unwrap());

        store.add_favorite(Recipe::new("2", "B")).await.unwrap();
        rx.changed().await.unwrap();
        let ids: Vec<String> = rx.borrow().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_failed_write_publishes_nothing() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let store = store_with(backend.clone());
        let rx = store.subscribe();
        backend.set_fail_writes(true);
        assert!(store.add_favorite(Recipe::new("1", "A")).await.is_err());
        assert!(!rx.has_changed().unwrap());
    }

    /// Backend that yields inside every call so concurrent callers interleave
    struct YieldingStore(MemoryKeyValueStore);

    #[async_trait]
    impl KeyValueStore for YieldingStore {
        async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
            tokio::task::yield_now().await;
            self.0.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> Result<(), AppError> {
            tokio::task::yield_now().await;
            self.0.set(key, value).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_are_not_lost() {
        let backend = Arc::new(YieldingStore(MemoryKeyValueStore::new()));
        let store = FavoritesStore::spawn(backend.clone(), FavoritesConfig::default());

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..25 {
            let store = store.clone();
            tasks.spawn(async move {
                store
                    .add_favorite(Recipe::new(i.to_string(), format!("Dish {}", i)))
                    .await
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        assert_eq!(store.len(), 25);
        let stored: Vec<Value> =
            serde_json::from_str(&backend.0.peek("favorites").unwrap()).unwrap();
        assert_eq!(stored.len(), 25);
        assert_eq!(backend.0.write_count(), 25);
    }
}
