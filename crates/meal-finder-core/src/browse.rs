// SPDX-License-Identifier: AGPL-3.0
// Meal Finder Core - Recipe browsing state
//
// Holds what the home screen shows: the recipe listing, the category strip,
// the selected category and the last search. Every listing fetch is tagged
// with a generation number; only the newest generation may update the view.

use crate::client::RecipeSource;
use crate::favorites::FavoritesStore;
use crate::types::{AppError, Category, Recipe};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Monotonic request counter for one query slot
#[derive(Debug, Default)]
pub struct GenerationCounter {
    latest: AtomicU64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new generation, superseding all earlier ones
    pub fn next(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == generation
    }
}

/// What the recipe listing currently shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingQuery {
    Popular,
    Category(String),
    Search(String),
}

impl fmt::Display for ListingQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingQuery::Popular => write!(f, "popular dishes"),
            ListingQuery::Category(name) => write!(f, "category {}", name),
            ListingQuery::Search(term) => write!(f, "search {:?}", term),
        }
    }
}

/// Whether a finished fetch made it into the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A newer request for the same slot was issued meanwhile
    Superseded,
}

/// Snapshot of the browse screen
#[derive(Debug, Clone, PartialEq)]
pub struct BrowseView {
    pub query: ListingQuery,
    pub recipes: Vec<Recipe>,
    pub categories: Vec<Category>,
    pub loading: bool,
    /// Message of the last failed fetch, cleared by the next request
    pub error: Option<String>,
}

impl Default for BrowseView {
    fn default() -> Self {
        Self {
            query: ListingQuery::Popular,
            recipes: Vec::new(),
            categories: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

impl BrowseView {
    pub fn selected_category(&self) -> Option<&str> {
        match &self.query {
            ListingQuery::Category(name) => Some(name),
            _ => None,
        }
    }

    /// Listing heading, e.g. "Popular Dishes in Seafood"
    pub fn heading(&self) -> String {
        match &self.query {
            ListingQuery::Popular => "Popular Dishes".to_string(),
            ListingQuery::Category(name) => format!("Popular Dishes in {}", name),
            ListingQuery::Search(term) => format!("Results for \"{}\"", term),
        }
    }
}

/// A listed recipe together with its favorite status
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeCard {
    pub recipe: Recipe,
    pub is_favorite: bool,
}

/// Browse state over a recipe source
pub struct BrowseSession<S> {
    source: S,
    listing_generation: GenerationCounter,
    categories_generation: GenerationCounter,
    view: watch::Sender<BrowseView>,
}

impl<S: RecipeSource> BrowseSession<S> {
    pub fn new(source: S) -> Self {
        let (view, _) = watch::channel(BrowseView::default());
        Self {
            source,
            listing_generation: GenerationCounter::new(),
            categories_generation: GenerationCounter::new(),
            view,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Current view
    pub fn view(&self) -> BrowseView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BrowseView> {
        self.view.subscribe()
    }

    /// Show the default listing and forget any category filter
    pub async fn load_popular(&self) -> Result<FetchOutcome, AppError> {
        self.load_listing(ListingQuery::Popular).await
    }

    /// Filter by category. Selecting the category that is already selected
    /// clears the filter and goes back to the default listing.
    pub async fn select_category(&self, name: &str) -> Result<FetchOutcome, AppError> {
        let already_selected = self.view.borrow().selected_category() == Some(name);
        if already_selected {
            self.load_listing(ListingQuery::Popular).await
        } else {
            self.load_listing(ListingQuery::Category(name.to_string()))
                .await
        }
    }

    /// Free-text search. A blank term shows the default listing.
    pub async fn search(&self, term: &str) -> Result<FetchOutcome, AppError> {
        let term = term.trim();
        if term.is_empty() {
            self.load_listing(ListingQuery::Popular).await
        } else {
            self.load_listing(ListingQuery::Search(term.to_string()))
                .await
        }
    }

    /// Re-run the query currently shown
    pub async fn refresh(&self) -> Result<FetchOutcome, AppError> {
        let query = self.view.borrow().query.clone();
        self.load_listing(query).await
    }

    /// Fetch the category strip
    pub async fn load_categories(&self) -> Result<FetchOutcome, AppError> {
        let generation = self.categories_generation.next();
        let result = self.source.categories().await;

        match result {
            Ok(categories) => {
                let applied = self.view.send_if_modified(|view| {
                    if !self.categories_generation.is_current(generation) {
                        return false;
                    }
                    view.categories = categories;
                    true
                });
                Ok(self.outcome(applied, "categories", generation))
            }
            Err(e) => {
                if !self.categories_generation.is_current(generation) {
                    return Ok(self.outcome(false, "categories", generation));
                }
                tracing::warn!("Failed to load categories: {}", e);
                Err(e)
            }
        }
    }

    /// Full record for the details screen
    pub async fn details(&self, id: &str) -> Result<Option<Recipe>, AppError> {
        self.source.lookup(id).await.map_err(|e| {
            tracing::error!("Failed to load details for {}: {}", id, e);
            e
        })
    }

    /// Current listing merged with favorite status
    pub fn cards(&self, favorites: &FavoritesStore) -> Vec<RecipeCard> {
        let favorites = favorites.snapshot();
        self.view
            .borrow()
            .recipes
            .iter()
            .map(|recipe| RecipeCard {
                is_favorite: favorites.iter().any(|f| f.id == recipe.id),
                recipe: recipe.clone(),
            })
            .collect()
    }

    async fn load_listing(&self, query: ListingQuery) -> Result<FetchOutcome, AppError> {
        let generation = self.listing_generation.next();
        tracing::debug!("Loading {} (generation {})", query, generation);

        self.view.send_modify(|view| {
            view.query = query.clone();
            view.loading = true;
            view.error = None;
        });

        let result = match &query {
            ListingQuery::Popular => self.source.popular().await,
            ListingQuery::Category(name) => self.source.by_category(name).await,
            ListingQuery::Search(term) => self.source.search(term).await,
        };

        match result {
            Ok(recipes) => {
                let applied = self.view.send_if_modified(|view| {
                    if !self.listing_generation.is_current(generation) {
                        return false;
                    }
                    view.recipes = recipes;
                    view.loading = false;
                    true
                });
                Ok(self.outcome(applied, "listing", generation))
            }
            Err(e) => {
                let message = e.to_string();
                let applied = self.view.send_if_modified(|view| {
                    if !self.listing_generation.is_current(generation) {
                        return false;
                    }
                    view.loading = false;
                    view.error = Some(message);
                    true
                });
                if !applied {
                    return Ok(self.outcome(false, "listing", generation));
                }
                tracing::warn!("Failed to load {}: {}", query, e);
                Err(e)
            }
        }
    }

    fn outcome(&self, applied: bool, slot: &str, generation: u64) -> FetchOutcome {
        if applied {
            FetchOutcome::Applied
        } else {
            tracing::debug!("Discarded stale {} response (generation {})", slot, generation);
            FetchOutcome::Superseded
        }
    }
}
