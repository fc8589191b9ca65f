// SPDX-License-Identifier: AGPL-3.0
// Meal Finder Core - Recipe API client
//
// Read-only, unauthenticated calls against TheMealDB v1 JSON API.
// No retries and no caching: every call goes to the network.

use crate::types::{AppError, AppSettings, Category, Recipe};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Read operations the app needs from a recipe data source
#[async_trait]
pub trait RecipeSource: Send + Sync {
    /// Default listing shown when no category is selected
    async fn popular(&self) -> Result<Vec<Recipe>, AppError>;

    async fn categories(&self) -> Result<Vec<Category>, AppError>;

    /// Recipes in a category. Records from this call are summaries
    /// (id, title, thumbnail).
    async fn by_category(&self, category: &str) -> Result<Vec<Recipe>, AppError>;

    /// Recipes whose title matches a free-text term
    async fn search(&self, term: &str) -> Result<Vec<Recipe>, AppError>;

    /// Full record for one recipe, `None` if the id is unknown
    async fn lookup(&self, id: &str) -> Result<Option<Recipe>, AppError>;
}

#[async_trait]
impl<T: RecipeSource + ?Sized> RecipeSource for Arc<T> {
    async fn popular(&self) -> Result<Vec<Recipe>, AppError> {
        (**self).popular().await
    }

    async fn categories(&self) -> Result<Vec<Category>, AppError> {
        (**self).categories().await
    }

    async fn by_category(&self, category: &str) -> Result<Vec<Recipe>, AppError> {
        (**self).by_category(category).await
    }

    async fn search(&self, term: &str) -> Result<Vec<Recipe>, AppError> {
        (**self).search(term).await
    }

    async fn lookup(&self, id: &str) -> Result<Option<Recipe>, AppError> {
        (**self).lookup(id).await
    }
}

#[derive(Deserialize)]
struct MealsResponse {
    #[serde(default)]
    meals: Option<Vec<Recipe>>,
}

#[derive(Deserialize)]
struct CategoriesResponse {
    #[serde(default)]
    categories: Option<Vec<Category>>,
}

/// HTTP client for TheMealDB
pub struct MealDbClient {
    http_client: Client,
    base_url: String,
}

impl MealDbClient {
    pub fn new(settings: &AppSettings) -> Result<Self, AppError> {
        settings.validate()?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .user_agent(concat!("meal-finder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AppError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        tracing::debug!("GET {} {:?}", url, query);

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    AppError::Network(format!("Cannot connect to {}: {}", self.base_url, e))
                } else if e.is_timeout() {
                    AppError::Network(format!("Request to {} timed out", endpoint))
                } else {
                    AppError::Network(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Network(format!(
                "{} returned status {}",
                endpoint, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Network(format!("Failed to read response: {}", e)))?;

        serde_json::from_str(&body).map_err(|e| {
            AppError::Network(format!("Unexpected response from {}: {}", endpoint, e))
        })
    }

    async fn meals(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Vec<Recipe>, AppError> {
        let response: MealsResponse = self.get_json(endpoint, query).await?;
        Ok(response.meals.unwrap_or_default())
    }
}

#[async_trait]
impl RecipeSource for MealDbClient {
    async fn popular(&self) -> Result<Vec<Recipe>, AppError> {
        self.meals("search.php", &[("s", "")]).await
    }

    async fn categories(&self) -> Result<Vec<Category>, AppError> {
        let response: CategoriesResponse = self.get_json("categories.php", &[]).await?;
        Ok(response.categories.unwrap_or_default())
    }

    async fn by_category(&self, category: &str) -> Result<Vec<Recipe>, AppError> {
        self.meals("filter.php", &[("c", category)]).await
    }

    async fn search(&self, term: &str) -> Result<Vec<Recipe>, AppError> {
        self.meals("search.php", &[("s", term)]).await
    }

    async fn lookup(&self, id: &str) -> Result<Option<Recipe>, AppError> {
        let meals = self.meals("lookup.php", &[("i", id)]).await?;
        Ok(meals.into_iter().next())
    }
}
