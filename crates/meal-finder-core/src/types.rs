// SPDX-License-Identifier: AGPL-3.0
// Meal Finder Core - Type definitions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Highest ingredient/measure index carried by a recipe record
pub const MAX_INGREDIENTS: usize = 20;

/// A recipe record as served by the recipe API.
///
/// Only `idMeal` is interpreted by the favorites store. Every other field,
/// including explicit `null`s and values of unexpected types, is kept verbatim
/// in `fields` so a stored favorite round-trips without loss. The display
/// accessors only surface string values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(rename = "idMeal")]
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// One line of a recipe's ingredient list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingredient {
    pub name: String,
    pub measure: Option<String>,
}

impl std::fmt::Display for Ingredient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.measure {
            Some(measure) => write!(f, "{} {}", measure, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl Recipe {
    /// Create a recipe carrying only an identifier and a title
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut recipe = Self {
            id: id.into(),
            fields: Map::new(),
        };
        recipe.set_field("strMeal", Value::String(name.into()));
        recipe
    }

    /// Set or replace a raw field
    pub fn set_field(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// String value of a raw field, `None` if absent, null or not a string
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.text("strMeal")
    }

    pub fn thumbnail(&self) -> Option<&str> {
        self.text("strMealThumb")
    }

    pub fn category(&self) -> Option<&str> {
        self.text("strCategory")
    }

    /// Cuisine
    pub fn area(&self) -> Option<&str> {
        self.text("strArea")
    }

    pub fn instructions(&self) -> Option<&str> {
        self.text("strInstructions")
    }

    /// Link to the original recipe page
    pub fn source(&self) -> Option<&str> {
        self.text("strSource")
    }

    pub fn youtube(&self) -> Option<&str> {
        self.text("strYoutube")
    }

    /// Whether the identifier is usable as a favorites key
    pub fn has_valid_id(&self) -> bool {
        is_valid_id(&self.id)
    }

    /// Title for display, falling back to the identifier
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or(&self.id)
    }

    /// Ingredient list in slot order, skipping blank slots
    pub fn ingredients(&self) -> Vec<Ingredient> {
        (1..=MAX_INGREDIENTS)
            .filter_map(|index| {
                let name = self.slot_text(&format!("strIngredient{}", index))?;
                let measure = self.slot_text(&format!("strMeasure{}", index));
                Some(Ingredient { name, measure })
            })
            .collect()
    }

    /// Comma separated tags, trimmed
    pub fn tag_list(&self) -> Vec<String> {
        self.text("strTags")
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn slot_text(&self, field: &str) -> Option<String> {
        self.text(field)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    }
}

/// Identifiers must be non-blank strings
pub fn is_valid_id(id: &str) -> bool {
    !id.trim().is_empty()
}

/// Text used when sharing a recipe
pub fn share_message(recipe: &Recipe) -> String {
    format!(
        "Check out this recipe: {}\n\n{}",
        recipe.display_name(),
        recipe
            .source()
            .filter(|s| !s.is_empty())
            .unwrap_or("No link available")
    )
}

/// A recipe category as served by the recipe API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "idCategory")]
    pub id: String,
    #[serde(rename = "strCategory")]
    pub name: String,
    #[serde(rename = "strCategoryThumb", default)]
    pub thumbnail: Option<String>,
    #[serde(rename = "strCategoryDescription", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// What `add_favorite` does when the identifier is already present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Append anyway; the list may hold the same recipe twice
    #[default]
    Allow,
    /// Leave the list untouched
    Ignore,
}

/// Application settings (frontend-agnostic)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Base URL of the recipe API, without trailing slash
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Whole-request timeout for API calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Connect timeout for API calls
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Persistence key holding the favorites list
    #[serde(default = "default_favorites_key")]
    pub favorites_key: String,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

pub const DEFAULT_API_BASE_URL: &str = "https://www.themealdb.com/api/json/v1/1";
pub const DEFAULT_FAVORITES_KEY: &str = "favorites";

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_favorites_key() -> String {
    DEFAULT_FAVORITES_KEY.to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            favorites_key: default_favorites_key(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl AppSettings {
    /// Reject settings no component could work with
    pub fn validate(&self) -> Result<(), AppError> {
        if self.favorites_key.trim().is_empty() {
            return Err(AppError::InvalidConfig(
                "favorites key must not be empty".to_string(),
            ));
        }
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(AppError::InvalidConfig(format!(
                "API base URL must be http(s): {}",
                self.api_base_url
            )));
        }
        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(AppError::InvalidConfig(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Error types for the application
#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("File I/O error: {0}")]
    FileIo(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Favorites store is no longer running")]
    StoreClosed,
}

impl AppError {
    /// Backend read/write failures and decode failures
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            AppError::Persistence(_) | AppError::Serialization(_) | AppError::FileIo(_)
        )
    }

    /// Data source call failures and non-2xx responses
    pub fn is_network(&self) -> bool {
        matches!(self, AppError::Network(_))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileIo(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Every reqwest failure, including an undecodable body, is a data source failure
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn teriyaki() -> Recipe {
        serde_json::from_value(json!({
            "idMeal": "52772",
            "strMeal": "Teriyaki Chicken Casserole",
            "strCategory": "Chicken",
            "strArea": "Japanese",
            "strTags": "Meat, Casserole",
            "strIngredient1": "soy sauce",
            "strMeasure1": "3/4 cup",
            "strIngredient2": "water",
            "strMeasure2": "1/2 cup",
            "strIngredient3": "",
            "strMeasure3": " ",
            "strIngredient4": null,
            "strIngredient5": "brown sugar",
            "strMeasure5": "",
            "dateModified": null
        }))
        .unwrap()
    }

    #[test]
    fn test_ingredients_skip_blank_slots() {
        let ingredients = teriyaki().ingredients();
        assert_eq!(ingredients.len(), 3);
        assert_eq!(ingredients[0].to_string(), "3/4 cup soy sauce");
        assert_eq!(ingredients[1].name, "water");
        assert_eq!(ingredients[2].measure, None);
        assert_eq!(ingredients[2].to_string(), "brown sugar");
    }

    #[test]
    fn test_unknown_fields_survive_reencoding() {
        let recipe = teriyaki();
        let value = serde_json::to_value(&recipe).unwrap();
        assert_eq!(value["strIngredient2"], "water");
        assert_eq!(value["idMeal"], "52772");
        assert_eq!(serde_json::from_value::<Recipe>(value).unwrap(), recipe);
    }

    #[test]
    fn test_explicit_nulls_are_kept() {
        let raw = json!({ "idMeal": "1", "strSource": null, "strTags": null });
        let recipe: Recipe = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(recipe.source(), None);
        assert_eq!(serde_json::to_value(&recipe).unwrap(), raw);
    }

    #[test]
    fn test_mistyped_display_fields_are_kept_but_not_surfaced() {
        let raw = json!({ "idMeal": "1", "strMeal": 42, "strTags": ["a"] });
        let recipe: Recipe = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(recipe.name(), None);
        assert_eq!(recipe.display_name(), "1");
        assert!(recipe.tag_list().is_empty());
        assert_eq!(serde_json::to_value(&recipe).unwrap(), raw);
    }

    #[test]
    fn test_tag_list() {
        assert_eq!(teriyaki().tag_list(), vec!["Meat", "Casserole"]);
        assert!(Recipe::new("1", "Plain").tag_list().is_empty());
    }

    #[test]
    fn test_share_message() {
        let mut recipe = Recipe::new("1", "Dal");
        assert_eq!(
            share_message(&recipe),
            "Check out this recipe: Dal\n\nNo link available"
        );
        recipe.set_field("strSource", "https://example.com/dal");
        assert_eq!(
            share_message(&recipe),
            "Check out this recipe: Dal\n\nhttps://example.com/dal"
        );
    }

    #[test]
    fn test_valid_id() {
        assert!(is_valid_id("52772"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("   "));
    }

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.favorites_key, "favorites");
        assert_eq!(settings.duplicate_policy, DuplicatePolicy::Allow);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"duplicatePolicy":"ignore"}"#).unwrap();
        assert_eq!(settings.duplicate_policy, DuplicatePolicy::Ignore);
        assert_eq!(settings.request_timeout_secs, 30);
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut settings = AppSettings::default();
        settings.favorites_key = " ".to_string();
        assert!(matches!(settings.validate(), Err(AppError::InvalidConfig(_))));

        let mut settings = AppSettings::default();
        settings.api_base_url = "ftp://example.com".to_string();
        assert!(settings.validate().is_err());

        let mut settings = AppSettings::default();
        settings.request_timeout_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_error_taxonomy() {
        assert!(AppError::Serialization("bad".into()).is_persistence());
        assert!(AppError::Persistence("down".into()).is_persistence());
        assert!(AppError::Network("503".into()).is_network());
        assert!(!AppError::Serialization("bad".into()).is_network());
        assert!(!AppError::Network("garbage body".into()).is_persistence());
        assert!(!AppError::StoreClosed.is_network());
    }
}
