use std::collections::BTreeSet;

use crate::FeedError;

/// Live API base URL; `{path}` is replaced by the feed's resource path.
pub const DEFAULT_BASE_URL: &str =
    "https://www.dakar.live.worldrallyraidchampionship.com/api/{path}";
pub const DEFAULT_YEAR: u16 = 2025;
pub const DEFAULT_CATEGORY: &str = "A";
pub const DEFAULT_STAGE: u32 = 1;

/// Where feeds are fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url_template: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url_template: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ApiConfig {
    pub fn new(base_url_template: impl Into<String>) -> Self {
        Self {
            base_url_template: base_url_template.into(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        self.base_url_template.replace("{path}", path)
    }
}

/// Parameters shared by every pipeline call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedParams {
    pub year: u16,
    /// Categories to fan out over; order and repeats do not matter.
    pub categories: Vec<String>,
    pub stage: u32,
}

impl Default for FeedParams {
    fn default() -> Self {
        Self {
            year: DEFAULT_YEAR,
            categories: vec![DEFAULT_CATEGORY.to_string()],
            stage: DEFAULT_STAGE,
        }
    }
}

impl FeedParams {
    pub fn new(year: u16) -> Self {
        Self {
            year,
            ..Self::default()
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_stage(mut self, stage: u32) -> Self {
        self.stage = stage;
        self
    }

    /// Categories sorted and deduplicated: the order a fan-out fetches them in.
    /// An empty list is an error.
    pub fn canonical_categories(&self) -> Result<Vec<String>, FeedError> {
        if self.categories.is_empty() {
            return Err(FeedError::NoCategories);
        }
        Ok(self
            .categories
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect())
    }
}
