use rallydj_core::{ShapeError, Table};
use rallydj_fetch::Transport;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    ApiConfig, Feed, FeedError, FeedParams, ScoreTables, StageTables, WithdrawalTables,
};

/// Column added to every row of a per-category feed.
pub(crate) const CATEGORY_COLUMN: &str = "category";

/// Client for the rally live API feeds.
///
/// Fetches go through the injected [`Transport`] one after another. Nothing is
/// held between calls; caching is the transport's concern.
pub struct RallyClient<T> {
    transport: T,
    config: ApiConfig,
}

impl<T: Transport> RallyClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ApiConfig::default())
    }

    pub fn with_config(transport: T, config: ApiConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Run `feed` and return its output tables.
    pub async fn run(&self, feed: Feed, params: &FeedParams) -> Result<FeedOutput, FeedError> {
        Ok(match feed {
            Feed::Category => FeedOutput::Single(feed, self.category(params).await?),
            Feed::Groups => FeedOutput::Single(feed, self.groups(params).await?),
            Feed::Clazz => FeedOutput::Single(feed, self.clazz(params).await?),
            Feed::Waypoints => FeedOutput::Single(feed, self.waypoints(params).await?),
            Feed::Withdrawals => FeedOutput::Withdrawals(self.withdrawals(params).await?),
            Feed::Stages => FeedOutput::Stages(self.stages(params).await?),
            Feed::Scores => FeedOutput::Scores(self.scores(params).await?),
        })
    }

    /// Fetch the raw document for `feed`.
    pub async fn fetch_document(
        &self,
        feed: Feed,
        params: &FeedParams,
        category: &str,
    ) -> Result<Value, FeedError> {
        let url = self
            .config
            .url(&feed.resource(params.year, category, params.stage));
        info!(feed = %feed, url = %url, "fetching feed");
        Ok(self.transport.fetch(&url).await?)
    }

    /// Fetch `feed` as a table. A document with no rows is an error.
    pub(crate) async fn fetch_table(
        &self,
        feed: Feed,
        params: &FeedParams,
        category: &str,
    ) -> Result<Table, FeedError> {
        let doc = self.fetch_document(feed, params, category).await?;
        let table = Table::from_document(&doc)?;
        if table.is_empty() {
            return Err(ShapeError::EmptyResult {
                resource: feed.resource(params.year, category, params.stage),
            }
            .into());
        }
        debug!(feed = %feed, category, rows = table.num_rows(), "document parsed");
        Ok(table)
    }
}

/// Tables produced by one feed run, by name.
#[derive(Debug, Clone)]
pub enum FeedOutput {
    Single(Feed, Table),
    Withdrawals(WithdrawalTables),
    Stages(StageTables),
    Scores(ScoreTables),
}

impl FeedOutput {
    /// Every output table with its name; the main table comes first.
    pub fn tables(&self) -> Vec<(&'static str, &Table)> {
        match self {
            FeedOutput::Single(feed, table) => vec![(feed.name(), table)],
            FeedOutput::Withdrawals(w) => vec![
                ("withdrawals", &w.withdrawals),
                ("competitors", &w.competitors),
                ("teams", &w.teams),
            ],
            FeedOutput::Stages(s) => vec![
                ("stages", &s.stages),
                ("sectors", &s.sectors),
                ("stage_surfaces", &s.stage_surfaces),
                ("section_surfaces", &s.section_surfaces),
                ("surfaces", &s.surfaces),
            ],
            FeedOutput::Scores(s) => vec![
                ("scores", &s.scores),
                ("competitors", &s.competitors),
                ("teams", &s.teams),
            ],
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, t)| t)
    }
}

pub(crate) fn tag_category(table: &mut Table, category: &str) {
    table.add_column(CATEGORY_COLUMN, |_| Value::String(category.to_string()));
}

/// Sort a fanned-out table by `key`, then by category.
pub(crate) fn sort_with_category(table: &mut Table, key: &[&str]) -> Result<(), ShapeError> {
    let mut full = key.to_vec();
    full.push(CATEGORY_COLUMN);
    table.sort_by(&full)
}
