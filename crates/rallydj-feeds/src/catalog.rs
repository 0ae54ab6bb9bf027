//! Catalog feeds: categories, category groups and classes.

use rallydj_core::{Table, merge_labels};
use rallydj_fetch::Transport;
use tracing::info;

use crate::client::{sort_with_category, tag_category};
use crate::{Feed, FeedError, FeedParams, RallyClient};

impl<T: Transport> RallyClient<T> {
    /// Competition categories with one label column per locale, sorted by `reference`.
    pub async fn category(&self, params: &FeedParams) -> Result<Table, FeedError> {
        let mut table = self.labelled(Feed::Category, params, "").await?;
        table.sort_by(Feed::Category.sort_key())?;
        info!(rows = table.num_rows(), "categories loaded");
        Ok(table)
    }

    /// Category groups, sorted by `(_origin, position)`.
    pub async fn groups(&self, params: &FeedParams) -> Result<Table, FeedError> {
        let mut table = self.labelled(Feed::Groups, params, "").await?;
        table.sort_by(Feed::Groups.sort_key())?;
        info!(rows = table.num_rows(), "groups loaded");
        Ok(table)
    }

    /// Vehicle classes of every requested category.
    pub async fn clazz(&self, params: &FeedParams) -> Result<Table, FeedError> {
        let mut parts = Vec::new();
        for category in params.canonical_categories()? {
            let mut table = self.labelled(Feed::Clazz, params, &category).await?;
            tag_category(&mut table, &category);
            parts.push(table);
        }
        let mut table = Table::concat(parts);
        sort_with_category(&mut table, Feed::Clazz.sort_key())?;
        info!(rows = table.num_rows(), "classes loaded");
        Ok(table)
    }

    /// Fetch, merge labels and prune; no sorting.
    async fn labelled(
        &self,
        feed: Feed,
        params: &FeedParams,
        category: &str,
    ) -> Result<Table, FeedError> {
        let mut table = self.fetch_table(feed, params, category).await?;
        if let Some(merge) = feed.labels() {
            table = merge_labels(&table, merge.list_column, merge.join_key)?;
        }
        table.drop_columns(feed.drop_columns());
        Ok(table)
    }
}
