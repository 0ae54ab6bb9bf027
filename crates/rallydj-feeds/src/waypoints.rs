use rallydj_core::Table;
use rallydj_fetch::Transport;
use serde_json::json;
use tracing::info;

use crate::client::{sort_with_category, tag_category};
use crate::{Feed, FeedError, FeedParams, RallyClient};

impl<T: Transport> RallyClient<T> {
    /// Waypoints of one stage for every requested category.
    ///
    /// Each document row lists its waypoints; they become one row each, led by
    /// `stage_code` (the row's `_origin`) and tagged with the request's `year`
    /// and `stage`.
    pub async fn waypoints(&self, params: &FeedParams) -> Result<Table, FeedError> {
        let mut parts = Vec::new();
        for category in params.canonical_categories()? {
            let doc = self.fetch_table(Feed::Waypoints, params, &category).await?;
            let mut table = doc.explode_records("waypoints", &["_origin"])?;
            table.rename_column("_origin", "stage_code")?;
            table.add_column("year", |_| json!(params.year));
            table.add_column("stage", |_| json!(params.stage));
            table.drop_columns(Feed::Waypoints.drop_columns());
            tag_category(&mut table, &category);
            parts.push(table);
        }
        let mut table = Table::concat(parts);
        sort_with_category(&mut table, Feed::Waypoints.sort_key())?;
        info!(rows = table.num_rows(), stage = params.stage, "waypoints loaded");
        Ok(table)
    }
}
