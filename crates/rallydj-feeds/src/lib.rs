//! Retrieval pipelines: fetch a feed, reshape it into tables, prune and sort.
//!
//! Every pipeline is a method on [`RallyClient`] and depends only on its
//! [`FeedParams`] and the injected transport.

mod catalog;
mod client;
mod config;
pub mod enrich;
mod error;
mod feed;
mod scores;
mod stages;
mod waypoints;
mod withdrawals;

pub use client::{FeedOutput, RallyClient};
pub use config::{
    ApiConfig, DEFAULT_BASE_URL, DEFAULT_CATEGORY, DEFAULT_STAGE, DEFAULT_YEAR, FeedParams,
};
pub use error::FeedError;
pub use feed::{Feed, LabelMerge};
pub use scores::ScoreTables;
pub use stages::{SECTOR_COLUMNS, STAGE_COLUMNS, StageTables};
pub use withdrawals::WithdrawalTables;
