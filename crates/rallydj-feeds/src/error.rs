use rallydj_core::ShapeError;
use rallydj_fetch::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("no categories requested")]
    NoCategories,
}
