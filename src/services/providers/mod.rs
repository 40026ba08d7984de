//! Title data provider abstraction
//!
//! The engine only talks to these traits, so the concrete data source (TMDB today)
//! can be swapped or faked in tests. Implementations must be cheap to share behind
//! an `Arc` because each seed is fetched on its own task.
use crate::{
    error::AppResult,
    models::{Candidate, TitleId, TitleKind},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Source of "more like this" titles for a single seed
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RelatedItemsProvider: Send + Sync {
    /// Fetch titles related to `id`
    ///
    /// Returned candidates are of the same kind as the seed.
    async fn fetch_related(&self, id: TitleId, kind: TitleKind) -> AppResult<Vec<Candidate>>;
}

/// Free-text title search, used when no seeds are available
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TextSearchProvider: Send + Sync {
    async fn search(&self, query: &str, kind: TitleKind) -> AppResult<Vec<Candidate>>;
}
