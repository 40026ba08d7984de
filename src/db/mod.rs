use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Collection, LibraryItem, TitleKind},
};

pub mod postgres;

pub use postgres::{create_pool, PgStore};

/// Read-only access to the user's tracked titles
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LibrarySource: Send + Sync {
    async fn library_items(&self, kind: TitleKind) -> AppResult<Vec<LibraryItem>>;
}

/// Read-only access to named themed collections
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CollectionSource: Send + Sync {
    /// `None` when no collection has this id
    async fn collection(&self, id: Uuid) -> AppResult<Option<Collection>>;
}
