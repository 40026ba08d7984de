use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

use super::{CollectionSource, LibrarySource};
use crate::{
    error::{AppError, AppResult},
    models::{Collection, CollectionEntry, LibraryItem, TitleId, TitleKind, UserRating},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

#[derive(Debug, FromRow)]
struct LibraryRow {
    title_id: i64,
    kind: String,
    added_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    user_rating: Option<String>,
    is_completed: bool,
}

#[derive(Debug, FromRow)]
struct CollectionRow {
    id: Uuid,
    name: String,
}

#[derive(Debug, FromRow)]
struct EntryRow {
    title_id: i64,
    kind: String,
    added_at: DateTime<Utc>,
}

fn title_id(raw: i64) -> AppResult<TitleId> {
    u64::try_from(raw)
        .map(TitleId)
        .map_err(|_| AppError::Internal(format!("Stored title id out of range: {}", raw)))
}

/// Stored values are constrained by the schema, so a parse failure is corruption
fn stored<T: std::str::FromStr<Err = AppError>>(raw: &str) -> AppResult<T> {
    raw.parse()
        .map_err(|e: AppError| AppError::Internal(format!("Corrupt stored value: {}", e)))
}

impl TryFrom<LibraryRow> for LibraryItem {
    type Error = AppError;

    fn try_from(row: LibraryRow) -> AppResult<Self> {
        Ok(LibraryItem {
            id: title_id(row.title_id)?,
            kind: stored(&row.kind)?,
            added_at: row.added_at,
            completed_at: row.completed_at,
            user_rating: row
                .user_rating
                .as_deref()
                .map(stored::<UserRating>)
                .transpose()?,
            is_completed: row.is_completed,
        })
    }
}

impl TryFrom<EntryRow> for CollectionEntry {
    type Error = AppError;

    fn try_from(row: EntryRow) -> AppResult<Self> {
        Ok(CollectionEntry {
            id: title_id(row.title_id)?,
            kind: stored(&row.kind)?,
            added_at: row.added_at,
        })
    }
}

/// Item store backed by PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LibrarySource for PgStore {
    async fn library_items(&self, kind: TitleKind) -> AppResult<Vec<LibraryItem>> {
        let rows: Vec<LibraryRow> = sqlx::query_as(
            r#"
            SELECT title_id, kind, added_at, completed_at, user_rating, is_completed
            FROM library_items
            WHERE kind = $1
            ORDER BY added_at DESC
            "#,
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(kind = %kind, rows = rows.len(), "Loaded library items");

        rows.into_iter().map(LibraryItem::try_from).collect()
    }
}

#[async_trait]
impl CollectionSource for PgStore {
    async fn collection(&self, id: Uuid) -> AppResult<Option<Collection>> {
        let Some(header): Option<CollectionRow> =
            sqlx::query_as("SELECT id, name FROM collections WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
        else {
            return Ok(None);
        };

        let rows: Vec<EntryRow> = sqlx::query_as(
            r#"
            SELECT title_id, kind, added_at
            FROM collection_entries
            WHERE collection_id = $1
            ORDER BY added_at DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .into_iter()
            .map(CollectionEntry::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Some(Collection {
            id: header.id,
            name: header.name,
            entries,
        }))
    }
}
