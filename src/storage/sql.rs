use chrono::{DateTime, TimeZone, Utc};
use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, FromRow};

use super::{PasteStore, StoreError, StoreResult};
use crate::models::Paste;

/// Timestamps are epoch milliseconds so the schema is the same on every backend.
const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS pastes (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    max_views BIGINT,
    view_count BIGINT NOT NULL DEFAULT 0,
    expires_at BIGINT,
    created_at BIGINT NOT NULL
)";

const COLUMNS: &str = "id, content, max_views, view_count, expires_at, created_at";

#[derive(FromRow)]
struct PasteRow {
    id: String,
    content: String,
    max_views: Option<i64>,
    view_count: i64,
    expires_at: Option<i64>,
    created_at: i64,
}

impl TryFrom<PasteRow> for Paste {
    type Error = StoreError;

    fn try_from(row: PasteRow) -> StoreResult<Self> {
        let invalid = || StoreError::InvalidTimestamp { id: row.id.clone() };

        let created_at = from_millis(row.created_at).ok_or_else(invalid)?;
        let expires_at = match row.expires_at {
            Some(millis) => Some(from_millis(millis).ok_or_else(invalid)?),
            None => None,
        };

        Ok(Paste {
            id: row.id,
            content: row.content,
            max_views: row.max_views,
            view_count: row.view_count,
            expires_at,
            created_at,
        })
    }
}

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Paste table in a SQL database reachable through `sqlx`.
#[derive(Clone)]
pub struct SqlStore {
    pool: AnyPool,
}

impl SqlStore {
    /// Connect to a database by URL.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Create the paste table if needed.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl PasteStore for SqlStore {
    async fn probe(&self) -> StoreResult<()> {
        sqlx::query("SELECT id FROM pastes LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_paste(&self, id: &str) -> StoreResult<Option<Paste>> {
        let row = sqlx::query_as::<_, PasteRow>(&format!(
            "SELECT {COLUMNS} FROM pastes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Paste::try_from).transpose()
    }

    async fn insert_paste(&self, paste: &Paste) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO pastes (id, content, max_views, view_count, expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(paste.id.as_str())
        .bind(paste.content.as_str())
        .bind(paste.max_views)
        .bind(paste.view_count)
        .bind(paste.expires_at.map(|t| t.timestamp_millis()))
        .bind(paste.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_view_count(&self, id: &str, view_count: i64) -> StoreResult<Paste> {
        let row = sqlx::query_as::<_, PasteRow>(&format!(
            "UPDATE pastes SET view_count = $1 WHERE id = $2 RETURNING {COLUMNS}"
        ))
        .bind(view_count)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound { id: id.to_owned() })?;
        row.try_into()
    }

    async fn increment_view_count(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Paste>> {
        // same visibility rules as `lifecycle::visibility`, evaluated by the
        // database so the check and the increment cannot interleave
        let row = sqlx::query_as::<_, PasteRow>(&format!(
            "UPDATE pastes SET view_count = view_count + 1 \
             WHERE id = $1 \
             AND (max_views IS NULL OR view_count < max_views) \
             AND (expires_at IS NULL OR expires_at > $2) \
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(now.timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Paste::try_from).transpose()
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use chrono::Duration;

    use super::*;

    async fn store() -> SqlStore {
        // a single connection keeps every query on the same in-memory database
        let store = SqlStore::connect("sqlite::memory:", 1).await.unwrap();
        store.migrate().await.unwrap();
        store
    }

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    fn paste(id: &str, max_views: Option<i64>, expires_at: Option<DateTime<Utc>>) -> Paste {
        Paste {
            id: id.into(),
            content: "line one\nline two".into(),
            max_views,
            view_count: 0,
            expires_at,
            created_at: t0(),
        }
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let store = store().await;
        store.migrate().await.unwrap();
        store.probe().await.unwrap();
    }

    #[tokio::test]
    async fn round_trips_a_paste() {
        let store = store().await;
        let expires_at = t0() + Duration::milliseconds(60_123);
        let original = paste("abc", Some(3), Some(expires_at));
        store.insert_paste(&original).await.unwrap();

        let fetched = store.get_paste("abc").await.unwrap();
        assert_eq!(fetched, Some(original));
        assert_eq!(store.get_paste("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_database_error() {
        let store = store().await;
        store.insert_paste(&paste("abc", None, None)).await.unwrap();

        let err = store
            .insert_paste(&paste("abc", None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Database { .. }));
    }

    #[tokio::test]
    async fn set_view_count_returns_the_snapshot() {
        let store = store().await;
        store.insert_paste(&paste("abc", Some(1), None)).await.unwrap();

        let updated = store.set_view_count("abc", 1).await.unwrap();
        assert_eq!(updated.view_count, 1);
        assert_eq!(updated.max_views, Some(1));

        let err = store.set_view_count("nope", 1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn conditional_increment_honours_limits() {
        let store = store().await;
        let expires_at = t0() + Duration::seconds(60);
        store
            .insert_paste(&paste("limited", Some(1), None))
            .await
            .unwrap();
        store
            .insert_paste(&paste("timed", None, Some(expires_at)))
            .await
            .unwrap();

        let first = store.increment_view_count("limited", t0()).await.unwrap();
        assert_eq!(first.map(|p| p.view_count), Some(1));
        assert_eq!(
            store.increment_view_count("limited", t0()).await.unwrap(),
            None
        );

        let before = expires_at - Duration::milliseconds(1);
        assert!(store
            .increment_view_count("timed", before)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .increment_view_count("timed", expires_at)
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.increment_view_count("nope", t0()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn probe_fails_once_closed() {
        let store = store().await;
        store.close().await;

        assert!(store.probe().await.is_err());
    }
}
