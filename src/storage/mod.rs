use anyhow::Context;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::{self, StoreKind};
use crate::models::Paste;

pub mod memory;
pub mod sql;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("database error")]
    Database {
        #[from]
        source: sqlx::Error,
    },
    #[error("paste '{id}' not found")]
    NotFound { id: String },
    #[error("paste '{id}' already exists")]
    Duplicate { id: String },
    #[error("paste '{id}' has a timestamp out of range")]
    InvalidTimestamp { id: String },
}

/// A table of paste records keyed by id.
///
/// Updates are not guarded against concurrent writers unless stated.
pub trait PasteStore {
    /// Cheap round trip to check the store is reachable.
    async fn probe(&self) -> StoreResult<()>;

    /// Look up a paste by id.
    async fn get_paste(&self, id: &str) -> StoreResult<Option<Paste>>;

    /// Insert a new paste.
    async fn insert_paste(&self, paste: &Paste) -> StoreResult<()>;

    /// Overwrite the view counter and return the updated record.
    async fn set_view_count(&self, id: &str, view_count: i64) -> StoreResult<Paste>;

    /// Atomically count one view if the paste is still visible at `now`.
    ///
    /// Returns `None` when the paste is missing, expired or exhausted.
    async fn increment_view_count(&self, id: &str, now: DateTime<Utc>)
        -> StoreResult<Option<Paste>>;
}

#[derive(Clone)]
pub enum AnyStore {
    Sql(sql::SqlStore),
    Memory(memory::MemoryStore),
}

impl AnyStore {
    /// Open the store described by the configuration.
    pub async fn open(config: &config::Store) -> anyhow::Result<Self> {
        let store: AnyStore = match config.kind {
            StoreKind::Sql => sql::SqlStore::connect(&config.url, config.max_connections)
                .await
                .context("failed to connect to database")?
                .into(),
            StoreKind::Memory => memory::MemoryStore::default().into(),
        };
        Ok(store)
    }

    /// Create the paste table if it does not exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        match self {
            AnyStore::Sql(sql) => sql.migrate().await,
            AnyStore::Memory(_) => Ok(()),
        }
    }

    pub async fn close(&self) {
        if let AnyStore::Sql(sql) = self {
            sql.close().await;
        }
    }
}

impl PasteStore for AnyStore {
    async fn probe(&self) -> StoreResult<()> {
        match self {
            AnyStore::Sql(sql) => sql.probe().await,
            AnyStore::Memory(memory) => memory.probe().await,
        }
    }

    async fn get_paste(&self, id: &str) -> StoreResult<Option<Paste>> {
        match self {
            AnyStore::Sql(sql) => sql.get_paste(id).await,
            AnyStore::Memory(memory) => memory.get_paste(id).await,
        }
    }

    async fn insert_paste(&self, paste: &Paste) -> StoreResult<()> {
        match self {
            AnyStore::Sql(sql) => sql.insert_paste(paste).await,
            AnyStore::Memory(memory) => memory.insert_paste(paste).await,
        }
    }

    async fn set_view_count(&self, id: &str, view_count: i64) -> StoreResult<Paste> {
        match self {
            AnyStore::Sql(sql) => sql.set_view_count(id, view_count).await,
            AnyStore::Memory(memory) => memory.set_view_count(id, view_count).await,
        }
    }

    async fn increment_view_count(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Paste>> {
        match self {
            AnyStore::Sql(sql) => sql.increment_view_count(id, now).await,
            AnyStore::Memory(memory) => memory.increment_view_count(id, now).await,
        }
    }
}

impl From<sql::SqlStore> for AnyStore {
    fn from(value: sql::SqlStore) -> Self {
        AnyStore::Sql(value)
    }
}

impl From<memory::MemoryStore> for AnyStore {
    fn from(value: memory::MemoryStore) -> Self {
        AnyStore::Memory(value)
    }
}
