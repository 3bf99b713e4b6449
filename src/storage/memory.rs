use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{PasteStore, StoreError, StoreResult};
use crate::lifecycle;
use crate::models::Paste;

/// Process-local store, lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pastes: Arc<RwLock<HashMap<String, Paste>>>,
}

impl PasteStore for MemoryStore {
    async fn probe(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn get_paste(&self, id: &str) -> StoreResult<Option<Paste>> {
        Ok(self.pastes.read().await.get(id).cloned())
    }

    async fn insert_paste(&self, paste: &Paste) -> StoreResult<()> {
        let mut pastes = self.pastes.write().await;
        if pastes.contains_key(&paste.id) {
            return Err(StoreError::Duplicate {
                id: paste.id.clone(),
            });
        }
        pastes.insert(paste.id.clone(), paste.clone());
        Ok(())
    }

    async fn set_view_count(&self, id: &str, view_count: i64) -> StoreResult<Paste> {
        let mut pastes = self.pastes.write().await;
        let paste = pastes
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_owned() })?;
        paste.view_count = view_count;
        Ok(paste.clone())
    }

    async fn increment_view_count(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Paste>> {
        let mut pastes = self.pastes.write().await;
        let Some(paste) = pastes.get_mut(id) else { return Ok(None) };
        let Some(grant) = lifecycle::admit(paste, now) else { return Ok(None) };
        paste.view_count = grant.view_count;
        Ok(Some(paste.clone()))
    }
}
