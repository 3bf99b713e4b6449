use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::ViewCounting;
use crate::error::{ApiError, ApiResult};
use crate::ids::generate_id;
use crate::lifecycle::{self, PasteDraft};
use crate::models::Paste;
use crate::storage::PasteStore;
use crate::types::api::PasteView;
use crate::App;

pub async fn create(app: &App, draft: PasteDraft, now: DateTime<Utc>) -> ApiResult<Paste> {
    let paste = draft.into_paste(generate_id(), now)?;

    info!(
        "new paste: id='{id}', size={size}, max_views={max_views:?}, expires_at={expires_at:?}",
        id = paste.id,
        size = paste.content.len(),
        max_views = paste.max_views,
        expires_at = paste.expires_at,
    );

    app.store
        .insert_paste(&paste)
        .await
        .map_err(|source| ApiError::Create { source })?;

    Ok(paste)
}

/// Serve one view of a paste at `now`, counting it.
///
/// Shared by the JSON endpoint and the rendered page.
pub async fn view(app: &App, id: &str, now: DateTime<Utc>) -> ApiResult<PasteView> {
    let paste = app
        .store
        .get_paste(id)
        .await
        .map_err(|source| ApiError::Fetch { source })?
        .ok_or(ApiError::NotFound)?;

    let Some(grant) = lifecycle::admit(&paste, now) else {
        debug!(
            "paste gone: id='{id}', state={:?}",
            lifecycle::visibility(&paste, now)
        );
        return Err(ApiError::NotFound);
    };

    let viewed = match app.config.view_counting {
        ViewCounting::Relaxed => app
            .store
            .set_view_count(id, grant.view_count)
            .await
            .map_err(|source| ApiError::Update { source })?,
        ViewCounting::Strict => app
            .store
            .increment_view_count(id, now)
            .await
            .map_err(|source| ApiError::Update { source })?
            .ok_or(ApiError::NotFound)?,
    };

    Ok(viewed.into())
}

/// Whether the store answers a trivial query.
pub async fn is_healthy(app: &App) -> bool {
    match app.store.probe().await {
        Ok(()) => true,
        Err(err) => {
            warn!(error = ?err, "health probe failed");
            false
        }
    }
}
