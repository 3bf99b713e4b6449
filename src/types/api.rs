use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::lifecycle::{self, PasteDraft, ValidationError};
use crate::models::Paste;

#[derive(Serialize)]
pub struct CreatedPaste {
    pub id: String,
    pub url: String,
}

/// A paste as served to a reader, after the view has been counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasteView {
    pub content: String,
    pub remaining_views: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Paste> for PasteView {
    fn from(paste: Paste) -> Self {
        PasteView {
            remaining_views: lifecycle::remaining_views(paste.max_views, paste.view_count),
            content: paste.content,
            expires_at: paste.expires_at,
        }
    }
}

#[derive(Serialize)]
pub struct Health {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Validate a `POST /pastes` body.
///
/// Fields are checked in order (content, ttl, max_views) and the first
/// problem wins. Only a missing key counts as absent; `null` is invalid.
pub fn parse_draft(body: &Value) -> Result<PasteDraft, ValidationError> {
    let content = body
        .get("content")
        .and_then(Value::as_str)
        .ok_or(ValidationError::MissingContent)?;
    lifecycle::check_content(content)?;

    let ttl = match body.get("ttl") {
        None => None,
        Some(ttl) => {
            let secs = ttl.as_f64().ok_or(ValidationError::InvalidTtl)?;
            Some(lifecycle::ttl_from_secs(secs)?)
        }
    };

    let max_views = match body.get("max_views") {
        None => None,
        Some(max_views) => Some(lifecycle::check_max_views(integer(max_views)?)?),
    };

    Ok(PasteDraft {
        content: content.to_owned(),
        ttl,
        max_views,
    })
}

/// Accept integral JSON numbers, including ones written as `2.0`.
fn integer(value: &Value) -> Result<i64, ValidationError> {
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    match value.as_f64() {
        Some(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Ok(n as i64),
        _ => Err(ValidationError::InvalidMaxViews),
    }
}
