//! Paste lifecycle rules.
//!
//! Everything here is pure: callers pass the record and the effective time of
//! the request, and get back a decision. Persisting the outcome is up to the
//! caller.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::models::Paste;

/// Rejected paste creation input. The messages are returned to clients as-is.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Content is required and must be a string")]
    MissingContent,
    #[error("Content cannot be empty")]
    EmptyContent,
    #[error("TTL must be a positive number (seconds)")]
    InvalidTtl,
    #[error("max_views must be a positive integer")]
    InvalidMaxViews,
}

/// Whether a paste may be served at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Expired,
    Exhausted,
}

impl Visibility {
    pub fn is_visible(self) -> bool {
        self == Visibility::Visible
    }
}

/// Permission to serve one view, carrying the counter value to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewGrant {
    pub view_count: i64,
}

/// Validated input for a new paste.
#[derive(Debug, Clone, PartialEq)]
pub struct PasteDraft {
    pub content: String,
    pub ttl: Option<Duration>,
    pub max_views: Option<i64>,
}

impl PasteDraft {
    /// Turn the draft into a record created at `now`.
    ///
    /// Fails with [`ValidationError::InvalidTtl`] when the expiry would not be
    /// a representable timestamp.
    pub fn into_paste(self, id: String, now: DateTime<Utc>) -> Result<Paste, ValidationError> {
        let expires_at = match self.ttl {
            Some(ttl) => Some(
                now.checked_add_signed(ttl)
                    .ok_or(ValidationError::InvalidTtl)?,
            ),
            None => None,
        };

        Ok(Paste {
            id,
            content: self.content,
            max_views: self.max_views,
            view_count: 0,
            expires_at,
            created_at: now,
        })
    }
}

pub fn check_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    Ok(())
}

/// Convert a TTL in (possibly fractional) seconds to a duration, truncated to
/// whole milliseconds.
pub fn ttl_from_secs(secs: f64) -> Result<Duration, ValidationError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ValidationError::InvalidTtl);
    }

    let millis = (secs * 1000.0).trunc();
    if millis >= i64::MAX as f64 {
        return Err(ValidationError::InvalidTtl);
    }

    Ok(Duration::milliseconds(millis as i64))
}

pub fn check_max_views(max_views: i64) -> Result<i64, ValidationError> {
    if max_views <= 0 {
        return Err(ValidationError::InvalidMaxViews);
    }
    Ok(max_views)
}

/// The expiry instant itself already counts as expired.
pub fn is_expired(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.map_or(false, |expires_at| now >= expires_at)
}

/// `view_count` is the count before the current view.
pub fn is_exhausted(max_views: Option<i64>, view_count: i64) -> bool {
    max_views.map_or(false, |max_views| view_count >= max_views)
}

pub fn visibility(paste: &Paste, now: DateTime<Utc>) -> Visibility {
    if is_expired(paste.expires_at, now) {
        Visibility::Expired
    } else if is_exhausted(paste.max_views, paste.view_count) {
        Visibility::Exhausted
    } else {
        Visibility::Visible
    }
}

/// Decide whether a view at `now` is served and what the counter becomes.
pub fn admit(paste: &Paste, now: DateTime<Utc>) -> Option<ViewGrant> {
    visibility(paste, now).is_visible().then(|| ViewGrant {
        view_count: paste.view_count.saturating_add(1),
    })
}

/// Views left after the ones already counted; `None` when unlimited.
pub fn remaining_views(max_views: Option<i64>, view_count: i64) -> Option<i64> {
    max_views.map(|max_views| max_views.saturating_sub(view_count).max(0))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    fn draft(ttl: Option<Duration>, max_views: Option<i64>) -> PasteDraft {
        PasteDraft {
            content: "hello".into(),
            ttl,
            max_views,
        }
    }

    fn view(paste: &mut Paste, now: DateTime<Utc>) -> Option<i64> {
        let grant = admit(paste, now)?;
        paste.view_count = grant.view_count;
        Some(remaining_views(paste.max_views, paste.view_count).unwrap_or(-1))
    }

    #[test]
    fn new_paste_starts_unviewed() {
        let paste = draft(None, None).into_paste("abc".into(), t0()).unwrap();

        assert_eq!(paste.view_count, 0);
        assert_eq!(paste.created_at, t0());
        assert_eq!(paste.expires_at, None);
        assert_eq!(admit(&paste, t0()), Some(ViewGrant { view_count: 1 }));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let paste = draft(Some(Duration::seconds(60)), None)
            .into_paste("abc".into(), t0())
            .unwrap();

        let just_before = t0() + Duration::milliseconds(59_999);
        let at_expiry = t0() + Duration::seconds(60);

        assert_eq!(visibility(&paste, just_before), Visibility::Visible);
        assert_eq!(visibility(&paste, at_expiry), Visibility::Expired);
        assert_eq!(admit(&paste, at_expiry), None);
    }

    #[test]
    fn max_views_allows_exactly_n_views() {
        let mut paste = draft(None, Some(3)).into_paste("abc".into(), t0()).unwrap();

        assert_eq!(view(&mut paste, t0()), Some(2));
        assert_eq!(view(&mut paste, t0()), Some(1));
        assert_eq!(view(&mut paste, t0()), Some(0));
        assert_eq!(view(&mut paste, t0()), None);
        assert_eq!(visibility(&paste, t0()), Visibility::Exhausted);
        assert_eq!(paste.view_count, 3);
    }

    #[test]
    fn expiry_is_reported_before_exhaustion() {
        let mut paste = draft(Some(Duration::seconds(1)), Some(1))
            .into_paste("abc".into(), t0())
            .unwrap();
        paste.view_count = 1;

        assert_eq!(
            visibility(&paste, t0() + Duration::seconds(1)),
            Visibility::Expired
        );
    }

    #[test]
    fn remaining_views_never_goes_negative() {
        // concurrent relaxed views can push the counter past the limit
        assert_eq!(remaining_views(Some(2), 5), Some(0));
        assert_eq!(remaining_views(None, 5), None);
    }

    #[test]
    fn blank_content_is_rejected() {
        assert_eq!(check_content(""), Err(ValidationError::EmptyContent));
        assert_eq!(check_content("  \n\t "), Err(ValidationError::EmptyContent));
        assert_eq!(check_content(" x "), Ok(()));
    }

    #[test]
    fn ttl_must_be_positive() {
        assert_eq!(ttl_from_secs(0.0), Err(ValidationError::InvalidTtl));
        assert_eq!(ttl_from_secs(-5.0), Err(ValidationError::InvalidTtl));
        assert_eq!(ttl_from_secs(1.5), Ok(Duration::milliseconds(1500)));
        assert_eq!(ttl_from_secs(0.0015), Ok(Duration::milliseconds(1)));
    }

    #[test]
    fn unrepresentable_expiry_is_a_ttl_error() {
        let ttl = ttl_from_secs(1e15).unwrap();

        assert_eq!(
            draft(Some(ttl), None).into_paste("abc".into(), t0()),
            Err(ValidationError::InvalidTtl)
        );
    }

    #[test]
    fn max_views_must_be_positive() {
        assert_eq!(check_max_views(0), Err(ValidationError::InvalidMaxViews));
        assert_eq!(check_max_views(-1), Err(ValidationError::InvalidMaxViews));
        assert_eq!(check_max_views(1), Ok(1));
    }
}
