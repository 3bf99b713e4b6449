use std::convert::Infallible;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{DateTime, SubsecRound, TimeZone, Utc};

/// Header carrying an epoch-millisecond override of the request time.
pub const TEST_NOW_HEADER: &str = "x-test-now-ms";

/// Source of the current time for lifecycle decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// Wall clock only.
    System,
    /// Wall clock, unless the request carries [`TEST_NOW_HEADER`].
    Overridable,
}

impl Clock {
    pub fn new(test_mode: bool) -> Self {
        if test_mode {
            Clock::Overridable
        } else {
            Clock::System
        }
    }

    /// Resolve the effective time for a request, at millisecond precision.
    pub fn now(self, headers: &HeaderMap) -> DateTime<Utc> {
        let overridden = match self {
            Clock::System => None,
            Clock::Overridable => header_time(headers),
        };
        overridden.unwrap_or_else(|| Utc::now().trunc_subsecs(3))
    }
}

fn header_time(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let value = headers.get(TEST_NOW_HEADER)?.to_str().ok()?;
    let millis = leading_integer(value)?;
    Utc.timestamp_millis_opt(millis).single()
}

/// The integer at the start of `value`, ignoring whatever follows the digits.
fn leading_integer(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let sign_len = usize::from(value.starts_with(['-', '+']));
    let digits_len = value[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    value[..sign_len + digits_len].parse().ok()
}

/// The time a request is evaluated at, resolved once by the [`Clock`] in state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTime(pub DateTime<Utc>);

#[async_trait]
impl<S> FromRequestParts<S> for RequestTime
where
    Clock: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestTime(Clock::from_ref(state).now(&parts.headers)))
    }
}
