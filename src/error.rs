use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::lifecycle::ValidationError;
use crate::storage::StoreError;
use crate::types::api::ErrorBody;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Request failures. The display text is what clients see, so store errors
/// keep their detail in `source` only.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Missing, expired and exhausted pastes all look the same from outside.
    #[error("Paste not found")]
    NotFound,
    #[error("Invalid request")]
    MalformedRequest,
    #[error("Request body too large")]
    PayloadTooLarge,
    #[error("Failed to create paste")]
    Create { source: StoreError },
    #[error("Failed to fetch paste")]
    Fetch { source: StoreError },
    #[error("Failed to update paste")]
    Update { source: StoreError },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MalformedRequest => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Create { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Fetch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Update { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log the underlying store error, if any.
    pub fn log(&self) {
        if let ApiError::Create { source } | ApiError::Fetch { source } | ApiError::Update { source } =
            self
        {
            error!(error = ?source, "{}", self);
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
