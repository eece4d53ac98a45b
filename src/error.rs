use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use std::time::Duration;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ShortenerError {
    #[error("no record for the requested key")]
    NotFound,

    #[error("url is deleted")]
    Gone,

    #[error("conflict on insert")]
    Conflict,

    #[error("invalid or unrecognized identity token")]
    InvalidToken,

    #[error("identity must be exactly {expected} bytes, got {actual}")]
    InvalidIdentity { expected: usize, actual: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("URL contains control characters")]
    UrlControlChars,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("caller identity was not established for this request")]
    MissingIdentity,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failures of the backing store. Never retried here.
#[derive(Debug, ThisError)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] SqlxError),

    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),
}

impl From<SqlxError> for ShortenerError {
    fn from(e: SqlxError) -> Self {
        ShortenerError::Storage(StorageError::Database(e))
    }
}

impl ShortenerError {
    /// Stable machine-readable code used in the JSON error body.
    pub fn code(&self) -> &'static str {
        match self {
            ShortenerError::NotFound => "NOT_FOUND",
            ShortenerError::Gone => "GONE",
            ShortenerError::Conflict => "CONFLICT",
            ShortenerError::InvalidToken | ShortenerError::InvalidIdentity { .. } => {
                "UNAUTHORIZED"
            }
            ShortenerError::UrlParse(_)
            | ShortenerError::UrlControlChars
            | ShortenerError::Json(_) => "BAD_REQUEST",
            ShortenerError::Config(_) => "CONFIG_ERROR",
            ShortenerError::Storage(_)
            | ShortenerError::RactorError(_)
            | ShortenerError::MissingIdentity => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ShortenerError::NotFound => StatusCode::NOT_FOUND,
            ShortenerError::Gone => StatusCode::GONE,
            ShortenerError::Conflict => StatusCode::CONFLICT,
            ShortenerError::InvalidToken | ShortenerError::InvalidIdentity { .. } => {
                StatusCode::UNAUTHORIZED
            }
            ShortenerError::UrlParse(_)
            | ShortenerError::UrlControlChars
            | ShortenerError::Json(_) => StatusCode::BAD_REQUEST,
            ShortenerError::Storage(_)
            | ShortenerError::RactorError(_)
            | ShortenerError::MissingIdentity
            | ShortenerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ShortenerError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            ShortenerError::Storage(_)
            | ShortenerError::RactorError(_)
            | ShortenerError::Config(_) => "An internal server error occurred.".to_string(),
            other => other.to_string(),
        };
        let body = ApiErrorBody {
            code: self.code().to_string(),
            message,
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn gone_and_not_found_map_to_distinct_statuses() {
        assert_eq!(ShortenerError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ShortenerError::Gone.status(), StatusCode::GONE);
        assert_eq!(ShortenerError::Conflict.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn timeout_is_a_storage_error() {
        let err: ShortenerError = StorageError::Timeout(Duration::from_secs(5)).into();
        assert!(matches!(err, ShortenerError::Storage(StorageError::Timeout(_))));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn config_errors_are_not_request_errors() {
        let err = ShortenerError::Config("bad key".to_string());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[tokio::test]
    async fn storage_errors_hide_details_in_body() {
        let err: ShortenerError = SqlxError::PoolTimedOut.into();
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = std::str::from_utf8(&body).unwrap();
        assert!(body.contains(r#""code":"INTERNAL_ERROR""#));
        assert!(!body.contains("pool"));
    }
}
