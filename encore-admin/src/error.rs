//! API error responses
//!
//! Every handler error maps to an HTTP status and a JSON `{"error": ...}`
//! body: 400 for invalid input, 401 for missing or expired credentials,
//! 404 for missing resources, 409 for uniqueness conflicts and deleting a
//! file that is still referenced, 500 for everything unexpected.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Handler result type
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// API error with its HTTP mapping
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Unexpected failures get logged with detail; the client sees a
        // generic message
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Internal error: {}", self.message());
            "Internal server error".to_string()
        } else {
            self.message().to_string()
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

impl From<encore_common::Error> for ApiError {
    fn from(err: encore_common::Error) -> Self {
        use encore_common::Error;

        match err {
            Error::Database(db_err) => db_error(db_err),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Duplicate(msg) => ApiError::Conflict(msg),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<mongodb::error::Error> for ApiError {
    fn from(err: mongodb::error::Error) -> Self {
        db_error(err)
    }
}

impl From<crate::media::MediaError> for ApiError {
    fn from(err: crate::media::MediaError) -> Self {
        use crate::media::MediaError;

        match err {
            // The host rejected the asset itself (bad format, too large)
            MediaError::Api(status, msg) if (400..500).contains(&status) => {
                ApiError::BadRequest(format!("Media host rejected request: {}", msg))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

fn db_error(err: mongodb::error::Error) -> ApiError {
    if encore_common::db::is_duplicate_key(&err) {
        ApiError::Conflict("Value already taken for a unique field".to_string())
    } else {
        ApiError::Internal(format!("Database error: {}", err))
    }
}
