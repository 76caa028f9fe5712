//! The `{statusCode, message, error}` error envelope used across every
//! handler (spec §6).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Conflict(String),
    BadRequest(String),
    Forbidden(String),
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "Not Found", msg.as_str()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", msg.as_str()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad Request", msg.as_str()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "Forbidden", msg.as_str()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", msg.as_str()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    #[serde(rename = "statusCode")]
    status_code: u16,
    message: String,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = self.parts();
        let body = ErrorBody {
            status_code: status.as_u16(),
            message: message.to_string(),
            error: error.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<db::DbError> for ApiError {
    fn from(err: db::DbError) -> Self {
        match err {
            db::DbError::NotFound => Self::NotFound("resource not found".into()),
            db::DbError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<engine::EngineError> for ApiError {
    fn from(err: engine::EngineError) -> Self {
        match err {
            engine::EngineError::Database(db_err) => db_err.into(),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<queue::QueueError> for ApiError {
    fn from(err: queue::QueueError) -> Self {
        match err {
            queue::QueueError::Database(db_err) => db_err.into(),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
