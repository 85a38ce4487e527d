//! API error type and its HTTP response mapping (spec §7 "failure
//! signalling"): `NotFound` and `BadRequest` are the only two response-level
//! failure classes the spec calls out; everything else the interpreter
//! itself already turns into a 200 with `status: "error"` embedded in the
//! body, so `Internal` below is reserved for genuine infrastructure faults
//! (a ledger write failing) rather than workflow-level ones.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl From<engine::EngineError> for ApiError {
    fn from(e: engine::EngineError) -> Self {
        match e {
            engine::EngineError::ExecutionNotFound(id) => ApiError::NotFound(format!("execution '{id}' not found")),
            engine::EngineError::NotPaused(id, status) => {
                ApiError::BadRequest(format!("execution '{id}' is not paused (status={status})"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<db::DbError> for ApiError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound => ApiError::NotFound("not found".into()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if let ApiError::Internal(msg) = &self {
            tracing::error!(error = %msg, "internal API error");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
