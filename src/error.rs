use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// User-facing error messages.
pub mod msg {
    pub const MISSING_SESSION_OR_GOAL_DATA: &str = "Missing sessionId or goalData";
    pub const GOAL_COMPLETION_FAILED: &str = "Failed to complete goal creation";
    pub const GOAL_NOT_FOUND: &str = "Goal not found";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Payment provider error: {0}")]
    Payment(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

/// Only a missing field is reported to the caller; every other failure is
/// logged here and answered with the same generic message.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            e => {
                tracing::error!("Error completing goal creation: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, msg::GOAL_COMPLETION_FAILED)
            }
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
