use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("option is required")]
    MissingOption,

    #[error("unknown option")]
    UnknownOption,

    #[error("too many requests, try again shortly")]
    RateLimited,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MissingOption | AppError::UnknownOption => StatusCode::BAD_REQUEST,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Store { .. } | AppError::InternalError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Server-side causes stay in the logs.
        let message = if status.is_server_error() {
            error!("{self}");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
