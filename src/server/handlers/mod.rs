//! HTTP handlers for the server.

pub mod logo;
pub mod proxy;

use axum::{Json, http::StatusCode};
use serde_json::{Value, json};

use crate::error::RoundelError;

/// Error response: status plus a JSON body with an `error` key.
pub type ApiError = (StatusCode, Json<Value>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

impl From<RoundelError> for (StatusCode, Json<Value>) {
    fn from(e: RoundelError) -> Self {
        let status = match &e {
            RoundelError::InvalidParameter(_) | RoundelError::ImageLoad(_) => StatusCode::BAD_REQUEST,
            RoundelError::Unsupported(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RoundelError::ProxyFetch(_) => StatusCode::BAD_GATEWAY,
            RoundelError::Encoding(_)
            | RoundelError::Capture(_)
            | RoundelError::DocumentWrite(_)
            | RoundelError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, e.to_string())
    }
}
