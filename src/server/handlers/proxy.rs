//! Image relay endpoint.

use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::RoundelError;
use crate::relay::ImageFetcher;

use super::super::state::AppState;
use super::error_response;

/// Query parameters for the relay endpoint.
#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

/// GET /api/imageProxy?url=... - Re-serve a remote image with permissive CORS headers.
pub async fn image_proxy(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProxyQuery>,
) -> Response {
    let Some(url) = query.url.filter(|u| !u.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "Missing \"url\" query parameter.")
            .into_response();
    };

    match state.relay.fetch(&url).await {
        Ok(image) => (
            [
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*".to_string()),
                (header::ACCESS_CONTROL_ALLOW_METHODS, "GET".to_string()),
                (header::CONTENT_TYPE, image.content_type),
            ],
            image.bytes,
        )
            .into_response(),
        Err(e) => {
            let reason = match e {
                RoundelError::ProxyFetch(reason) => reason,
                other => other.to_string(),
            };
            log::error!("Proxy error for {}: {}", url, reason);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Proxy failed to fetch image: {}", reason),
            )
            .into_response()
        }
    }
}
