//! # HTTP Server for Logo Editing and Export
//!
//! Exposes the image relay and the logo pipeline over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! roundel serve --listen 0.0.0.0:8080
//! ```
//!
//! ## Routes
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /api/imageProxy?url=` | Relay a remote image with `Access-Control-Allow-Origin: *` |
//! | `POST /api/logo/upload` | Upload a photo (multipart field `image`) |
//! | `POST /api/logo/:id/crop` | Crop and derive the border color |
//! | `GET /api/logo/:id/cropped` | Cropped PNG |
//! | `PUT /api/logo/:id/color` | Manual color (`{"hex"}`) or eyedropper (`{"x","y"}`) |
//! | `GET /api/logo/:id/preview` | Print snapshot PNG |
//! | `POST /api/logo/:id/export` | Download `PrintCopy.pdf` |

mod handlers;
mod state;

pub use state::{AppState, LogoSession, SESSION_EXPIRATION_SECS, ServerConfig};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::RoundelError;
use crate::relay::RELAY_PATH;

/// Build the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Image relay
        .route(RELAY_PATH, get(handlers::proxy::image_proxy))
        // Logo API (50MB limit for uploads)
        .route(
            "/api/logo/upload",
            post(handlers::logo::upload).layer(DefaultBodyLimit::max(50 * 1024 * 1024)),
        )
        .route("/api/logo/:id/crop", post(handlers::logo::crop))
        .route("/api/logo/:id/cropped", get(handlers::logo::cropped))
        .route("/api/logo/:id/color", put(handlers::logo::color))
        .route("/api/logo/:id/preview", get(handlers::logo::preview))
        .route("/api/logo/:id/export", post(handlers::logo::export))
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use roundel::server::{serve, ServerConfig};
///
/// # async fn example() -> Result<(), roundel::error::RoundelError> {
/// let config = ServerConfig {
///     listen_addr: "0.0.0.0:8080".to_string(),
///     ..Default::default()
/// };
///
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), RoundelError> {
    let app_state = Arc::new(AppState::new(config.clone())?);

    // Spawn background session cleanup task
    tokio::spawn(cleanup_sessions(app_state.clone()));

    let app = router(app_state);

    log::info!("roundel HTTP server listening on {}", config.listen_addr);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| RoundelError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to bind to {}: {}", config.listen_addr, e),
        )))?;

    axum::serve(listener, app).await?;

    Ok(())
}

/// Background task to drop idle logo sessions.
async fn cleanup_sessions(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    let expiration = Duration::from_secs(SESSION_EXPIRATION_SECS);

    loop {
        interval.tick().await;
        let now = Instant::now();

        let mut sessions = state.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, v| now.duration_since(v.last_accessed) < expiration);
        let after = sessions.len();
        if before != after {
            log::info!(
                "cleaned up {} expired logo sessions ({} remaining)",
                before - after,
                after
            );
        }
    }
}
