//! Server state and configuration.

use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::RoundelError;
use crate::export::ExportCompositor;
use crate::pipeline::Pipeline;
use crate::relay::{ImageRelay, RelayConfig};
use crate::render::blur::BlurBaker;

/// Idle time after which a logo session is dropped.
pub const SESSION_EXPIRATION_SECS: u64 = 30 * 60;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// HTTP client settings for the image relay
    pub relay: RelayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            relay: RelayConfig::default(),
        }
    }
}

/// One user's logo in progress.
pub struct LogoSession {
    pub pipeline: Pipeline,
    pub last_accessed: Instant,
}

impl LogoSession {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            last_accessed: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub relay: ImageRelay,
    pub compositor: ExportCompositor,
    pub sessions: RwLock<HashMap<Uuid, LogoSession>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self, RoundelError> {
        let relay = ImageRelay::new(config.relay.clone())?;
        let compositor = ExportCompositor::new(std::sync::Arc::new(relay.clone()), BlurBaker::default());
        Ok(Self {
            config,
            relay,
            compositor,
            sessions: RwLock::new(HashMap::new()),
        })
    }
}
