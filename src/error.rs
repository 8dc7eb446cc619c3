//! # Error Types
//!
//! This module defines error types used throughout the roundel library.
//!
//! | Variant | Raised by |
//! |---------|-----------|
//! | `ImageLoad` | decoding an upload, a data URL or a file |
//! | `Encoding` | raster to PNG / data URL conversion |
//! | `ProxyFetch` | the image relay (non-OK upstream or network failure) |
//! | `Capture` | rendering the capture region into a snapshot |
//! | `DocumentWrite` | PDF assembly or saving the artifact |

use thiserror::Error;

/// Main error type for roundel operations
#[derive(Debug, Error)]
pub enum RoundelError {
    /// Image could not be read or decoded
    #[error("Image load error: {0}")]
    ImageLoad(String),

    /// Raster could not be encoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Remote fetch through the relay failed
    #[error("Proxy fetch error: {0}")]
    ProxyFetch(String),

    /// Snapshot rendering failed
    #[error("Capture error: {0}")]
    Capture(String),

    /// PDF assembly or save failed
    #[error("Document write error: {0}")]
    DocumentWrite(String),

    /// Invalid crop region, blur level, color or similar input
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// An optional capability is not available on this host
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
