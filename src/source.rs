//! # Image Sources
//!
//! Handles for images flowing through the pipeline.
//!
//! An [`ImageRef`] is the crate's equivalent of an image URL: it points at a
//! remote resource, carries the bytes inline as a `data:` URL, or names a
//! local file. Remote URLs must go through the [`relay`](crate::relay) before
//! their pixels can be read; everything else decodes locally.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::RoundelError;

/// Reference to an image, the "URL" handed between pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Remote http(s) resource
    Url(String),
    /// Inline `data:<mime>;base64,<payload>` URL
    DataUrl(String),
    /// Local file
    File(PathBuf),
}

impl ImageRef {
    /// Build a base64 data URL.
    pub fn data_url(mime: &str, bytes: &[u8]) -> Self {
        Self::DataUrl(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
    }

    /// Build a PNG data URL.
    pub fn png(bytes: &[u8]) -> Self {
        Self::data_url("image/png", bytes)
    }

    /// Classify a user supplied location (CLI argument, JSON field).
    pub fn from_location(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Url(location.to_string())
        } else if location.starts_with("data:") {
            Self::DataUrl(location.to_string())
        } else {
            Self::File(PathBuf::from(location))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Url(_))
    }

    /// Read the raw encoded bytes behind this reference.
    ///
    /// Remote URLs are rejected: their pixels are only readable once relayed.
    pub fn read_bytes(&self) -> Result<Vec<u8>, RoundelError> {
        match self {
            Self::Url(url) => Err(RoundelError::ImageLoad(format!(
                "Pixel data of {} is not readable; route it through the image relay first",
                url
            ))),
            Self::DataUrl(url) => decode_data_url(url).map(|(_, bytes)| bytes),
            Self::File(path) => std::fs::read(path).map_err(|e| {
                RoundelError::ImageLoad(format!("Failed to read {}: {}", path.display(), e))
            }),
        }
    }

    /// Read and decode the image.
    pub fn decode(&self) -> Result<DynamicImage, RoundelError> {
        let bytes = self.read_bytes()?;
        image::load_from_memory(&bytes)
            .map_err(|e| RoundelError::ImageLoad(format!("Failed to decode image: {}", e)))
    }

    /// Short description for log lines (data URLs are not printed in full).
    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::DataUrl(url) => {
                let header = url.split(',').next().unwrap_or("data:");
                format!("{},… ({} bytes)", header, url.len())
            }
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// Split a base64 data URL into its MIME type and payload.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>), RoundelError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| RoundelError::ImageLoad("Not a data URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| RoundelError::ImageLoad("Malformed data URL".to_string()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| RoundelError::ImageLoad("Only base64 data URLs are supported".to_string()))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| RoundelError::ImageLoad(format!("Invalid base64 payload: {}", e)))?;
    let mime = if mime.is_empty() {
        "application/octet-stream"
    } else {
        mime
    };
    Ok((mime.to_string(), bytes))
}

/// Encode a raster as PNG (alpha preserved).
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RoundelError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(RoundelError::Encoding("Canvas empty".to_string()));
    }
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| RoundelError::Encoding(format!("Failed to encode PNG: {}", e)))?;
    Ok(bytes)
}

/// A decoded source photo together with the reference it was loaded from.
///
/// Immutable once loaded; the bitmap is shared between stages.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub reference: ImageRef,
    pub bitmap: Arc<DynamicImage>,
}

impl SourceImage {
    pub fn new(reference: ImageRef, bitmap: DynamicImage) -> Self {
        Self {
            reference,
            bitmap: Arc::new(bitmap),
        }
    }

    /// Decode an upload. The reference becomes a data URL of the original bytes.
    pub fn from_bytes(bytes: &[u8], mime: &str) -> Result<Self, RoundelError> {
        let bitmap = image::load_from_memory(bytes)
            .map_err(|e| RoundelError::ImageLoad(format!("Failed to decode image: {}", e)))?;
        Ok(Self::new(ImageRef::data_url(mime, bytes), bitmap))
    }

    /// Decode a reference on the blocking pool.
    pub async fn decode(reference: ImageRef) -> Result<Self, RoundelError> {
        tokio::task::spawn_blocking(move || {
            let bitmap = reference.decode()?;
            Ok(Self::new(reference, bitmap))
        })
        .await
        .map_err(|e| RoundelError::ImageLoad(format!("Decode task failed: {}", e)))?
    }

    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }
}
