//! Session controller.
//!
//! [`Pipeline`] owns a [`Session`] and drives the stages against it: load,
//! crop, dominant color, manual color, export. Each crop run carries the
//! generation ticket it started with; results for superseded runs are
//! dropped by the session.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::capability;
use crate::error::RoundelError;
use crate::export::{BlurLevel, ExportArtifact, ExportCompositor};
use crate::render::color::{self, ColorSample};
use crate::render::crop::{self, CropRegion};
use crate::session::Session;
use crate::source::{ImageRef, SourceImage};

/// Result of a crop run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropOutcome {
    pub side: u32,
    pub color: ColorSample,
    /// `false` if a newer crop started while this one ran.
    pub current: bool,
}

#[derive(Clone)]
pub struct Pipeline {
    session: Arc<RwLock<Session>>,
    compositor: ExportCompositor,
}

impl Pipeline {
    pub fn new(compositor: ExportCompositor) -> Self {
        Self {
            session: Arc::new(RwLock::new(Session::new())),
            compositor,
        }
    }

    pub fn session(&self) -> &Arc<RwLock<Session>> {
        &self.session
    }

    /// Load a photo from a path, data URL or remote URL (relayed).
    pub async fn load(&self, reference: ImageRef) -> Result<SourceImage, RoundelError> {
        let readable = self.compositor.relay().route(&reference).await?;
        let source = SourceImage::decode(readable).await?;
        self.set_source(source.clone()).await;
        Ok(source)
    }

    pub async fn set_source(&self, source: SourceImage) {
        let mut session = self.session.write().await;
        log::info!(
            "new source {}x{} from {}",
            source.width(),
            source.height(),
            source.reference.describe()
        );
        session.set_source(source);
    }

    /// Crop the current photo, then derive the border color from the crop.
    ///
    /// A color extraction failure leaves the previous color in place and is
    /// returned to the caller.
    pub async fn crop(&self, region: CropRegion) -> Result<CropOutcome, RoundelError> {
        let (ticket, source) = {
            let mut session = self.session.write().await;
            let source = session
                .source
                .clone()
                .ok_or_else(|| RoundelError::InvalidParameter("No image uploaded".to_string()))?;
            (session.begin_crop(), source)
        };

        let cropped = crop::crop(&source, region).await?;
        let side = cropped.side();
        let handle = cropped.to_ref();
        self.session.write().await.finish_crop(ticket, region, cropped);

        let sample = match color::extract_dominant(&handle).await {
            Ok(sample) => sample,
            Err(e) => {
                log::warn!("dominant color extraction failed, keeping previous color: {}", e);
                return Err(e);
            }
        };

        let mut session = self.session.write().await;
        let current = session.finish_color(ticket, sample);
        Ok(CropOutcome {
            side,
            color: session.color(),
            current,
        })
    }

    /// Manual color from a hex string.
    pub async fn set_color_hex(&self, hex: &str) -> Result<ColorSample, RoundelError> {
        let sample = ColorSample::parse_hex(hex)?;
        self.session.write().await.override_color(sample.clone());
        Ok(sample)
    }

    /// Eyedropper pick at `(x, y)` on the cropped image.
    pub async fn pick_color(&self, x: u32, y: u32) -> Result<ColorSample, RoundelError> {
        let dropper = self.session.read().await.eyedropper(x, y);
        let sample = capability::pick_color(&dropper)?;
        self.session.write().await.override_color(sample.clone());
        Ok(sample)
    }

    pub async fn set_blur(&self, level: BlurLevel) {
        self.session.write().await.blur_level = level;
    }

    /// Run the export compositor on the current state.
    pub async fn export(&self) -> Result<ExportArtifact, RoundelError> {
        let (region, config) = {
            let session = self.session.read().await;
            (session.capture_region()?, session.export_config()?)
        };
        self.compositor
            .export_to_document(&region, &config.source, config.blur_level)
            .await
    }

    /// Snapshot PNG of the current state, for printing.
    pub async fn preview(&self) -> Result<Vec<u8>, RoundelError> {
        let (region, config) = {
            let session = self.session.read().await;
            (session.capture_region()?, session.export_config()?)
        };
        self.compositor
            .print_preview(&region, &config.source, config.blur_level)
            .await
    }
}
