//! # Export Compositor
//!
//! Turns the on-screen logo into a physically sized PDF in three phases:
//!
//! 1. **Pre-bake**: relay the back-layer source, then bake the blur into its
//!    pixels using the capture region's rendered width as display reference
//! 2. **Snapshot**: rasterize the layer tree at 4× CSS scale with the baked
//!    back layer swapped in and live blur disabled
//! 3. **Paginate**: place the snapshot on a 108.42mm (round) or 105.833mm
//!    (square) page
//!
//! Pre-bake failures degrade to the unblurred source. Snapshot and document
//! failures end the export and leave nothing on disk.
//!
//! ## Example
//!
//! ```no_run
//! use roundel::export::{BlurLevel, ExportCompositor, EXPORT_FILE_NAME};
//! use roundel::print::PrintLayout;
//! use roundel::render::{color::ColorSample, snapshot::CaptureRegion};
//! use roundel::source::ImageRef;
//!
//! # async fn example() -> Result<(), roundel::RoundelError> {
//! let compositor = ExportCompositor::with_defaults()?;
//! let photo = ImageRef::from_location("https://example.com/photo.jpg");
//! let region = CaptureRegion::logo(
//!     PrintLayout::ROUND,
//!     ImageRef::from_location("cropped.png"),
//!     ColorSample::parse_hex("#c0ffee")?,
//!     None,
//! );
//!
//! let artifact = compositor
//!     .export_to_document(&region, &photo, BlurLevel::default())
//!     .await?;
//! artifact.save(EXPORT_FILE_NAME)?;
//! # Ok(())
//! # }
//! ```

pub mod pdf;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::RoundelError;
use crate::print::Shape;
use crate::relay::{ImageFetcher, ImageRelay, RelayConfig};
use crate::render::blur::BlurBaker;
use crate::render::color::ColorSample;
use crate::render::snapshot::{CaptureRegion, render_snapshot};
use crate::source::{ImageRef, encode_png};

/// Device pixels per CSS pixel in the snapshot.
pub const SNAPSHOT_SCALE: f32 = 4.0;

/// File name of the downloaded artifact.
pub const EXPORT_FILE_NAME: &str = "PrintCopy.pdf";

/// Back-layer blur in CSS pixels, 1 to 20.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BlurLevel(u8);

impl BlurLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 20;

    pub fn new(level: u8) -> Result<Self, RoundelError> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(RoundelError::InvalidParameter(format!(
                "Blur level {} out of range {}-{}",
                level,
                Self::MIN,
                Self::MAX
            )))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn px(&self) -> f32 {
        self.0 as f32
    }
}

impl Default for BlurLevel {
    fn default() -> Self {
        Self(5)
    }
}

impl TryFrom<u8> for BlurLevel {
    type Error = RoundelError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<BlurLevel> for u8 {
    fn from(level: BlurLevel) -> u8 {
        level.0
    }
}

/// Everything an export needs, assembled from the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    pub shape: Shape,
    pub blur_level: BlurLevel,
    pub color: ColorSample,
    pub source: ImageRef,
}

/// A finished single-page PDF.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub page_mm: f32,
    pub pdf: Vec<u8>,
}

impl ExportArtifact {
    /// Write the PDF to `path`, consuming the artifact.
    ///
    /// Bytes go to a hidden sibling file first and are renamed into place,
    /// so a failed write never leaves a truncated PDF behind.
    pub fn save(self, path: impl AsRef<Path>) -> Result<PathBuf, RoundelError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .ok_or_else(|| RoundelError::DocumentWrite(format!("Invalid path {}", path.display())))?;
        let partial = path.with_file_name(format!(".{}.partial", file_name.to_string_lossy()));

        let result = fs::write(&partial, &self.pdf).and_then(|_| fs::rename(&partial, path));
        if let Err(e) = result {
            let _ = fs::remove_file(&partial);
            return Err(RoundelError::DocumentWrite(format!(
                "Failed to save {}: {}",
                path.display(),
                e
            )));
        }
        log::info!("saved {} ({} bytes, {}mm page)", path.display(), self.pdf.len(), self.page_mm);
        Ok(path.to_path_buf())
    }
}

/// Runs the pre-bake, snapshot and paginate phases.
#[derive(Clone)]
pub struct ExportCompositor {
    relay: Arc<dyn ImageFetcher>,
    baker: BlurBaker,
}

impl ExportCompositor {
    pub fn new(relay: Arc<dyn ImageFetcher>, baker: BlurBaker) -> Self {
        Self { relay, baker }
    }

    /// reqwest relay and Gaussian blur.
    pub fn with_defaults() -> Result<Self, RoundelError> {
        Ok(Self::new(
            Arc::new(ImageRelay::new(RelayConfig::default())?),
            BlurBaker::default(),
        ))
    }

    pub fn relay(&self) -> &Arc<dyn ImageFetcher> {
        &self.relay
    }

    /// Phase 1: relay and blur the back-layer source. Never fails.
    pub async fn pre_bake(&self, region: &CaptureRegion, source: &ImageRef, blur: BlurLevel) -> ImageRef {
        let relayed = match self.relay.route(source).await {
            Ok(relayed) => relayed,
            Err(e) => {
                log::warn!("relay failed for {}: {}", source.describe(), e);
                return source.clone();
            }
        };
        self.baker
            .bake(&relayed, blur.px(), Some(region.rendered_width()))
            .await
    }

    /// Phase 2: render the prepared tree on the blocking pool.
    async fn snapshot(&self, region: &CaptureRegion, final_back: ImageRef) -> Result<image::RgbaImage, RoundelError> {
        let prepared = region.prepare_for_capture(final_back);
        tokio::task::spawn_blocking(move || render_snapshot(&prepared, SNAPSHOT_SCALE))
            .await
            .map_err(|e| RoundelError::Capture(format!("Snapshot task failed: {}", e)))?
    }

    /// Run all three phases and return the PDF.
    pub async fn export_to_document(
        &self,
        region: &CaptureRegion,
        source: &ImageRef,
        blur: BlurLevel,
    ) -> Result<ExportArtifact, RoundelError> {
        let page_mm = region.layout.page_mm;
        log::info!(
            "exporting {} logo ({}mm page, blur {})",
            region.layout.shape,
            page_mm,
            blur.get()
        );

        let final_back = self.pre_bake(region, source, blur).await;
        let snapshot = self.snapshot(region, final_back).await?;
        let pdf = tokio::task::spawn_blocking(move || pdf::paginate(&snapshot, page_mm))
            .await
            .map_err(|e| RoundelError::DocumentWrite(format!("PDF task failed: {}", e)))??;

        Ok(ExportArtifact { page_mm, pdf })
    }

    /// Export straight to a file.
    pub async fn export_to_file(
        &self,
        region: &CaptureRegion,
        source: &ImageRef,
        blur: BlurLevel,
        path: impl AsRef<Path>,
    ) -> Result<PathBuf, RoundelError> {
        self.export_to_document(region, source, blur)
            .await?
            .save(path)
    }

    /// Snapshot PNG for the print action.
    pub async fn print_preview(
        &self,
        region: &CaptureRegion,
        source: &ImageRef,
        blur: BlurLevel,
    ) -> Result<Vec<u8>, RoundelError> {
        let final_back = self.pre_bake(region, source, blur).await;
        let snapshot = self.snapshot(region, final_back).await?;
        encode_png(&snapshot).map_err(|e| RoundelError::Capture(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print::PrintLayout;
    use crate::relay::RelayedImage;
    use async_trait::async_trait;
    use image::{Rgba, RgbaImage};

    /// Serves a fixed PNG for any URL, or fails every fetch.
    struct FakeRelay(Option<Vec<u8>>);

    #[async_trait]
    impl ImageFetcher for FakeRelay {
        async fn fetch(&self, url: &str) -> Result<RelayedImage, RoundelError> {
            match &self.0 {
                Some(bytes) => Ok(RelayedImage {
                    bytes: bytes.clone(),
                    content_type: "image/png".to_string(),
                }),
                None => Err(RoundelError::ProxyFetch(format!("unreachable: {}", url))),
            }
        }
    }

    fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        encode_png(&RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]))).unwrap()
    }

    fn region(layout: PrintLayout) -> CaptureRegion {
        CaptureRegion::logo(
            layout,
            ImageRef::png(&solid_png(8, 8, [200, 0, 0])),
            ColorSample::from_rgb(0, 0, 200),
            None,
        )
    }

    fn compositor(relay: FakeRelay) -> ExportCompositor {
        ExportCompositor::new(Arc::new(relay), BlurBaker::default())
    }

    #[test]
    fn test_blur_level_range() {
        assert!(BlurLevel::new(0).is_err());
        assert!(BlurLevel::new(21).is_err());
        assert_eq!(BlurLevel::new(20).unwrap().px(), 20.0);
        assert_eq!(BlurLevel::default().get(), 5);
        assert!(serde_json::from_str::<BlurLevel>("30").is_err());
        assert_eq!(serde_json::from_str::<BlurLevel>("7").unwrap().get(), 7);
    }

    #[tokio::test]
    async fn test_page_size_per_shape() {
        let compositor = compositor(FakeRelay(Some(solid_png(20, 10, [0, 200, 0]))));
        let source = ImageRef::Url("https://example.com/back.png".into());

        for (layout, expected) in [(PrintLayout::ROUND, 108.42f32), (PrintLayout::SQUARE, 105.833)] {
            let artifact = compositor
                .export_to_document(&region(layout), &source, BlurLevel::default())
                .await
                .unwrap();
            assert_eq!(artifact.page_mm, expected);
            let (w, h) = pdf::page_size_mm(&artifact.pdf).unwrap();
            assert!((w - expected).abs() < 1e-3 && (h - expected).abs() < 1e-3);
        }
    }

    #[tokio::test]
    async fn test_relay_failure_is_terminal_at_snapshot() {
        let compositor = compositor(FakeRelay(None));
        let source = ImageRef::Url("https://example.com/back.png".into());

        // The unreadable back layer cannot be captured
        let err = compositor
            .export_to_document(&region(PrintLayout::SQUARE), &source, BlurLevel::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RoundelError::Capture(_)));
    }

    #[tokio::test]
    async fn test_pre_bake_blurs_relayed_source() {
        let compositor = compositor(FakeRelay(Some(solid_png(20, 10, [0, 200, 0]))));
        let source = ImageRef::Url("https://example.com/back.png".into());
        let baked = compositor
            .pre_bake(&region(PrintLayout::ROUND), &source, BlurLevel::default())
            .await;
        assert!(!baked.is_remote());
        assert_eq!(baked.decode().unwrap().width(), 20);
    }

    #[tokio::test]
    async fn test_print_preview_png() {
        let compositor = compositor(FakeRelay(None));
        let local = ImageRef::png(&solid_png(10, 10, [1, 2, 3]));
        let png = compositor
            .print_preview(&region(PrintLayout::SQUARE), &local, BlurLevel::default())
            .await
            .unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!(img.width(), 1600);
    }

    #[test]
    fn test_save_writes_no_partial_file() {
        let dir = std::env::temp_dir().join(format!("roundel-save-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(EXPORT_FILE_NAME);

        let artifact = ExportArtifact {
            page_mm: 100.0,
            pdf: b"%PDF-1.5".to_vec(),
        };
        assert_eq!(artifact.save(&path).unwrap(), path);
        assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.5");
        assert!(!dir.join(".PrintCopy.pdf.partial").exists());

        // Missing parent directory fails without leaving anything behind
        let missing = dir.join("missing").join(EXPORT_FILE_NAME);
        let artifact = ExportArtifact {
            page_mm: 100.0,
            pdf: vec![1],
        };
        assert!(matches!(artifact.save(&missing), Err(RoundelError::DocumentWrite(_))));
        assert!(!missing.exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}
