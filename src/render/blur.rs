//! # Blur Baking
//!
//! Renders a blur into the pixel data of an image so it survives raster
//! snapshotting, instead of relying on a display-time filter.
//!
//! ## Resolution Scaling
//!
//! The blur amount is given in on-screen (CSS) pixels. A photo rendered at
//! 400px but stored at 4000px needs ten times the radius to look the same:
//!
//! ```text
//! scale          = natural_width / display_width    (1 when unknown)
//! effective_blur = blur_px * scale
//! ```
//!
//! ## Paths
//!
//! - **Gaussian** (a true-blur [`BlurFilter`] is available): approximate a
//!   Gaussian with sigma = `effective_blur` in linear time.
//! - **Pixelate-and-smooth** (no filter available): shrink by
//!   `max(0.03, 1 / (1 + effective_blur / 5))`, then scale back up to the
//!   natural size with a smoothing filter. Coarser, but always available.
//!
//! Sources longer than [`MAX_BAKE_EDGE`] are shrunk before blurring and the
//! blur is scaled down with them. The snapshot never draws the back layer
//! larger than that, so the result looks the same.
//!
//! Baking is best-effort: any failure yields a [`BlurWarning`] and callers
//! continue with the unblurred source.

use image::{DynamicImage, RgbaImage, imageops, imageops::FilterType};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::capability::Capability;
use crate::source::{ImageRef, encode_png};

/// Smallest fraction of the natural size used by the fallback path.
pub const MIN_DOWNSCALE_FACTOR: f32 = 0.03;

/// Longest edge of a baked image, above the 4× round snapshot edge (1639px).
pub const MAX_BAKE_EDGE: u32 = 2048;

/// A true blur convolution.
pub trait BlurFilter: Send + Sync {
    fn blur(&self, image: &RgbaImage, sigma: f32) -> RgbaImage;
}

/// Box-filter Gaussian approximation from `image::imageops`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianBlur;

impl BlurFilter for GaussianBlur {
    fn blur(&self, image: &RgbaImage, sigma: f32) -> RgbaImage {
        // Box passes wider than the image add nothing
        let sigma = sigma.min(image.width().min(image.height()).max(1) as f32);
        imageops::fast_blur(image, sigma)
    }
}

/// Why a bake fell back to the original image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlurWarning {
    /// Source could not be read or decoded
    #[error("blur source failed to load: {0}")]
    Load(String),

    /// Pixel data is not readable (remote image that was not relayed)
    #[error("blur source pixels are not readable: {0}")]
    Inaccessible(String),

    /// Blurred raster could not be encoded
    #[error("blurred image could not be encoded: {0}")]
    Encoding(String),
}

/// Blur in source pixels for a blur requested in display pixels.
pub fn effective_blur(blur_px: f32, natural_width: u32, display_width: Option<f32>) -> f32 {
    let scale = match display_width {
        Some(w) if w > 0.0 => natural_width as f32 / w,
        _ => 1.0,
    };
    blur_px * scale
}

/// Downscale factor used by the pixelate-and-smooth path.
pub fn fallback_factor(effective_blur: f32) -> f32 {
    (1.0 / (1.0 + effective_blur / 5.0)).max(MIN_DOWNSCALE_FACTOR)
}

/// Shrink `image` to fit [`MAX_BAKE_EDGE`], scaling `effective_blur` to match.
fn fit_for_bake(image: RgbaImage, effective_blur: f32) -> (RgbaImage, f32) {
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    if longest <= MAX_BAKE_EDGE {
        return (image, effective_blur);
    }
    let ratio = MAX_BAKE_EDGE as f32 / longest as f32;
    let new_w = ((width as f32 * ratio).round() as u32).clamp(1, MAX_BAKE_EDGE);
    let new_h = ((height as f32 * ratio).round() as u32).clamp(1, MAX_BAKE_EDGE);
    let small = imageops::resize(&image, new_w, new_h, FilterType::Triangle);
    (small, effective_blur * ratio)
}

/// Approximate a blur by shrinking and smoothly enlarging again.
pub fn pixelate_blur(image: &RgbaImage, effective_blur: f32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let factor = fallback_factor(effective_blur);
    let small_w = ((width as f32 * factor).round() as u32).max(1);
    let small_h = ((height as f32 * factor).round() as u32).max(1);

    let small = imageops::resize(image, small_w, small_h, FilterType::Triangle);
    imageops::resize(&small, width, height, FilterType::CatmullRom)
}

/// Bakes blur into images, using a true blur when the capability exists.
#[derive(Clone)]
pub struct BlurBaker {
    filter: Capability<Arc<dyn BlurFilter>>,
}

impl fmt::Debug for BlurBaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlurBaker")
            .field("gaussian", &self.filter.is_available())
            .finish()
    }
}

impl Default for BlurBaker {
    fn default() -> Self {
        Self::new(Capability::Available(Arc::new(GaussianBlur)))
    }
}

impl BlurBaker {
    pub fn new(filter: Capability<Arc<dyn BlurFilter>>) -> Self {
        Self { filter }
    }

    /// Baker that always takes the pixelate-and-smooth path.
    pub fn pixelating() -> Self {
        Self::new(Capability::Unavailable)
    }

    /// Blur a decoded raster by `effective_blur` source pixels.
    pub fn blur_bitmap(&self, image: &RgbaImage, effective_blur: f32) -> RgbaImage {
        match &self.filter {
            Capability::Available(filter) => filter.blur(image, effective_blur),
            Capability::Unavailable => pixelate_blur(image, effective_blur),
        }
    }

    /// Synchronous bake. `blur_px <= 0` returns the input reference untouched.
    pub fn bake_now(
        &self,
        source: &ImageRef,
        blur_px: f32,
        display_width: Option<f32>,
    ) -> Result<ImageRef, BlurWarning> {
        if blur_px <= 0.0 {
            return Ok(source.clone());
        }
        if let ImageRef::Url(url) = source {
            return Err(BlurWarning::Inaccessible(url.clone()));
        }

        let bitmap: DynamicImage = source.decode().map_err(|e| BlurWarning::Load(e.to_string()))?;
        let effective = effective_blur(blur_px, bitmap.width(), display_width);
        log::debug!(
            "baking blur {}px (effective {:.2}px, gaussian={}) into {}x{}",
            blur_px,
            effective,
            self.filter.is_available(),
            bitmap.width(),
            bitmap.height()
        );

        let (fitted, effective) = fit_for_bake(bitmap.to_rgba8(), effective);
        let blurred = self.blur_bitmap(&fitted, effective);
        let png = encode_png(&blurred).map_err(|e| BlurWarning::Encoding(e.to_string()))?;
        Ok(ImageRef::png(&png))
    }

    /// Bake on the blocking pool, reporting degradation as a warning.
    pub async fn try_bake(
        &self,
        source: &ImageRef,
        blur_px: f32,
        display_width: Option<f32>,
    ) -> Result<ImageRef, BlurWarning> {
        if blur_px <= 0.0 {
            return Ok(source.clone());
        }
        let baker = self.clone();
        let src = source.clone();
        tokio::task::spawn_blocking(move || baker.bake_now(&src, blur_px, display_width))
            .await
            .map_err(|e| BlurWarning::Load(format!("blur task failed: {}", e)))?
    }

    /// Bake, falling back to the original source on any failure.
    pub async fn bake(&self, source: &ImageRef, blur_px: f32, display_width: Option<f32>) -> ImageRef {
        match self.try_bake(source, blur_px, display_width).await {
            Ok(baked) => baked,
            Err(warning) => {
                log::warn!("{}; using original source {}", warning, source.describe());
                source.clone()
            }
        }
    }
}
