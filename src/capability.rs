//! Optional host capabilities.
//!
//! Features that may or may not exist where the pipeline runs (a true blur
//! filter, an eyedropper) are injected as a [`Capability`]. Callers branch on
//! the variant instead of probing at call time.

use image::RgbaImage;
use std::sync::Arc;

use crate::error::RoundelError;
use crate::render::color::ColorSample;

/// An injected feature handler, or its absence.
#[derive(Debug, Clone)]
pub enum Capability<H> {
    Available(H),
    Unavailable,
}

impl<H> Capability<H> {
    pub fn from_option(handler: Option<H>) -> Self {
        match handler {
            Some(h) => Self::Available(h),
            None => Self::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

/// Picks a single color, e.g. by sampling a point the user clicked.
pub trait EyeDropper: Send + Sync {
    /// `None` when the pick was cancelled or landed outside the image.
    fn pick(&self) -> Option<[u8; 3]>;
}

/// Eyedropper that samples one pixel of a bitmap.
#[derive(Debug, Clone)]
pub struct ImagePoint {
    pub image: Arc<RgbaImage>,
    pub x: u32,
    pub y: u32,
}

impl EyeDropper for ImagePoint {
    fn pick(&self) -> Option<[u8; 3]> {
        if self.x >= self.image.width() || self.y >= self.image.height() {
            return None;
        }
        let [r, g, b, a] = self.image.get_pixel(self.x, self.y).0;
        // Transparent corners of a round crop have no meaningful color
        (a > 0).then_some([r, g, b])
    }
}

/// Run the eyedropper, reporting a missing capability as an error the UI
/// shows to the user.
pub fn pick_color<E: EyeDropper + ?Sized>(
    capability: &Capability<Arc<E>>,
) -> Result<ColorSample, RoundelError> {
    match capability {
        Capability::Available(dropper) => dropper
            .pick()
            .map(|[r, g, b]| ColorSample::from_rgb(r, g, b))
            .ok_or_else(|| RoundelError::InvalidParameter("No color picked".to_string())),
        Capability::Unavailable => Err(RoundelError::Unsupported(
            "Eyedropper is not available; choose a color manually".to_string(),
        )),
    }
}
