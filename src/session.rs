//! Editing session state.
//!
//! One [`Session`] holds everything the user has chosen so far: the source
//! photo, the crop, the border color and the blur level. Pipeline stages
//! read and write its fields directly.
//!
//! ## Stale results
//!
//! Crop and color extraction run asynchronously and are never cancelled.
//! Every run is started with a [`Generation`] ticket; a result is accepted
//! only if its ticket is still current, so a slow extraction for an old crop
//! cannot overwrite the color of a newer one.
//!
//! ## Color precedence
//!
//! manual override > extracted dominant color > fallback gray. The override
//! survives re-crops of the same photo and is dropped when a new photo is
//! loaded.

use std::sync::Arc;

use crate::capability::{Capability, ImagePoint};
use crate::error::RoundelError;
use crate::export::{BlurLevel, ExportConfig};
use crate::print::{PrintLayout, Shape};
use crate::render::color::ColorSample;
use crate::render::crop::{CropRegion, CroppedImage};
use crate::render::snapshot::{BackLayer, CaptureRegion};
use crate::source::SourceImage;

/// Ticket identifying one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

#[derive(Debug, Clone, Default)]
pub struct Session {
    generation: u64,
    pub source: Option<SourceImage>,
    pub region: Option<CropRegion>,
    pub cropped: Option<CroppedImage>,
    pub auto_color: Option<ColorSample>,
    pub manual_color: Option<ColorSample>,
    pub shape: Shape,
    pub blur_level: BlurLevel,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation.
    pub fn generation(&self) -> Generation {
        Generation(self.generation)
    }

    pub fn is_current(&self, ticket: Generation) -> bool {
        ticket.0 == self.generation
    }

    fn bump(&mut self) -> Generation {
        self.generation += 1;
        Generation(self.generation)
    }

    /// Replace the photo. Clears the crop, both colors and in-flight work.
    pub fn set_source(&mut self, source: SourceImage) -> Generation {
        self.source = Some(source);
        self.region = None;
        self.cropped = None;
        self.auto_color = None;
        self.manual_color = None;
        self.bump()
    }

    /// Start a new crop; results of older runs will be discarded.
    ///
    /// Region and shape stay untouched until the crop succeeds, so they
    /// always describe the crop currently held.
    pub fn begin_crop(&mut self) -> Generation {
        self.bump()
    }

    /// Store a crop result. Returns `false` if the ticket is stale.
    pub fn finish_crop(&mut self, ticket: Generation, region: CropRegion, cropped: CroppedImage) -> bool {
        if !self.is_current(ticket) {
            log::debug!("discarding stale crop {:?} (now {})", ticket, self.generation);
            return false;
        }
        self.region = Some(region);
        self.shape = cropped.shape;
        self.cropped = Some(cropped);
        true
    }

    /// Store an extracted color. Returns `false` if the ticket is stale.
    pub fn finish_color(&mut self, ticket: Generation, sample: ColorSample) -> bool {
        if !self.is_current(ticket) {
            log::debug!("discarding stale color {} {:?} (now {})", sample.hex, ticket, self.generation);
            return false;
        }
        self.auto_color = Some(sample);
        true
    }

    /// Manual color from the picker or eyedropper.
    pub fn override_color(&mut self, sample: ColorSample) {
        self.manual_color = Some(sample);
    }

    pub fn clear_override(&mut self) {
        self.manual_color = None;
    }

    /// Eyedropper over the current crop; unavailable before the first crop.
    pub fn eyedropper(&self, x: u32, y: u32) -> Capability<Arc<ImagePoint>> {
        Capability::from_option(self.cropped.as_ref().map(|c| {
            Arc::new(ImagePoint {
                image: Arc::clone(&c.bitmap),
                x,
                y,
            })
        }))
    }

    /// Effective border color.
    pub fn color(&self) -> ColorSample {
        self.manual_color
            .clone()
            .or_else(|| self.auto_color.clone())
            .unwrap_or_default()
    }

    pub fn layout(&self) -> PrintLayout {
        PrintLayout::for_shape(self.shape)
    }

    /// Assemble the export settings from current state.
    pub fn export_config(&self) -> Result<ExportConfig, RoundelError> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| RoundelError::InvalidParameter("No image uploaded".to_string()))?;
        Ok(ExportConfig {
            shape: self.shape,
            blur_level: self.blur_level,
            color: self.color(),
            source: source.reference.clone(),
        })
    }

    /// The logo as displayed: blurred photo, ring, cropped front.
    pub fn capture_region(&self) -> Result<CaptureRegion, RoundelError> {
        let cropped = self
            .cropped
            .as_ref()
            .ok_or_else(|| RoundelError::InvalidParameter("Image has not been cropped".to_string()))?;
        let back = self.source.as_ref().map(|source| BackLayer {
            src: source.reference.clone(),
            live_blur_px: self.blur_level.px(),
        });
        Ok(CaptureRegion::logo(
            self.layout(),
            cropped.to_ref(),
            self.color(),
            back,
        ))
    }
}
