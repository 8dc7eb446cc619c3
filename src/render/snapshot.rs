//! # Capture Region Snapshot
//!
//! The capture region is the composed logo as shown on screen: a blurred back
//! layer filling the page, a color ring, and the cropped photo on top. This
//! module holds that layer tree and rasterizes it at print resolution.
//!
//! ```text
//!  ┌──────────── page ────────────┐
//!  │ back (cover-fit, blurred)    │
//!  │    ┌──────── ring ────────┐  │
//!  │    │   ┌──── front ───┐   │  │
//!  │    │   │  cropped     │   │  │
//!  │    │   │  photo       │   │  │
//!  │    │   └──────────────┘   │  │
//!  │    └──────────────────────┘  │
//!  └──────────────────────────────┘
//! ```
//!
//! Layers are drawn in vector order, index 0 at the bottom. Round layouts are
//! clipped to the page circle. The snapshot renderer does not apply live
//! filters: blur must be baked into the back layer's pixels beforehand (see
//! [`CaptureRegion::prepare_for_capture`]).

use image::{DynamicImage, Rgba, RgbaImage, imageops, imageops::FilterType};

use crate::error::RoundelError;
use crate::print::{PrintLayout, Shape};
use crate::render::color::ColorSample;
use crate::render::crop::apply_circle_mask;
use crate::source::ImageRef;

/// Background photo, cover-fit and centred over the whole page.
#[derive(Debug, Clone, PartialEq)]
pub struct BackLayer {
    pub src: ImageRef,
    /// Display-time blur in CSS pixels. Ignored by the snapshot renderer.
    pub live_blur_px: f32,
}

/// Solid color ring behind the front image.
#[derive(Debug, Clone, PartialEq)]
pub struct RingLayer {
    pub color: ColorSample,
    pub edge_mm: f32,
}

/// The cropped photo.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontLayer {
    pub src: ImageRef,
    pub edge_mm: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Back(BackLayer),
    Ring(RingLayer),
    Front(FrontLayer),
}

/// The composed logo, ready to be snapshotted.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRegion {
    pub layout: PrintLayout,
    pub layers: Vec<Layer>,
}

impl CaptureRegion {
    /// Standard logo tree: optional back layer, ring, front.
    pub fn logo(
        layout: PrintLayout,
        front: ImageRef,
        color: ColorSample,
        back: Option<BackLayer>,
    ) -> Self {
        let mut layers = Vec::with_capacity(3);
        if let Some(back) = back {
            layers.push(Layer::Back(back));
        }
        layers.push(Layer::Ring(RingLayer {
            color,
            edge_mm: layout.ring_mm,
        }));
        layers.push(Layer::Front(FrontLayer {
            src: front,
            edge_mm: layout.front_mm,
        }));
        Self { layout, layers }
    }

    /// Rendered width in CSS pixels, the display reference for blur scaling.
    pub fn rendered_width(&self) -> f32 {
        self.layout.page_css_px()
    }

    pub fn back_layer(&self) -> Option<&BackLayer> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Back(back) => Some(back),
            _ => None,
        })
    }

    /// Copy of the tree for snapshotting: the back layer shows `final_back`
    /// with its live blur disabled. Without a back layer, one is inserted at
    /// the bottom of the stack.
    pub fn prepare_for_capture(&self, final_back: ImageRef) -> Self {
        let mut prepared = self.clone();
        let existing = prepared.layers.iter_mut().find_map(|layer| match layer {
            Layer::Back(back) => Some(back),
            _ => None,
        });

        match existing {
            Some(back) => {
                back.src = final_back;
                back.live_blur_px = 0.0;
            }
            None => prepared.layers.insert(
                0,
                Layer::Back(BackLayer {
                    src: final_back,
                    live_blur_px: 0.0,
                }),
            ),
        }
        prepared
    }
}

fn decode_layer(src: &ImageRef) -> Result<DynamicImage, RoundelError> {
    src.decode()
        .map_err(|e| RoundelError::Capture(format!("Layer {} failed: {}", src.describe(), e)))
}

/// Scale to cover an `edge × edge` box and crop the centre.
fn cover_fit(image: &DynamicImage, edge: u32) -> RgbaImage {
    let (w, h) = (image.width().max(1) as f32, image.height().max(1) as f32);
    let scale = (edge as f32 / w).max(edge as f32 / h);
    let scaled_w = ((w * scale).ceil() as u32).max(edge);
    let scaled_h = ((h * scale).ceil() as u32).max(edge);

    let scaled = image.resize_exact(scaled_w, scaled_h, FilterType::Triangle);
    scaled
        .crop_imm((scaled_w - edge) / 2, (scaled_h - edge) / 2, edge, edge)
        .to_rgba8()
}

/// Rasterize the capture region at `scale` device pixels per CSS pixel.
///
/// The background is transparent.
pub fn render_snapshot(region: &CaptureRegion, scale: f32) -> Result<RgbaImage, RoundelError> {
    if scale.is_nan() || scale <= 0.0 {
        return Err(RoundelError::Capture(format!("Invalid snapshot scale {}", scale)));
    }
    let layout = &region.layout;
    let page = layout.snapshot_px(scale);
    let mut canvas = RgbaImage::new(page, page);

    for layer in &region.layers {
        match layer {
            Layer::Back(back) => {
                if back.live_blur_px > 0.0 {
                    log::debug!(
                        "snapshot ignores live blur of {}px on the back layer",
                        back.live_blur_px
                    );
                }
                let fitted = cover_fit(&decode_layer(&back.src)?, page);
                imageops::overlay(&mut canvas, &fitted, 0, 0);
            }
            Layer::Ring(ring) => {
                let (offset, edge) = layout.layer_box_px(ring.edge_mm, scale);
                let [r, g, b] = ring.color.rgb();
                let mut disc = RgbaImage::from_pixel(edge, edge, Rgba([r, g, b, 255]));
                if layout.shape == Shape::Round {
                    apply_circle_mask(&mut disc);
                }
                imageops::overlay(&mut canvas, &disc, offset as i64, offset as i64);
            }
            Layer::Front(front) => {
                let (offset, edge) = layout.layer_box_px(front.edge_mm, scale);
                let mut image = decode_layer(&front.src)?
                    .resize_exact(edge, edge, FilterType::Lanczos3)
                    .to_rgba8();
                if layout.shape == Shape::Round {
                    apply_circle_mask(&mut image);
                }
                imageops::overlay(&mut canvas, &image, offset as i64, offset as i64);
            }
        }
    }

    if layout.shape == Shape::Round {
        apply_circle_mask(&mut canvas);
    }
    Ok(canvas)
}
