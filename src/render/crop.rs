//! # Shape Cropper
//!
//! Cuts a square out of the source photo and optionally masks it to a circle.
//!
//! ```text
//!   source                        output (side = min(w, h))
//!  ┌──────────────────┐          ┌────────┐       ┌────────┐
//!  │   (x,y)┌──────┐  │          │        │       │ ╭────╮ │
//!  │        │ w×h  │  │   ──►    │ square │  or   │ │ ●  │ │  round
//!  │        └──────┘  │          │        │       │ ╰────╯ │
//!  └──────────────────┘          └────────┘       └────────┘
//! ```
//!
//! The crop never scales: the output is the top-left `side × side` part of
//! the requested rectangle. Parts of the rectangle that fall outside the
//! source come out transparent. The square must start inside the source and
//! its side may not exceed [`MAX_SIDE_FACTOR`] times the longer source edge.

use image::{DynamicImage, GenericImageView, RgbaImage, imageops};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::RoundelError;
use crate::print::Shape;
use crate::source::{ImageRef, SourceImage, encode_png};

/// Largest crop side, as a multiple of the longer source edge.
pub const MAX_SIDE_FACTOR: u64 = 2;

/// Crop rectangle in source pixels, plus the mask shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub shape: Shape,
}

impl CropRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32, shape: Shape) -> Self {
        Self {
            x,
            y,
            width,
            height,
            shape,
        }
    }

    /// Edge length of the cropped output.
    pub fn side(&self) -> u32 {
        self.width.min(self.height)
    }

    /// Largest centred square of an image, the default before the user crops.
    pub fn centered(width: u32, height: u32, shape: Shape) -> Self {
        let side = width.min(height);
        Self::new((width - side) / 2, (height - side) / 2, side, side, shape)
    }
}

/// A square crop, masked or not, plus its PNG encoding.
#[derive(Debug, Clone)]
pub struct CroppedImage {
    pub shape: Shape,
    pub bitmap: Arc<RgbaImage>,
    pub png: Vec<u8>,
}

impl CroppedImage {
    pub fn side(&self) -> u32 {
        self.bitmap.width()
    }

    /// PNG data URL handle for downstream stages.
    pub fn to_ref(&self) -> ImageRef {
        ImageRef::png(&self.png)
    }
}

/// Crop `region` out of `source` into a new `side × side` raster.
pub fn crop_bitmap(source: &DynamicImage, region: CropRegion) -> Result<RgbaImage, RoundelError> {
    let side = region.side();
    if side == 0 {
        return Err(RoundelError::Encoding(format!(
            "Canvas empty: crop region {}x{} has no area",
            region.width, region.height
        )));
    }

    let (src_w, src_h) = source.dimensions();
    if region.x >= src_w || region.y >= src_h {
        return Err(RoundelError::InvalidParameter(format!(
            "Crop origin ({}, {}) lies outside the {}x{} source",
            region.x, region.y, src_w, src_h
        )));
    }
    let max_side = u64::from(src_w.max(src_h)) * MAX_SIDE_FACTOR;
    if u64::from(side) > max_side {
        return Err(RoundelError::InvalidParameter(format!(
            "Crop side {} exceeds {} for a {}x{} source",
            side, max_side, src_w, src_h
        )));
    }

    let mut output = RgbaImage::new(side, side);

    // Copy the overlap between the requested square and the source
    let copy_w = src_w.saturating_sub(region.x).min(side);
    let copy_h = src_h.saturating_sub(region.y).min(side);
    if copy_w > 0 && copy_h > 0 {
        let part = imageops::crop_imm(source, region.x, region.y, copy_w, copy_h).to_image();
        imageops::replace(&mut output, &part, 0, 0);
    }

    if region.shape == Shape::Round {
        apply_circle_mask(&mut output);
    }

    Ok(output)
}

/// Clear every pixel whose centre lies outside the inscribed circle.
pub fn apply_circle_mask(image: &mut RgbaImage) {
    let width = image.width() as usize;
    if width == 0 {
        return;
    }
    let cx = width as f32 / 2.0;
    let cy = image.height() as f32 / 2.0;
    let radius = cx.min(cy);
    let radius_sq = radius * radius;

    image
        .par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let dy = y as f32 + 0.5 - cy;
            for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
                let dx = x as f32 + 0.5 - cx;
                if dx * dx + dy * dy > radius_sq {
                    pixel.copy_from_slice(&[0, 0, 0, 0]);
                }
            }
        });
}

/// Crop the source photo (runs on the blocking pool).
pub async fn crop(source: &SourceImage, region: CropRegion) -> Result<CroppedImage, RoundelError> {
    let bitmap = source.bitmap.clone();
    tokio::task::spawn_blocking(move || {
        let cropped = crop_bitmap(&bitmap, region)?;
        let png = encode_png(&cropped)?;
        log::debug!(
            "cropped {}x{}+{}+{} to {} {}px",
            region.width,
            region.height,
            region.x,
            region.y,
            region.shape,
            cropped.width()
        );
        Ok(CroppedImage {
            shape: region.shape,
            bitmap: Arc::new(cropped),
            png,
        })
    })
    .await
    .map_err(|e| RoundelError::Encoding(format!("Crop task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbaImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                img.put_pixel(x, y, Rgba([x as u8, y as u8, 128, 255]));
            }
        }
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_side_is_min_of_region() {
        let src = gradient(120, 80);
        for shape in [Shape::Round, Shape::Square] {
            let out = crop_bitmap(&src, CropRegion::new(0, 0, 50, 30, shape)).unwrap();
            assert_eq!(out.dimensions(), (30, 30));
            let out = crop_bitmap(&src, CropRegion::new(5, 5, 17, 60, shape)).unwrap();
            assert_eq!(out.dimensions(), (17, 17));
        }
    }

    #[test]
    fn test_square_copies_without_scaling() {
        let src = gradient(100, 100);
        let out = crop_bitmap(&src, CropRegion::new(10, 20, 40, 50, Shape::Square)).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [10, 20, 128, 255]);
        assert_eq!(out.get_pixel(39, 39).0, [49, 59, 128, 255]);
        assert!(out.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn test_circle_corners_transparent_center_opaque() {
        let src = gradient(64, 64);
        for side in [4u32, 5, 9, 32, 64] {
            let out = crop_bitmap(&src, CropRegion::new(0, 0, side, side, Shape::Round)).unwrap();
            let last = side - 1;
            for (x, y) in [(0, 0), (last, 0), (0, last), (last, last)] {
                assert_eq!(out.get_pixel(x, y).0[3], 0, "corner ({},{}) side {}", x, y, side);
            }
            assert_eq!(out.get_pixel(side / 2, side / 2).0[3], 255, "center side {}", side);
        }
    }

    #[test]
    fn test_region_outside_source_is_transparent() {
        let src = gradient(10, 10);
        let out = crop_bitmap(&src, CropRegion::new(5, 5, 10, 10, Shape::Square)).unwrap();
        assert_eq!(out.get_pixel(4, 4).0[3], 255);
        assert_eq!(out.get_pixel(5, 5).0[3], 0);
        assert_eq!(out.get_pixel(9, 0).0[3], 0);
    }

    #[test]
    fn test_empty_region_is_encoding_error() {
        let src = gradient(10, 10);
        let err = crop_bitmap(&src, CropRegion::new(0, 0, 0, 10, Shape::Round)).unwrap_err();
        assert!(matches!(err, RoundelError::Encoding(_)));
    }

    #[test]
    fn test_oversized_region_is_rejected() {
        let src = gradient(10, 10);
        for region in [
            CropRegion::new(0, 0, u32::MAX, u32::MAX, Shape::Square),
            CropRegion::new(0, 0, 60_000, 60_000, Shape::Round),
            CropRegion::new(0, 0, 21, 21, Shape::Square),
            CropRegion::new(10, 0, 5, 5, Shape::Square),
            CropRegion::new(0, u32::MAX, 5, 5, Shape::Round),
        ] {
            let err = crop_bitmap(&src, region).unwrap_err();
            assert!(matches!(err, RoundelError::InvalidParameter(_)), "{:?}", region);
        }

        // Zooming out up to twice the source is still allowed
        let out = crop_bitmap(&src, CropRegion::new(9, 9, 20, 20, Shape::Square)).unwrap();
        assert_eq!(out.dimensions(), (20, 20));
        assert_eq!(out.get_pixel(0, 0).0[3], 255);
        assert_eq!(out.get_pixel(1, 1).0[3], 0);
    }

    #[test]
    fn test_centered_region() {
        let region = CropRegion::centered(200, 300, Shape::Round);
        assert_eq!(region, CropRegion::new(0, 50, 200, 200, Shape::Round));
    }

    #[tokio::test]
    async fn test_crop_encodes_png() {
        let source = SourceImage::new(ImageRef::File("unused.png".into()), gradient(30, 20));
        let cropped = crop(&source, CropRegion::new(0, 0, 30, 20, Shape::Round)).await.unwrap();
        assert_eq!(cropped.side(), 20);

        let decoded = cropped.to_ref().decode().unwrap();
        assert_eq!(decoded.width(), 20);
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0).0[3], 0);
    }
}
