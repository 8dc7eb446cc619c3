//! # Dominant Color Extraction
//!
//! Picks the border color for a logo from its pixels.
//!
//! ## Method
//!
//! 1. Resample the image onto a 40×40 grid (nearest neighbour, no low-pass
//!    filter, so every sample is an exact source color)
//! 2. Count exact `(r, g, b)` triples, skipping samples with alpha 0
//! 3. Return the most frequent triple
//!
//! This is a cheap approximation over 1600 samples, not a histogram of the
//! full-resolution image.
//!
//! ## Tie-break
//!
//! When several triples share the highest count, the one first encountered
//! in the row-major scan (top-left to bottom-right) wins.
//!
//! ## Fallback
//!
//! A grid without a single opaque sample yields neutral gray `#808080`.

use image::{DynamicImage, imageops::FilterType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::RoundelError;
use crate::source::ImageRef;

/// Edge length of the sampling grid.
pub const SAMPLE_GRID: u32 = 40;

/// An 8-bit RGB color with its `#rrggbb` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub hex: String,
}

impl ColorSample {
    /// Neutral gray returned when nothing opaque was sampled.
    pub const FALLBACK_RGB: [u8; 3] = [128, 128, 128];

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r,
            g,
            b,
            hex: format!("#{:02x}{:02x}{:02x}", r, g, b),
        }
    }

    pub fn fallback() -> Self {
        let [r, g, b] = Self::FALLBACK_RGB;
        Self::from_rgb(r, g, b)
    }

    /// Parse `#rrggbb`, `rrggbb` or `#rgb` (any case).
    pub fn parse_hex(input: &str) -> Result<Self, RoundelError> {
        let digits = input.trim().trim_start_matches('#');
        let invalid = || RoundelError::InvalidParameter(format!("Invalid hex color '{}'", input));

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let expanded: String = match digits.len() {
            6 => digits.to_string(),
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            _ => return Err(invalid()),
        };
        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::from_rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn rgb(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for ColorSample {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Most frequent opaque color on the 40×40 sampling grid.
pub fn dominant_color(image: &DynamicImage) -> ColorSample {
    let grid = image
        .resize_exact(SAMPLE_GRID, SAMPLE_GRID, FilterType::Nearest)
        .to_rgba8();

    // Counts in first-encounter order so ties resolve to the earliest triple
    let mut index: HashMap<[u8; 3], usize> = HashMap::new();
    let mut counts: Vec<([u8; 3], u32)> = Vec::new();

    for pixel in grid.pixels() {
        let [r, g, b, a] = pixel.0;
        if a == 0 {
            continue;
        }
        let key = [r, g, b];
        match index.get(&key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(key, counts.len());
                counts.push((key, 1));
            }
        }
    }

    let mut best: Option<([u8; 3], u32)> = None;
    for &(key, count) in &counts {
        if best.is_none_or(|(_, max)| count > max) {
            best = Some((key, count));
        }
    }

    match best {
        Some(([r, g, b], _)) => ColorSample::from_rgb(r, g, b),
        None => ColorSample::fallback(),
    }
}

/// Average color of the whole image, weighted by alpha.
///
/// Equivalent to drawing the image into a single pixel; a quicker, blurrier
/// alternative to [`dominant_color`].
pub fn average_color(image: &DynamicImage) -> ColorSample {
    let rgba = image.to_rgba8();
    let (mut r, mut g, mut b, mut weight) = (0u64, 0u64, 0u64, 0u64);
    for pixel in rgba.pixels() {
        let [pr, pg, pb, pa] = pixel.0;
        let a = pa as u64;
        r += pr as u64 * a;
        g += pg as u64 * a;
        b += pb as u64 * a;
        weight += a;
    }
    if weight == 0 {
        return ColorSample::fallback();
    }
    let channel = |sum: u64| ((sum + weight / 2) / weight) as u8;
    ColorSample::from_rgb(channel(r), channel(g), channel(b))
}

/// Decode `image` and extract its dominant color.
pub async fn extract_dominant(image: &ImageRef) -> Result<ColorSample, RoundelError> {
    let image = image.clone();
    tokio::task::spawn_blocking(move || {
        let bitmap = image.decode()?;
        Ok(dominant_color(&bitmap))
    })
    .await
    .map_err(|e| RoundelError::ImageLoad(format!("Color task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    /// Solid square of `color` surrounded by a transparent border.
    fn bordered(color: [u8; 3], inner: u32, border: u32) -> DynamicImage {
        let size = inner + 2 * border;
        let mut img = RgbaImage::new(size, size);
        for y in border..border + inner {
            for x in border..border + inner {
                img.put_pixel(x, y, Rgba([color[0], color[1], color[2], 255]));
            }
        }
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_solid_color_with_transparent_border() {
        for border in [0, 1, 7, 40, 100] {
            let sample = dominant_color(&bordered([0x12, 0xab, 0xef], 80, border));
            assert_eq!(sample.hex, "#12abef", "border {}", border);
        }
    }

    #[test]
    fn test_all_transparent_is_gray() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(50, 50));
        assert_eq!(dominant_color(&img).hex, "#808080");
        assert_eq!(average_color(&img).hex, "#808080");
    }

    #[test]
    fn test_majority_wins() {
        let mut img = RgbaImage::from_pixel(40, 40, Rgba([255, 0, 0, 255]));
        for y in 0..10 {
            for x in 0..40 {
                img.put_pixel(x, y, Rgba([0, 0, 255, 255]));
            }
        }
        let sample = dominant_color(&DynamicImage::ImageRgba8(img));
        assert_eq!(sample.rgb(), [255, 0, 0]);
    }

    #[test]
    fn test_tie_goes_to_first_encountered() {
        // Top half green, bottom half blue: equal counts, green is scanned first
        let mut img = RgbaImage::from_pixel(40, 40, Rgba([0, 0, 255, 255]));
        for y in 0..20 {
            for x in 0..40 {
                img.put_pixel(x, y, Rgba([0, 255, 0, 255]));
            }
        }
        assert_eq!(dominant_color(&DynamicImage::ImageRgba8(img)).hex, "#00ff00");
    }

    #[test]
    fn test_semi_transparent_samples_count() {
        let img = RgbaImage::from_pixel(40, 40, Rgba([9, 8, 7, 1]));
        assert_eq!(dominant_color(&DynamicImage::ImageRgba8(img)).hex, "#090807");
    }

    #[test]
    fn test_average_color() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([200, 100, 50, 255]));
        assert_eq!(average_color(&DynamicImage::ImageRgba8(img)).rgb(), [100, 50, 25]);
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(ColorSample::parse_hex("#FF8000").unwrap().rgb(), [255, 128, 0]);
        assert_eq!(ColorSample::parse_hex("0a0b0c").unwrap().hex, "#0a0b0c");
        assert_eq!(ColorSample::parse_hex("#abc").unwrap().hex, "#aabbcc");
        assert!(ColorSample::parse_hex("#12345").is_err());
        assert!(ColorSample::parse_hex("#zzzzzz").is_err());
    }

    #[tokio::test]
    async fn test_extract_dominant_decode_error() {
        let err = extract_dominant(&ImageRef::data_url("image/png", b"nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, RoundelError::ImageLoad(_)));
    }
}
