//! # Print Layout
//!
//! This module defines the physical dimensions of the printed logo for each
//! supported shape.
//!
//! ## Layouts
//!
//! | Shape | Page | Ring | Front |
//! |-------|------|------|-------|
//! | Round | 108.42mm | 98.42mm | 90mm |
//! | Square | 105.833mm | 98.42mm | 90mm |
//!
//! The live preview is sized in CSS units at the reference resolution of
//! 96 px per inch, so the same millimetre values drive the on-screen preview,
//! the raster snapshot and the PDF page.
//!
//! ## Usage
//!
//! ```
//! use roundel::print::{PrintLayout, Shape};
//!
//! let layout = PrintLayout::for_shape(Shape::Round);
//! println!("Page: {}mm ({:.2} CSS px)", layout.page_mm, layout.page_css_px());
//! ```

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// CSS reference resolution.
pub const CSS_DPI: f32 = 96.0;

/// PostScript points per inch, used for PDF page boxes.
pub const POINTS_PER_INCH: f32 = 72.0;

const MM_PER_INCH: f32 = 25.4;

/// Outline of the logo and of its crop mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// Circular logo with a circular alpha mask.
    #[default]
    #[serde(alias = "circle")]
    #[value(alias = "circle")]
    Round,
    /// Square logo, fully opaque.
    Square,
}

impl Shape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Round => "round",
            Self::Square => "square",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Shape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "round" | "circle" => Ok(Self::Round),
            "square" => Ok(Self::Square),
            other => Err(format!("Unknown shape '{}'. Use 'round' or 'square'", other)),
        }
    }
}

/// # Print Layout
///
/// Physical sizes of the page and of the layers drawn on it. Every layer is
/// centred on the page.
///
/// ## Calculations
///
/// ```text
/// css_px_per_mm = 96 / 25.4 ≈ 3.78
/// page_css_px   = page_mm * css_px_per_mm
/// page_points   = page_mm * 72 / 25.4
///
/// For SQUARE:
///   page_css_px = 105.833 * 3.78 ≈ 400
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintLayout {
    /// Layout name
    pub name: &'static str,

    /// Shape this layout belongs to
    pub shape: Shape,

    /// Page edge length, also the extent of the blurred back layer
    pub page_mm: f32,

    /// Edge length of the color ring
    pub ring_mm: f32,

    /// Edge length of the cropped front image
    pub front_mm: f32,
}

impl PrintLayout {
    /// 10.842cm round logo.
    pub const ROUND: Self = Self {
        name: "Round logo",
        shape: Shape::Round,
        page_mm: 108.42,
        ring_mm: 98.42,
        front_mm: 90.0,
    };

    /// Square logo, 400 CSS px page.
    pub const SQUARE: Self = Self {
        name: "Square logo",
        shape: Shape::Square,
        page_mm: 105.833,
        ring_mm: 98.42,
        front_mm: 90.0,
    };

    pub fn for_shape(shape: Shape) -> Self {
        match shape {
            Shape::Round => Self::ROUND,
            Shape::Square => Self::SQUARE,
        }
    }

    /// CSS pixels per millimetre at 96 DPI.
    #[inline]
    pub fn css_px_per_mm() -> f32 {
        CSS_DPI / MM_PER_INCH
    }

    /// Convert millimetres to CSS pixels
    #[inline]
    pub fn mm_to_css_px(mm: f32) -> f32 {
        mm * Self::css_px_per_mm()
    }

    /// Page edge in CSS pixels (the rendered width of the capture region).
    #[inline]
    pub fn page_css_px(&self) -> f32 {
        Self::mm_to_css_px(self.page_mm)
    }

    /// Page edge in PDF points.
    #[inline]
    pub fn page_points(&self) -> f32 {
        mm_to_points(self.page_mm)
    }

    /// Snapshot edge in device pixels at the given CSS scale.
    pub fn snapshot_px(&self, scale: f32) -> u32 {
        (self.page_css_px() * scale).round().max(1.0) as u32
    }

    /// Offset and edge of a centred layer, in device pixels at `scale`.
    pub fn layer_box_px(&self, edge_mm: f32, scale: f32) -> (u32, u32) {
        let page = self.snapshot_px(scale);
        let edge = ((Self::mm_to_css_px(edge_mm) * scale).round() as u32).clamp(1, page);
        ((page - edge) / 2, edge)
    }
}

impl Default for PrintLayout {
    fn default() -> Self {
        Self::ROUND
    }
}

/// Convert millimetres to PDF points
#[inline]
pub fn mm_to_points(mm: f32) -> f32 {
    mm * POINTS_PER_INCH / MM_PER_INCH
}

/// Convert PDF points to millimetres
#[inline]
pub fn points_to_mm(points: f32) -> f32 {
    points * MM_PER_INCH / POINTS_PER_INCH
}

// ============================================================================
// TESTS
// ============================================================================
