//! # Rendering Module
//!
//! Pixel-level stages of the logo pipeline.
//!
//! ## Modules
//!
//! - [`crop`]: Square crop with optional circular mask
//! - [`color`]: Dominant color of a cropped image
//! - [`blur`]: Resolution-aware blur baking
//! - [`snapshot`]: Layer tree and print-resolution raster snapshot
//!
//! ## Usage Example
//!
//! ```
//! use image::{DynamicImage, Rgba, RgbaImage};
//! use roundel::print::Shape;
//! use roundel::render::{color, crop::{self, CropRegion}};
//!
//! let photo = DynamicImage::ImageRgba8(RgbaImage::from_pixel(200, 300, Rgba([40, 90, 200, 255])));
//!
//! let cropped = crop::crop_bitmap(&photo, CropRegion::new(0, 0, 200, 200, Shape::Round))?;
//! assert_eq!(cropped.dimensions(), (200, 200));
//!
//! let border = color::dominant_color(&DynamicImage::ImageRgba8(cropped));
//! assert_eq!(border.hex, "#285ac8");
//! # Ok::<(), roundel::RoundelError>(())
//! ```

pub mod blur;
pub mod color;
pub mod crop;
pub mod snapshot;
