//! # Roundel - Print-Accurate Photo Logos
//!
//! Roundel turns a photo into a circular or square "logo" sized for print.
//! It provides:
//!
//! - **Cropping**: square crops with an optional hard circular mask
//! - **Color**: dominant-color extraction for the border ring
//! - **Blur baking**: resolution-aware blur for the background layer
//! - **Export**: 4× snapshots embedded in a physically sized PDF
//! - **Relay**: cross-origin image fetching over HTTP
//!
//! ## Quick Start
//!
//! ```no_run
//! use roundel::{
//!     Shape,
//!     export::ExportCompositor,
//!     pipeline::Pipeline,
//!     render::crop::CropRegion,
//!     source::ImageRef,
//! };
//!
//! # async fn example() -> Result<(), roundel::RoundelError> {
//! let pipeline = Pipeline::new(ExportCompositor::with_defaults()?);
//!
//! // Load and crop the photo
//! let photo = pipeline.load(ImageRef::from_location("photo.jpg")).await?;
//! let region = CropRegion::centered(photo.width(), photo.height(), Shape::Round);
//! let outcome = pipeline.crop(region).await?;
//! println!("border color {}", outcome.color.hex);
//!
//! // 108.42mm round PDF
//! pipeline.export().await?.save("PrintCopy.pdf")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`source`] | Image handles and decoded sources |
//! | [`relay`] | Cross-origin image relay |
//! | [`render`] | Crop, color, blur and snapshot |
//! | [`export`] | Export compositor and PDF pages |
//! | [`print`] | Physical print layouts |
//! | [`session`] | Editing state and stale-result tickets |
//! | [`pipeline`] | Async controller over a session |
//! | [`capability`] | Optional host capabilities (eyedropper) |
//! | [`server`] | HTTP API |
//! | [`error`] | Error types |

pub mod capability;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod print;
pub mod relay;
pub mod render;
pub mod server;
pub mod session;
pub mod source;

// Re-exports for convenience
pub use error::RoundelError;
pub use print::{PrintLayout, Shape};
