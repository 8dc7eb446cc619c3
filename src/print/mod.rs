//! # Print Module
//!
//! This module provides the physical layout of the printed logo.
//!
//! ## Modules
//!
//! - [`config`]: Shape and page sizing

pub mod config;

pub use config::{PrintLayout, Shape};
