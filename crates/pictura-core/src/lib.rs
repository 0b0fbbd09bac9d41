//! Shared image primitives for Pictura
//!
//! Aspect ratios, resolution tiers, the canonical dimension table and the
//! `ImageResult` produced by every provider call.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod image;
mod preset;
mod ratio;

pub use image::ImageResult;
pub use preset::Preset;
pub use ratio::{Dimensions, ImageSize, ParseError, SupportedRatio, dimensions_for_ratio};
