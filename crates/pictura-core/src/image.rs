use bytes::Bytes;

use crate::ratio::{Dimensions, SupportedRatio};

/// A single image returned by a provider
///
/// The binary payload is reference counted, so cloning a result (or
/// threading its data into a follow-up request) never copies the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResult {
    /// Encoded image bytes as returned by the vendor
    pub data: Bytes,
    /// Aspect ratio the image was produced for
    pub ratio: SupportedRatio,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Name of the provider that produced the image
    pub provider: String,
    /// Full vendor model identifier
    pub model: String,
}

impl ImageResult {
    /// Pixel dimensions of the image
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }
}
