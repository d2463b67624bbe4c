//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the five operations every backend must
//! support: identify, decode, resize, rotate and encode. Every operation takes
//! its input by reference and returns a new value, so a decoded image can be
//! encoded any number of times without one call affecting the next. The
//! size-target search depends on that.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::{EncodeParams, ResizeParams, Rotation};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode {format}: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn of(image: &DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Trait for image processing backends.
///
/// Implementations must be free of per-request state so one backend can serve
/// concurrent requests.
pub trait ImageBackend: Sync {
    /// Read intrinsic dimensions from encoded bytes without a full decode.
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode encoded bytes into pixels.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Resize to exactly the given dimensions.
    fn resize(&self, image: &DynamicImage, params: &ResizeParams)
    -> Result<DynamicImage, BackendError>;

    /// Rotate clockwise.
    fn rotate(&self, image: &DynamicImage, rotation: Rotation)
    -> Result<DynamicImage, BackendError>;

    /// Encode into a container format.
    fn encode(&self, image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError>;
}
