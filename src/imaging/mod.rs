//! Image processing, pure Rust apart from libwebp.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Resize** | Lanczos3 via `image` |
//! | **Rotate** | `image` for right angles, `imageproc` otherwise |
//! | **Encode** | `image` (JPEG, PNG, AVIF), `webp` (lossy WebP) |
//! | **Size target** | binary search over quality ([`optimize_for_size`]) |
//!
//! The module is split into:
//! - **Units**: Physical length → pixel conversion
//! - **Calculations**: Pure functions for dimension and encoder math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level stages combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;
mod units;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    calculate_contain_dimensions, calculate_percentage_dimensions, calculate_rotated_canvas,
    calculate_stretch_dimensions, png_compression_level,
};
pub use operations::{
    SearchConfig, SizeSearch, Trial, calculate_resize, encode_image, get_dimensions,
    optimize_for_size, resize_image, rotate_image,
};
pub use params::{
    DEFAULT_DPI, EncodeParams, EncodedResult, FitMode, OutputFormat, Quality, ResizeParams,
    ResizeSpec, Rotation, UnsupportedFormat,
};
pub use rust_backend::RustBackend;
pub use units::{Unit, to_pixels};
