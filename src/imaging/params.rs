//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides what to produce) and the [`backend`](super::backend) (which
//! does the actual pixel work). The separation lets the optimizer and the
//! pipeline run against a mock backend in tests.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`OutputFormat`]: The four container formats we can write.
//! - [`FitMode`]: How a requested box is reconciled with the source aspect.
//! - [`Rotation`]: Clockwise rotation normalized into `0..360`.
//! - [`ResizeSpec`]: A resize as requested: lengths in some unit, or a percentage.
//! - [`ResizeParams`] / [`EncodeParams`]: Full specification for one backend call.
//! - [`EncodedResult`]: Bytes produced by one encode, with what produced them.

use super::units::Unit;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

/// A format string that does not name one of the supported encoders.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported format: {0}")]
pub struct UnsupportedFormat(pub String);

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    WebP,
    Avif,
}

impl OutputFormat {
    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Avif => "image/avif",
        }
    }

    /// Quality used when the caller leaves it to the codec.
    ///
    /// PNG has no quality knob; `None` there means the encoder's default
    /// compression level.
    pub fn default_quality(self) -> Option<Quality> {
        match self {
            Self::Jpeg => Some(Quality(80)),
            Self::Png => None,
            Self::WebP => Some(Quality(80)),
            Self::Avif => Some(Quality(50)),
        }
    }

    /// Widest side the codec can write, when it caps below any sane limit.
    pub fn max_dimension(self) -> Option<u32> {
        match self {
            Self::WebP => Some(WEBP_MAX_DIMENSION),
            Self::Jpeg | Self::Png | Self::Avif => None,
        }
    }
}

/// libwebp rejects either side above this.
pub const WEBP_MAX_DIMENSION: u32 = 16383;

impl FromStr for OutputFormat {
    type Err = UnsupportedFormat;

    /// Accepts `jpg` and `webm` as aliases for `jpeg` and `webp`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" | "webm" => Ok(Self::WebP),
            "avif" => Ok(Self::Avif),
            _ => Err(UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aspect handling when both a width and a height are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    /// Preserve aspect ratio and fit inside the box. One axis may end up
    /// smaller than requested.
    #[default]
    Contain,
    /// Ignore aspect ratio and produce exactly the requested box.
    Stretch,
}

/// Clockwise rotation in whole degrees, always within `0..360`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rotation(u32);

impl Rotation {
    /// Normalize any integer angle with Euclidean modulo, so `450 → 90` and
    /// `-90 → 270`.
    pub fn from_degrees(degrees: i64) -> Self {
        Self(degrees.rem_euclid(360) as u32)
    }

    pub fn degrees(self) -> u32 {
        self.0
    }

    pub fn is_identity(self) -> bool {
        self.0 == 0
    }

    /// True for 90, 180 and 270, which rotate losslessly.
    pub fn is_right_angle(self) -> bool {
        self.0 % 90 == 0
    }
}

/// DPI assumed when a physical-unit resize names none.
pub const DEFAULT_DPI: f64 = 72.0;

/// A resize as the caller expressed it.
///
/// When `percentage` is set, `width` and `height` are ignored and both axes
/// are derived from the source dimensions instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeSpec {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub unit: Unit,
    pub dpi: f64,
    /// 1–100.
    pub percentage: Option<f64>,
    pub fit: FitMode,
}

impl ResizeSpec {
    /// Nothing to do: no box and no percentage.
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.percentage.is_none()
    }
}

impl Default for ResizeSpec {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            unit: Unit::Px,
            dpi: DEFAULT_DPI,
            percentage: None,
            fit: FitMode::Contain,
        }
    }
}

/// Parameters for an exact-size resize. Fit has already been resolved into
/// concrete dimensions by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeParams {
    pub width: u32,
    pub height: u32,
}

/// Parameters for one encode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub format: OutputFormat,
    /// `None` defers to the codec default.
    pub quality: Option<Quality>,
}

/// The output of one encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedResult {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    /// Quality the bytes were produced at. `None` means the codec default.
    pub quality: Option<Quality>,
}

impl EncodedResult {
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn size_kb(&self) -> f64 {
        self.bytes.len() as f64 / 1024.0
    }
}
