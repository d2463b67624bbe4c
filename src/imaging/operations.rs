//! High-level image operations.
//!
//! These functions combine calculations with backend execution. Each one is a
//! stage: it takes an image (or bytes) and returns a new value, never touching
//! its input. The pipeline chains them.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{calculate_percentage_dimensions, calculate_target_dimensions};
use super::params::{
    EncodeParams, EncodedResult, OutputFormat, Quality, ResizeParams, ResizeSpec, Rotation,
};
use super::units::to_pixels;
use image::DynamicImage;
use tracing::{debug, warn};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get intrinsic image dimensions from encoded bytes.
pub fn get_dimensions(backend: &impl ImageBackend, bytes: &[u8]) -> Result<Dimensions> {
    backend.identify(bytes)
}

/// Output dimensions for a resize, or `None` when nothing was asked for.
///
/// `source` is only consulted for aspect ratio and percentages.
pub fn calculate_resize(spec: &ResizeSpec, source: Dimensions) -> Option<(u32, u32)> {
    if spec.is_empty() {
        return None;
    }
    if let Some(percentage) = spec.percentage {
        return Some(calculate_percentage_dimensions(
            source.as_tuple(),
            percentage,
        ));
    }
    let width = to_pixels(spec.width, spec.unit, spec.dpi);
    let height = to_pixels(spec.height, spec.unit, spec.dpi);
    Some(calculate_target_dimensions(
        source.as_tuple(),
        width,
        height,
        spec.fit,
    ))
}

/// Resize to `target`, handing the input back untouched when it already has
/// those dimensions.
pub fn resize_image(
    backend: &impl ImageBackend,
    image: DynamicImage,
    target: (u32, u32),
) -> Result<DynamicImage> {
    let current = Dimensions::of(&image).as_tuple();
    if current == target {
        debug!(width = target.0, height = target.1, "resize is a no-op");
        return Ok(image);
    }
    debug!(from = ?current, to = ?target, "resizing");
    backend.resize(
        &image,
        &ResizeParams {
            width: target.0,
            height: target.1,
        },
    )
}

/// Encode into `format`. `None` quality defers to the codec default.
pub fn encode_image(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    format: OutputFormat,
    quality: Option<Quality>,
) -> Result<EncodedResult> {
    let bytes = backend.encode(image, &EncodeParams { format, quality })?;
    Ok(EncodedResult {
        bytes,
        format,
        quality,
    })
}

/// Rotate clockwise. Identity rotations return the input as-is.
pub fn rotate_image(
    backend: &impl ImageBackend,
    image: DynamicImage,
    rotation: Rotation,
) -> Result<DynamicImage> {
    if rotation.is_identity() {
        return Ok(image);
    }
    debug!(degrees = rotation.degrees(), "rotating");
    backend.rotate(&image, rotation)
}

/// Bounds and stopping rule for the size-target search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    pub min_quality: u32,
    pub max_quality: u32,
    pub max_iterations: u32,
    /// Stop as soon as a trial lands this close to the target, in KB.
    pub tolerance_kb: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_quality: 10,
            max_quality: 100,
            max_iterations: 7,
            tolerance_kb: 2.0,
        }
    }
}

/// One encode attempted by the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trial {
    pub quality: Quality,
    pub size_bytes: usize,
}

/// Outcome of a size-target search.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeSearch {
    /// Highest-quality result within budget, or the last trial if none was.
    pub result: EncodedResult,
    pub trials: Vec<Trial>,
    /// False when every trial exceeded the target.
    pub target_met: bool,
}

/// Binary search over encoder quality for the best result that fits in
/// `target_kb`.
///
/// Every trial encodes `image` itself, never a previous trial's output, so
/// the search is deterministic for a given input. For PNG the same loop runs;
/// the backend maps quality onto compression level.
///
/// When no trial fits, the last trial produced is returned with
/// `target_met = false` instead of failing.
pub fn optimize_for_size(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    format: OutputFormat,
    target_kb: f64,
    config: &SearchConfig,
) -> Result<SizeSearch> {
    let (mut min, mut max) = (config.min_quality, config.max_quality);
    let mut best: Option<EncodedResult> = None;
    let mut last_over: Option<EncodedResult> = None;
    let mut trials = Vec::new();

    for _ in 0..config.max_iterations {
        if min > max {
            break;
        }
        let quality = Quality::new((min + max) / 2);
        let result = encode_image(backend, image, format, Some(quality))?;
        let size_kb = result.size_kb();
        trials.push(Trial {
            quality,
            size_bytes: result.size_bytes(),
        });
        debug!(
            quality = quality.value(),
            size_kb,
            target_kb,
            "size search trial"
        );

        let close_enough = (size_kb - target_kb).abs() < config.tolerance_kb;
        if size_kb > target_kb {
            max = quality.value().saturating_sub(1);
            last_over = Some(result);
        } else {
            min = quality.value() + 1;
            best = Some(result);
        }
        if close_enough {
            break;
        }
    }

    match (best, last_over) {
        (Some(result), _) => Ok(SizeSearch {
            result,
            trials,
            target_met: true,
        }),
        (None, Some(result)) => {
            warn!(
                target_kb,
                smallest_kb = result.size_kb(),
                "size target unreachable, returning smallest trial"
            );
            Ok(SizeSearch {
                result,
                trials,
                target_met: false,
            })
        }
        (None, None) => Err(BackendError::ProcessingFailed(
            "size search ran no trials".into(),
        )),
    }
}
