//! Edit pipeline orchestration.
//!
//! Runs one [`EditRequest`] over one source buffer and returns the final
//! bytes with the content type to report. Each stage hands a new image to the
//! next; nothing is mutated in place.
//!
//! ## Stages
//!
//! ```text
//! Decoded → Resized → FormatSelected → SizeOptimized → Rotated → Encoded
//! ```
//!
//! | Stage | Skipped when |
//! |---|---|
//! | Resized | no resize box and no percentage |
//! | FormatSelected | request names no format (configured default is used) |
//! | SizeOptimized | `targetSize` absent or zero |
//! | Rotated | rotation normalizes to 0° |
//!
//! ## Rotation and the size target
//!
//! The size search runs on the unrotated image. Rotation is applied afterwards
//! and the result is re-encoded at the quality the search chose, so the
//! reported content type always matches the bytes. With no rotation the
//! search's own buffer is returned untouched. A rotation can move the final
//! size away from the target, most visibly for non-right angles whose canvas
//! grows.
//!
//! ## Limits
//!
//! The output dimensions, including any canvas growth from rotation, are
//! checked against [`LimitsConfig`] before any pixel work starts, along with
//! any per-codec cap such as WebP's 16383 px side.

use crate::config::{LimitsConfig, ToolConfig};
use crate::imaging::{
    BackendError, Dimensions, ImageBackend, OutputFormat, Quality, RustBackend, SearchConfig,
    Trial, calculate_resize, calculate_rotated_canvas, encode_image, get_dimensions,
    optimize_for_size, resize_image, rotate_image,
};
use crate::request::{EditRequest, RequestError};
use crate::storage::StorageError;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum EditError {
    #[error("{0}")]
    Imaging(#[from] BackendError),
    #[error("{0}")]
    Request(#[from] RequestError),
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("Output {width}x{height} exceeds limits ({reason})")]
    LimitExceeded {
        width: u32,
        height: u32,
        reason: String,
    },
}

impl EditError {
    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            EditError::Imaging(BackendError::Decode(_)) => "DECODE_ERROR",
            EditError::Imaging(BackendError::Encode { .. }) => "ENCODE_ERROR",
            EditError::Imaging(BackendError::ProcessingFailed(_)) => "INTERNAL_ERROR",
            EditError::Request(RequestError::UnsupportedFormat(_)) => "UNSUPPORTED_FORMAT",
            EditError::Request(_) => "INVALID_REQUEST",
            EditError::Storage(StorageError::InvalidId(_)) => "INVALID_REQUEST",
            EditError::Storage(StorageError::NotFound { .. }) => "FILE_NOT_FOUND",
            EditError::Storage(StorageError::Io(_)) => "INTERNAL_ERROR",
            EditError::LimitExceeded { .. } => "LIMIT_EXCEEDED",
        }
    }

    /// Every failure is reported to the client as a bad request.
    pub fn http_status(&self) -> u16 {
        400
    }
}

/// Settings the pipeline reads from [`ToolConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct EditConfig {
    pub default_format: OutputFormat,
    /// DPI for physical-unit resizes that name none.
    pub default_dpi: f64,
    pub search: SearchConfig,
    pub limits: LimitsConfig,
    pub avif_speed: u8,
}

impl EditConfig {
    pub fn from_tool_config(config: &ToolConfig) -> Self {
        Self {
            default_format: config.defaults.output_format(),
            default_dpi: config.defaults.dpi,
            search: config.optimizer.search_config(),
            limits: config.limits.clone(),
            avif_speed: config.encoding.avif_speed,
        }
    }
}

impl Default for EditConfig {
    fn default() -> Self {
        Self::from_tool_config(&ToolConfig::default())
    }
}

/// What the size search did.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeReport {
    pub target_kb: f64,
    pub trials: Vec<Trial>,
    /// False when every trial was over the target and the smallest was kept.
    pub target_met: bool,
}

/// Final output of one edit.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub format: OutputFormat,
    /// `None` when the codec default was used.
    pub quality: Option<Quality>,
    pub dimensions: Dimensions,
    pub optimization: Option<OptimizeReport>,
}

/// Run an edit with the production backend.
pub fn edit(
    source: &[u8],
    request: &EditRequest,
    config: &EditConfig,
) -> Result<EditOutcome, EditError> {
    let backend = RustBackend::with_avif_speed(config.avif_speed);
    edit_with_backend(&backend, source, request, config)
}

/// Run an edit using a specific backend (allows testing with mock).
pub fn edit_with_backend(
    backend: &impl ImageBackend,
    source: &[u8],
    request: &EditRequest,
    config: &EditConfig,
) -> Result<EditOutcome, EditError> {
    // Decoded. Intrinsic dimensions come from the header only when a
    // percentage needs them before the full decode.
    let needs_metadata = request
        .resize
        .as_ref()
        .is_some_and(|spec| spec.percentage.is_some());
    let intrinsic = if needs_metadata {
        Some(get_dimensions(backend, source)?)
    } else {
        None
    };
    let decoded = backend.decode(source)?;
    let source_dims = intrinsic.unwrap_or_else(|| Dimensions::of(&decoded));
    debug!(width = source_dims.width, height = source_dims.height, "decoded");

    let target = request
        .resize
        .as_ref()
        .and_then(|spec| calculate_resize(spec, source_dims));
    let format = request.format.unwrap_or(config.default_format);
    let output_dims = target.unwrap_or(source_dims.as_tuple());
    check_limits(output_dims, format, &config.limits)?;
    check_limits(
        calculate_rotated_canvas(output_dims, request.rotation),
        format,
        &config.limits,
    )?;

    // Resized
    let resized = match target {
        Some(target) => resize_image(backend, decoded, target)?,
        None => decoded,
    };

    // FormatSelected
    debug!(%format, "format selected");

    // SizeOptimized
    let (quality, searched, optimization) = match request.target_size_kb {
        Some(target_kb) => {
            if request.quality.is_some() {
                debug!("explicit quality ignored in favour of targetSize");
            }
            let search = optimize_for_size(backend, &resized, format, target_kb, &config.search)?;
            let report = OptimizeReport {
                target_kb,
                trials: search.trials,
                target_met: search.target_met,
            };
            (search.result.quality, Some(search.result), Some(report))
        }
        None => (request.quality, None, None),
    };

    // Rotated
    let rotated = rotate_image(backend, resized, request.rotation)?;
    let dimensions = Dimensions::of(&rotated);

    // Encoded
    let encoded = match searched {
        Some(result) if request.rotation.is_identity() => result,
        _ => encode_image(backend, &rotated, format, quality)?,
    };

    info!(
        %format,
        quality = quality.map(Quality::value),
        width = dimensions.width,
        height = dimensions.height,
        size_bytes = encoded.size_bytes(),
        "edit complete"
    );

    Ok(EditOutcome {
        bytes: encoded.bytes,
        content_type: format.content_type(),
        format,
        quality,
        dimensions,
        optimization,
    })
}

fn check_limits(
    (width, height): (u32, u32),
    format: OutputFormat,
    limits: &LimitsConfig,
) -> Result<(), EditError> {
    let exceeded = |reason: String| EditError::LimitExceeded {
        width,
        height,
        reason,
    };
    if width > limits.max_dimension || height > limits.max_dimension {
        return Err(exceeded(format!(
            "max dimension {}",
            limits.max_dimension
        )));
    }
    if width as u64 * height as u64 > limits.max_pixels {
        return Err(exceeded(format!("max {} pixels", limits.max_pixels)));
    }
    if let Some(max) = format
        .max_dimension()
        .filter(|&max| width > max || height > max)
    {
        return Err(exceeded(format!("{format} max dimension {max}")));
    }
    Ok(())
}
