//! Edit request parsing and validation.
//!
//! The JSON body is deserialized into loosely-typed wire structs, then checked
//! and converted into an [`EditRequest`]. Nothing past this module sees a raw
//! format string or an out-of-range number.
//!
//! ```json
//! { "fileId": "abc123",
//!   "action": {
//!      "resize": {"width": 800, "height": 600, "unit": "px", "dpi": 72},
//!      "percentage": 50,
//!      "targetSize": 100,
//!      "quality": 90,
//!      "format": "jpeg",
//!      "rotate": 90,
//!      "maintainAspectRatio": true
//!   }
//! }
//! ```
//!
//! Unknown action keys are ignored. `null` is treated as absent.

use crate::imaging::{FitMode, OutputFormat, Quality, ResizeSpec, Rotation, Unit, UnsupportedFormat};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid request body: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Invalid request: {0}")]
    InvalidValue(String),
}

impl From<UnsupportedFormat> for RequestError {
    fn from(err: UnsupportedFormat) -> Self {
        RequestError::UnsupportedFormat(err.0)
    }
}

/// Request body as sent by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditBody {
    pub file_id: String,
    #[serde(default)]
    pub action: ActionBody,
}

/// The `action` object of a request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionBody {
    pub resize: Option<ResizeBody>,
    pub percentage: Option<f64>,
    /// Target output size in KB.
    pub target_size: Option<f64>,
    pub quality: Option<f64>,
    pub format: Option<String>,
    /// Clockwise degrees.
    pub rotate: Option<f64>,
    pub maintain_aspect_ratio: Option<bool>,
}

/// The `action.resize` object of a request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResizeBody {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub unit: Option<String>,
    pub dpi: Option<f64>,
}

/// A validated edit, ready for the pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditRequest {
    /// `None` when neither a resize box nor a percentage was given.
    pub resize: Option<ResizeSpec>,
    /// Target output size in KB. Zero is normalized to `None`.
    pub target_size_kb: Option<f64>,
    pub quality: Option<Quality>,
    /// `None` defers to the configured default format.
    pub format: Option<OutputFormat>,
    pub rotation: Rotation,
}

/// Parse a raw JSON body into the file id and the validated edit.
///
/// `default_dpi` applies when the resize block carries no `dpi`.
pub fn parse_request(body: &[u8], default_dpi: f64) -> Result<(String, EditRequest), RequestError> {
    let body: EditBody = serde_json::from_slice(body)?;
    let request = body.action.into_request(default_dpi)?;
    Ok((body.file_id, request))
}

impl ActionBody {
    /// Validate every field and convert into domain types.
    pub fn into_request(self, default_dpi: f64) -> Result<EditRequest, RequestError> {
        let quality = self
            .quality
            .map(|q| ranged("quality", q, 1.0, 100.0))
            .transpose()?
            .map(|q| Quality::new(q.round() as u32));

        let target_size_kb = match self.target_size {
            Some(kb) if !kb.is_finite() || kb < 0.0 => {
                return Err(invalid(format!("targetSize must be >= 0, got {kb}")));
            }
            Some(kb) if kb > 0.0 => Some(kb),
            _ => None,
        };

        let format = self
            .format
            .as_deref()
            .map(str::parse::<OutputFormat>)
            .transpose()?;

        let rotation = match self.rotate {
            Some(deg) if !deg.is_finite() || deg.fract() != 0.0 => {
                return Err(invalid(format!(
                    "rotate must be a whole number of degrees, got {deg}"
                )));
            }
            Some(deg) => Rotation::from_degrees(deg as i64),
            None => Rotation::default(),
        };

        let fit = match self.maintain_aspect_ratio {
            Some(false) => FitMode::Stretch,
            _ => FitMode::Contain,
        };
        let resize = resize_spec(self.resize, self.percentage, fit, default_dpi)?;

        Ok(EditRequest {
            resize,
            target_size_kb,
            quality,
            format,
            rotation,
        })
    }
}

fn resize_spec(
    body: Option<ResizeBody>,
    percentage: Option<f64>,
    fit: FitMode,
    default_dpi: f64,
) -> Result<Option<ResizeSpec>, RequestError> {
    let percentage = percentage
        .map(|p| ranged("percentage", p, 1.0, 100.0))
        .transpose()?;
    let body = body.unwrap_or_default();

    let width = body.width.map(|w| positive("resize.width", w)).transpose()?;
    let height = body.height.map(|h| positive("resize.height", h)).transpose()?;
    let dpi = match body.dpi {
        Some(dpi) => positive("resize.dpi", dpi)?,
        None => default_dpi,
    };
    let unit = body.unit.as_deref().map(Unit::parse).unwrap_or_default();

    let spec = ResizeSpec {
        width,
        height,
        unit,
        dpi,
        percentage,
        fit,
    };
    Ok((!spec.is_empty()).then_some(spec))
}

fn ranged(field: &str, value: f64, min: f64, max: f64) -> Result<f64, RequestError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(invalid(format!("{field} must be {min}-{max}, got {value}")))
    }
}

fn positive(field: &str, value: f64) -> Result<f64, RequestError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(invalid(format!("{field} must be positive, got {value}")))
    }
}

fn invalid(message: String) -> RequestError {
    RequestError::InvalidValue(message)
}
