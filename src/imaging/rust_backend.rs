//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Rotate 90/180/270 | `image::DynamicImage::rotate*` (lossless) |
//! | Rotate other angles | `imageproc::geometric_transformations::rotate_about_center` |
//! | Encode → JPEG, PNG | `image::codecs::{jpeg, png}` |
//! | Encode → WebP | `webp` (libwebp, lossy with quality) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{calculate_rotated_canvas, png_compression_level};
use super::params::{EncodeParams, OutputFormat, Quality, ResizeParams, Rotation};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use std::io::Cursor;

/// rav1e speed used when none is configured (1 = slowest/best, 10 = fastest).
pub const DEFAULT_AVIF_SPEED: u8 = 6;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    avif_speed: u8,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            avif_speed: DEFAULT_AVIF_SPEED,
        }
    }

    pub fn with_avif_speed(speed: u8) -> Self {
        Self {
            avif_speed: speed.clamp(1, 10),
        }
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(format!("failed to guess format: {e}")))
}

fn encode_failed(format: OutputFormat) -> impl Fn(image::ImageError) -> BackendError {
    move |e| BackendError::Encode {
        format: format.as_str(),
        message: e.to_string(),
    }
}

fn encode_jpeg(image: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
    // JPEG has no alpha channel
    image
        .to_rgb8()
        .write_with_encoder(encoder)
        .map_err(encode_failed(OutputFormat::Jpeg))?;
    Ok(buf.into_inner())
}

fn encode_png(image: &DynamicImage, quality: Option<Quality>) -> Result<Vec<u8>, BackendError> {
    let compression = match quality.map(png_compression_level) {
        None => CompressionType::Default,
        Some(0) => CompressionType::Uncompressed,
        Some(level) => CompressionType::Level(level),
    };
    let mut buf = Cursor::new(Vec::new());
    let encoder = PngEncoder::new_with_quality(&mut buf, compression, PngFilter::Adaptive);
    image
        .write_with_encoder(encoder)
        .map_err(encode_failed(OutputFormat::Png))?;
    Ok(buf.into_inner())
}

fn encode_webp(image: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgba = image.to_rgba8();
    let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
    // `Encoder::encode` unwraps libwebp's error; go through the fallible call
    let memory = encoder
        .encode_simple(false, quality.value() as f32)
        .map_err(|e| BackendError::Encode {
            format: OutputFormat::WebP.as_str(),
            message: format!("{e:?}"),
        })?;
    Ok(memory.to_vec())
}

fn encode_avif(image: &DynamicImage, quality: Quality, speed: u8) -> Result<Vec<u8>, BackendError> {
    // rav1e only takes 8-bit RGB(A)
    let image = if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };
    let mut buf = Cursor::new(Vec::new());
    let encoder = AvifEncoder::new_with_speed_quality(&mut buf, speed, quality.value() as u8);
    image
        .write_with_encoder(encoder)
        .map_err(encode_failed(OutputFormat::Avif))?;
    Ok(buf.into_inner())
}

/// Rotate by a non-right angle onto a canvas large enough for every corner.
/// Uncovered area is transparent.
fn rotate_arbitrary(image: &DynamicImage, rotation: Rotation) -> DynamicImage {
    let rgba = image.to_rgba8();
    let (canvas_w, canvas_h) = calculate_rotated_canvas((rgba.width(), rgba.height()), rotation);
    let transparent = Rgba([0, 0, 0, 0]);

    let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, transparent);
    let x = (canvas_w as i64 - rgba.width() as i64) / 2;
    let y = (canvas_h as i64 - rgba.height() as i64) / 2;
    image::imageops::overlay(&mut canvas, &rgba, x, y);

    let radians = (rotation.degrees() as f32).to_radians();
    DynamicImage::ImageRgba8(rotate_about_center(
        &canvas,
        radians,
        Interpolation::Bilinear,
        transparent,
    ))
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = reader(bytes)?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("failed to read dimensions: {e}")))?;
        Ok(Dimensions { width, height })
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        reader(bytes)?
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn resize(
        &self,
        image: &DynamicImage,
        params: &ResizeParams,
    ) -> Result<DynamicImage, BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "cannot resize to {}x{}",
                params.width, params.height
            )));
        }
        Ok(image.resize_exact(params.width, params.height, FilterType::Lanczos3))
    }

    fn rotate(
        &self,
        image: &DynamicImage,
        rotation: Rotation,
    ) -> Result<DynamicImage, BackendError> {
        Ok(match rotation.degrees() {
            0 => image.clone(),
            90 => image.rotate90(),
            180 => image.rotate180(),
            270 => image.rotate270(),
            _ => rotate_arbitrary(image, rotation),
        })
    }

    fn encode(&self, image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        let format = params.format;
        let quality = params.quality.or(format.default_quality());
        match (format, quality) {
            (OutputFormat::Png, quality) => encode_png(image, quality),
            (OutputFormat::Jpeg, Some(q)) => encode_jpeg(image, q),
            (OutputFormat::WebP, Some(q)) => encode_webp(image, q),
            (OutputFormat::Avif, Some(q)) => encode_avif(image, q, self.avif_speed),
            (format, None) => Err(BackendError::Encode {
                format: format.as_str(),
                message: "no quality available".into(),
            }),
        }
    }
}
