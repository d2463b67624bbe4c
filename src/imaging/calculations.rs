//! Pure calculation functions for image dimensions and encoder settings.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{FitMode, Quality, Rotation};

/// Apply a scale factor to source dimensions, never going below 1px.
fn apply_scale(source: (u32, u32), scale: f64) -> (u32, u32) {
    let (src_w, src_h) = source;
    let w = (src_w as f64 * scale).round() as u32;
    let h = (src_h as f64 * scale).round() as u32;
    (w.max(1), h.max(1))
}

/// Dimensions for a percentage resize.
///
/// Each axis is `round(src * percentage / 100)`, independently.
///
/// ```
/// # use imgtool::imaging::calculate_percentage_dimensions;
/// assert_eq!(calculate_percentage_dimensions((1000, 1000), 50.0), (500, 500));
/// assert_eq!(calculate_percentage_dimensions((333, 101), 50.0), (167, 51));
/// ```
pub fn calculate_percentage_dimensions(source: (u32, u32), percentage: f64) -> (u32, u32) {
    let (src_w, src_h) = source;
    let w = (src_w as f64 * percentage / 100.0).round() as u32;
    let h = (src_h as f64 * percentage / 100.0).round() as u32;
    (w.max(1), h.max(1))
}

/// Dimensions that fit inside the requested box while preserving aspect ratio.
///
/// With both axes given, the smaller of the two scale factors wins, so the
/// result touches the box on one axis and may be short on the other. With one
/// axis given, the other follows the source aspect. Images smaller than the
/// box are scaled up to meet it.
pub fn calculate_contain_dimensions(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    let (src_w, src_h) = source;
    let scale = match (width, height) {
        (Some(w), Some(h)) => (w as f64 / src_w as f64).min(h as f64 / src_h as f64),
        (Some(w), None) => w as f64 / src_w as f64,
        (None, Some(h)) => h as f64 / src_h as f64,
        (None, None) => return source,
    };
    apply_scale(source, scale)
}

/// Dimensions that exactly match the requested box.
///
/// A missing axis is still derived from the source aspect: stretching only
/// differs from containing when both axes are given.
pub fn calculate_stretch_dimensions(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    match (width, height) {
        (Some(w), Some(h)) => (w.max(1), h.max(1)),
        _ => calculate_contain_dimensions(source, width, height),
    }
}

/// Resolve a requested box into concrete output dimensions for a fit mode.
pub fn calculate_target_dimensions(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
    fit: FitMode,
) -> (u32, u32) {
    match fit {
        FitMode::Contain => calculate_contain_dimensions(source, width, height),
        FitMode::Stretch => calculate_stretch_dimensions(source, width, height),
    }
}

/// PNG compression level (0–9) for a quality value.
///
/// Inverse scale: quality 100 means no compression effort, quality 0 the most.
///
/// ```
/// # use imgtool::imaging::{Quality, png_compression_level};
/// assert_eq!(png_compression_level(Quality::new(80)), 2);
/// assert_eq!(png_compression_level(Quality::new(100)), 0);
/// ```
pub fn png_compression_level(quality: Quality) -> u8 {
    (9.0 * (100.0 - quality.value() as f64) / 100.0).round() as u8
}

/// Canvas needed to hold an image rotated by an arbitrary angle without
/// clipping any corner.
pub fn calculate_rotated_canvas(source: (u32, u32), rotation: Rotation) -> (u32, u32) {
    let (w, h) = source;
    match rotation.degrees() {
        0 | 180 => return source,
        90 | 270 => return (h, w),
        _ => {}
    }
    let radians = (rotation.degrees() as f64).to_radians();
    let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
    let new_w = (w as f64 * cos + h as f64 * sin).ceil() as u32;
    let new_h = (w as f64 * sin + h as f64 * cos).ceil() as u32;
    (new_w.max(1), new_h.max(1))
}
