//! End-to-end edit requests against real codecs and an uploads directory.
//!
//! Source images are synthesized and written into a temp uploads dir; each
//! test sends a JSON body through `handle_request` and inspects the response.

use image::{ImageFormat, Rgb, RgbImage};
use imgtool::handler::handle_request;
use imgtool::imaging::RustBackend;
use imgtool::logging::ErrorLog;
use imgtool::pipeline::EditConfig;
use imgtool::response::EditResponse;
use imgtool::storage::UploadDir;
use std::cell::RefCell;
use std::io::Cursor;
use tempfile::TempDir;

#[derive(Default)]
struct CollectingLog(RefCell<Vec<String>>);

impl ErrorLog for CollectingLog {
    fn log_error(&self, code: &str, _message: &str) {
        self.0.borrow_mut().push(code.to_string());
    }
}

/// Smooth gradient; compresses well.
fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128])
    })
}

/// Deterministic high-frequency noise; makes encoded size track quality.
fn noise(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let h = x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503) ^ (x * y);
        Rgb([(h & 0xff) as u8, ((h >> 8) & 0xff) as u8, ((h >> 16) & 0xff) as u8])
    })
}

fn store(dir: &TempDir, name: &str, img: &RgbImage, format: ImageFormat) {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    std::fs::write(dir.path().join(name), buf.into_inner()).unwrap();
}

fn send(dir: &TempDir, body: &str) -> (EditResponse, Vec<String>) {
    let uploads = UploadDir::new(dir.path());
    let log = CollectingLog::default();
    let response = handle_request(
        &uploads,
        &RustBackend::new(),
        &log,
        body.as_bytes(),
        &EditConfig::default(),
    );
    let codes = log.0.into_inner();
    (response, codes)
}

fn decoded_dims(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes).unwrap();
    (img.width(), img.height())
}

fn error_json(response: EditResponse) -> serde_json::Value {
    assert_eq!(response.status(), 400);
    assert_eq!(response.content_type(), "application/json");
    serde_json::from_slice(&response.into_body()).unwrap()
}

#[test]
fn percentage_resize_defaults_to_jpeg() {
    let tmp = TempDir::new().unwrap();
    store(&tmp, "square.png", &gradient(1000, 1000), ImageFormat::Png);

    let (response, codes) = send(&tmp, r#"{"fileId": "square", "action": {"percentage": 50}}"#);

    assert!(codes.is_empty());
    assert_eq!(response.content_type(), "image/jpeg");
    let bytes = response.into_body();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    assert_eq!(decoded_dims(&bytes), (500, 500));
}

#[test]
fn contain_box_in_centimetres() {
    // 2.54cm at 100 DPI is 100px; a 200x100 source fits as 100x50
    let tmp = TempDir::new().unwrap();
    store(&tmp, "wide.png", &gradient(200, 100), ImageFormat::Png);

    let (response, _) = send(
        &tmp,
        r#"{"fileId": "wide", "action": {
            "resize": {"width": 2.54, "height": 2.54, "unit": "cm", "dpi": 100},
            "format": "png"
        }}"#,
    );

    assert_eq!(response.content_type(), "image/png");
    assert_eq!(decoded_dims(&response.into_body()), (100, 50));
}

#[test]
fn stretch_when_aspect_not_maintained() {
    let tmp = TempDir::new().unwrap();
    store(&tmp, "wide.png", &gradient(200, 100), ImageFormat::Png);

    let (response, _) = send(
        &tmp,
        r#"{"fileId": "wide", "action": {
            "resize": {"width": 60, "height": 60},
            "maintainAspectRatio": false,
            "format": "png"
        }}"#,
    );
    assert_eq!(decoded_dims(&response.into_body()), (60, 60));
}

#[test]
fn png_with_quality() {
    let tmp = TempDir::new().unwrap();
    store(&tmp, "img.jpg", &gradient(64, 64), ImageFormat::Jpeg);

    let (response, _) = send(
        &tmp,
        r#"{"fileId": "img", "action": {"format": "png", "quality": 80}}"#,
    );
    assert_eq!(response.content_type(), "image/png");
    let bytes = response.into_body();
    assert_eq!(&bytes[..4], b"\x89PNG");
    assert_eq!(decoded_dims(&bytes), (64, 64));
}

#[test]
fn rotate_450_is_a_quarter_turn() {
    let tmp = TempDir::new().unwrap();
    store(&tmp, "tall.png", &gradient(40, 20), ImageFormat::Png);

    let (response, _) = send(
        &tmp,
        r#"{"fileId": "tall", "action": {"rotate": 450, "format": "png"}}"#,
    );
    assert_eq!(decoded_dims(&response.into_body()), (20, 40));
}

#[test]
fn target_size_lands_under_budget() {
    let tmp = TempDir::new().unwrap();
    store(&tmp, "noise.png", &noise(384, 384), ImageFormat::Png);

    let (response, _) = send(
        &tmp,
        r#"{"fileId": "noise", "action": {"targetSize": 60, "format": "jpeg"}}"#,
    );

    let EditResponse::Success(outcome) = response else {
        panic!("expected success");
    };
    let report = outcome.optimization.as_ref().unwrap();
    assert!(!report.trials.is_empty());
    assert!(report.trials.len() <= 7);
    if report.target_met {
        assert!(outcome.bytes.len() <= 60 * 1024, "{}", outcome.bytes.len());
    }
    // Reported quality is the one that produced the returned buffer
    let chosen = outcome.quality.unwrap();
    let trial = report.trials.iter().find(|t| t.quality == chosen).unwrap();
    assert_eq!(trial.size_bytes, outcome.bytes.len());
}

#[test]
fn webp_target_size() {
    let tmp = TempDir::new().unwrap();
    store(&tmp, "noise.png", &noise(256, 256), ImageFormat::Png);

    let (response, _) = send(
        &tmp,
        r#"{"fileId": "noise", "action": {"targetSize": 30, "format": "webm"}}"#,
    );
    assert_eq!(response.content_type(), "image/webp");
    let bytes = response.into_body();
    assert_eq!(&bytes[..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"WEBP");
}

#[test]
fn avif_output() {
    let tmp = TempDir::new().unwrap();
    store(&tmp, "small.png", &gradient(32, 32), ImageFormat::Png);

    let (response, _) = send(
        &tmp,
        r#"{"fileId": "small", "action": {"format": "avif", "quality": 60}}"#,
    );
    assert_eq!(response.content_type(), "image/avif");
    let bytes = response.into_body();
    assert_eq!(&bytes[4..8], b"ftyp");
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn unsupported_format_envelope() {
    let tmp = TempDir::new().unwrap();
    store(&tmp, "img.png", &gradient(8, 8), ImageFormat::Png);

    let (response, codes) = send(&tmp, r#"{"fileId": "img", "action": {"format": "bmp"}}"#);

    let body = error_json(response);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNSUPPORTED_FORMAT");
    assert!(body["error"]["message"].as_str().unwrap().contains("bmp"));
    assert_eq!(body["data"], serde_json::json!({}));
    assert_eq!(codes, vec!["UNSUPPORTED_FORMAT"]);
}

#[test]
fn corrupt_source_is_decode_error() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("junk.jpg"), b"definitely not a jpeg").unwrap();

    let (response, _) = send(&tmp, r#"{"fileId": "junk", "action": {"percentage": 50}}"#);
    assert_eq!(error_json(response)["error"]["code"], "DECODE_ERROR");
}

#[test]
fn missing_file() {
    let tmp = TempDir::new().unwrap();
    let (response, _) = send(&tmp, r#"{"fileId": "ghost", "action": {}}"#);
    assert_eq!(error_json(response)["error"]["code"], "FILE_NOT_FOUND");
}

#[test]
fn path_traversal_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let (response, _) = send(&tmp, r#"{"fileId": "../etc/passwd", "action": {}}"#);
    assert_eq!(error_json(response)["error"]["code"], "INVALID_REQUEST");
}

#[test]
fn out_of_range_quality() {
    let tmp = TempDir::new().unwrap();
    store(&tmp, "img.png", &gradient(8, 8), ImageFormat::Png);
    let (response, _) = send(&tmp, r#"{"fileId": "img", "action": {"quality": 150}}"#);
    assert_eq!(error_json(response)["error"]["code"], "INVALID_REQUEST");
}

#[test]
fn oversized_output_is_rejected() {
    let tmp = TempDir::new().unwrap();
    store(&tmp, "img.png", &gradient(8, 8), ImageFormat::Png);
    let (response, _) = send(
        &tmp,
        r#"{"fileId": "img", "action": {"resize": {"width": 100000}}}"#,
    );
    assert_eq!(error_json(response)["error"]["code"], "LIMIT_EXCEEDED");
}
