//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Edit
//!
//! ```text
//! jpeg 500x500, 49.8 KB (quality 25)
//!     Written: out.jpg
//! Size target 50.0 KB: met after 7 trials
//!     q55  110.0 KB  over
//!     q32   64.0 KB  over
//!     q20   40.0 KB  fits
//! ```
//!
//! ## Inspect
//!
//! ```text
//! abc123
//!     Source: uploads/abc123.png
//!     png 1024x768, 812.4 KB
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::imaging::Dimensions;
use crate::pipeline::{EditOutcome, OptimizeReport};
use std::path::Path;

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn kb(bytes: usize) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

fn dims(d: Dimensions) -> String {
    format!("{}x{}", d.width, d.height)
}

/// Summary of a finished edit.
pub fn format_edit_output(outcome: &EditOutcome, written_to: Option<&Path>) -> Vec<String> {
    let quality = match outcome.quality {
        Some(q) => format!("quality {}", q.value()),
        None => "codec default".to_string(),
    };
    let mut lines = vec![format!(
        "{} {}, {} ({})",
        outcome.format,
        dims(outcome.dimensions),
        kb(outcome.bytes.len()),
        quality
    )];
    if let Some(path) = written_to {
        lines.push(format!("{}Written: {}", indent(1), path.display()));
    }
    if let Some(report) = &outcome.optimization {
        lines.extend(format_optimize_report(report));
    }
    lines
}

/// Size-search trials, one per line.
pub fn format_optimize_report(report: &OptimizeReport) -> Vec<String> {
    let verdict = if report.target_met {
        "met"
    } else {
        "NOT met, kept smallest"
    };
    let mut lines = vec![format!(
        "Size target {:.1} KB: {} after {} trials",
        report.target_kb,
        verdict,
        report.trials.len()
    )];
    for trial in &report.trials {
        let fits = trial.size_bytes as f64 / 1024.0 <= report.target_kb;
        lines.push(format!(
            "{}q{:<3} {:>10}  {}",
            indent(1),
            trial.quality.value(),
            kb(trial.size_bytes),
            if fits { "fits" } else { "over" }
        ));
    }
    lines
}

/// Stored file details for `inspect`.
pub fn format_inspect_output(
    file_id: &str,
    path: &Path,
    format: Option<&str>,
    dimensions: Dimensions,
    size_bytes: usize,
) -> Vec<String> {
    vec![
        file_id.to_string(),
        format!("{}Source: {}", indent(1), path.display()),
        format!(
            "{}{} {}, {}",
            indent(1),
            format.unwrap_or("unknown"),
            dims(dimensions),
            kb(size_bytes)
        ),
    ]
}

/// A failed request, as `CODE: message`.
pub fn format_error_output(code: &str, message: &str) -> Vec<String> {
    vec![format!("{code}: {message}")]
}

pub fn print_edit_output(outcome: &EditOutcome, written_to: Option<&Path>) {
    for line in format_edit_output(outcome, written_to) {
        println!("{}", line);
    }
}

pub fn print_inspect_output(
    file_id: &str,
    path: &Path,
    format: Option<&str>,
    dimensions: Dimensions,
    size_bytes: usize,
) {
    for line in format_inspect_output(file_id, path, format, dimensions, size_bytes) {
        println!("{}", line);
    }
}

pub fn print_error_output(code: &str, message: &str) {
    for line in format_error_output(code, message) {
        eprintln!("{}", line);
    }
}
