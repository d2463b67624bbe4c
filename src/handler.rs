//! Request entry point.
//!
//! [`handle_request`] is what a transport calls: raw JSON body in,
//! [`EditResponse`] out. It never panics on bad input; every failure becomes
//! a 400 envelope and is reported to the injected [`ErrorLog`].

use crate::imaging::ImageBackend;
use crate::logging::ErrorLog;
use crate::pipeline::{EditConfig, EditError, EditOutcome, edit_with_backend};
use crate::request::parse_request;
use crate::response::EditResponse;
use crate::storage::ByteSource;
use tracing::info;

/// Parse, fetch, edit.
pub fn handle_request(
    source: &impl ByteSource,
    backend: &impl ImageBackend,
    log: &impl ErrorLog,
    body: &[u8],
    config: &EditConfig,
) -> EditResponse {
    match run(source, backend, body, config) {
        Ok(outcome) => EditResponse::Success(outcome),
        Err(err) => {
            log.log_error(err.code(), &err.to_string());
            EditResponse::failure(&err)
        }
    }
}

fn run(
    source: &impl ByteSource,
    backend: &impl ImageBackend,
    body: &[u8],
    config: &EditConfig,
) -> Result<EditOutcome, EditError> {
    let (file_id, request) = parse_request(body, config.default_dpi)?;
    info!(file_id = %file_id, ?request, "edit request");
    let bytes = source.fetch(&file_id)?;
    edit_with_backend(backend, &bytes, &request, config)
}
