//! What a request hands back to the transport.
//!
//! Success carries the encoded bytes and their content type. Failure carries
//! a JSON body of the shape
//!
//! ```json
//! {"success": false, "error": {"code": "DECODE_ERROR", "message": "..."}, "data": {}}
//! ```

use crate::pipeline::{EditError, EditOutcome};
use serde_json::json;

pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq)]
pub enum EditResponse {
    Success(EditOutcome),
    Failure {
        status: u16,
        code: &'static str,
        message: String,
    },
}

impl EditResponse {
    pub fn failure(err: &EditError) -> Self {
        EditResponse::Failure {
            status: err.http_status(),
            code: err.code(),
            message: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, EditResponse::Success(_))
    }

    pub fn status(&self) -> u16 {
        match self {
            EditResponse::Success(_) => 200,
            EditResponse::Failure { status, .. } => *status,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            EditResponse::Success(outcome) => outcome.content_type,
            EditResponse::Failure { .. } => JSON_CONTENT_TYPE,
        }
    }

    /// Response body: image bytes, or the serialized error envelope.
    pub fn into_body(self) -> Vec<u8> {
        match self {
            EditResponse::Success(outcome) => outcome.bytes,
            EditResponse::Failure { code, message, .. } => {
                error_body(code, &message).to_string().into_bytes()
            }
        }
    }
}

/// The JSON error envelope.
pub fn error_body(code: &str, message: &str) -> serde_json::Value {
    json!({
        "success": false,
        "error": { "code": code, "message": message },
        "data": {},
    })
}
