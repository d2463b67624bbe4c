//! Error reporting.
//!
//! Request handling reports failures through an injected [`ErrorLog`] instead
//! of logging directly, so hosts can route them wherever they like and tests
//! can assert on what was reported.

use tracing::error;

/// Sink for request failures.
pub trait ErrorLog {
    fn log_error(&self, code: &str, message: &str);
}

/// Forwards to `tracing::error!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorLog;

impl ErrorLog for TracingErrorLog {
    fn log_error(&self, code: &str, message: &str) {
        error!(code, message, "edit request failed");
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Keeps every reported `(code, message)` pair.
    #[derive(Default)]
    pub struct RecordingLog {
        pub entries: Mutex<Vec<(String, String)>>,
    }

    impl RecordingLog {
        pub fn entries(&self) -> Vec<(String, String)> {
            self.entries.lock().unwrap().clone()
        }
    }

    impl ErrorLog for RecordingLog {
        fn log_error(&self, code: &str, message: &str) {
            self.entries
                .lock()
                .unwrap()
                .push((code.to_string(), message.to_string()));
        }
    }

    #[test]
    fn recording_log_keeps_order() {
        let log = RecordingLog::default();
        log.log_error("A", "first");
        log.log_error("B", "second");
        assert_eq!(
            log.entries(),
            vec![
                ("A".to_string(), "first".to_string()),
                ("B".to_string(), "second".to_string())
            ]
        );
    }

    #[test]
    fn tracing_log_does_not_panic_without_subscriber() {
        TracingErrorLog.log_error("DECODE_ERROR", "bad bytes");
    }
}
