//! Source image lookup.
//!
//! The pipeline only needs "bytes for this id". [`ByteSource`] is that seam;
//! [`UploadDir`] serves it from a directory of uploaded files, where an id
//! names either a file called `<id>` or one called `<id>.<ext>`.
//!
//! Ids are validated before they touch the filesystem: path separators, `..`
//! and anything outside `[A-Za-z0-9._-]` are rejected.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const MAX_ID_LEN: usize = 255;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("invalid file id: {0}")]
    InvalidId(String),
    #[error("file not found: {id}")]
    NotFound { id: String },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Anything that can hand back the stored bytes for a file id.
pub trait ByteSource {
    fn fetch(&self, file_id: &str) -> Result<Vec<u8>, StorageError>;
}

/// Reject ids that could escape the storage root or are otherwise malformed.
pub fn validate_file_id(id: &str) -> Result<(), StorageError> {
    if id.is_empty() {
        return Err(StorageError::InvalidId("id is empty".into()));
    }
    if id.len() > MAX_ID_LEN {
        return Err(StorageError::InvalidId(format!(
            "id is too long (max {MAX_ID_LEN})"
        )));
    }
    if id.contains("..") || id.contains('/') || id.contains('\\') {
        return Err(StorageError::InvalidId(format!(
            "path traversal detected in {id:?}"
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(StorageError::InvalidId(format!(
            "invalid characters in {id:?}"
        )));
    }
    Ok(())
}

/// Uploaded files in a single flat directory.
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the stored file for `file_id`.
    ///
    /// An exact match wins. Otherwise the alphabetically first `<id>.<ext>`
    /// is used, so lookups are deterministic when several extensions exist.
    pub fn resolve(&self, file_id: &str) -> Result<PathBuf, StorageError> {
        validate_file_id(file_id)?;

        let exact = self.root.join(file_id);
        if exact.is_file() {
            return Ok(exact);
        }

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound {
                    id: file_id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut candidates = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let stem_matches = path.file_stem().and_then(|s| s.to_str()) == Some(file_id);
            if stem_matches && path.extension().is_some() && path.is_file() {
                candidates.push(path);
            }
        }
        candidates.sort();
        candidates
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::NotFound {
                id: file_id.to_string(),
            })
    }
}

impl ByteSource for UploadDir {
    fn fetch(&self, file_id: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(file_id)?;
        debug!(file_id, path = %path.display(), "reading source image");
        Ok(fs::read(path)?)
    }
}
