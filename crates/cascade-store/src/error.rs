//! Store error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::subject::{Subject, SubjectParseError};

/// Errors from settings store and subject directory operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored version no longer matches the writer's expected version.
    #[error("version conflict for {subject}: expected {expected}, current {actual}")]
    VersionConflict {
        subject: Subject,
        expected: u64,
        actual: u64,
    },

    #[error(transparent)]
    InvalidSubject(#[from] SubjectParseError),

    #[error("unknown subject: {0}")]
    UnknownSubject(Subject),

    #[error("subject already registered: {0}")]
    AlreadyRegistered(Subject),

    /// Transient failure reaching the backing store.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupt record {}: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },
}

impl StoreError {
    /// Whether the failure is in the store itself rather than in the request.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::Io(_) | StoreError::Corrupt { .. }
        )
    }
}
