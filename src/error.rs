//! Settings error taxonomy.

use cascade_merge::SyntaxError;
use cascade_protocol::{ErrorCode, RpcError};
use cascade_store::{StoreError, Subject, SubjectParseError};
use thiserror::Error;

/// Errors surfaced by the query and mutation paths.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A layer (or the document being edited) is not valid JSON-with-comments.
    #[error("syntax error in settings for {subject}: {error}")]
    Syntax { subject: Subject, error: SyntaxError },

    /// Well-formed input that violates a settings invariant.
    #[error("invalid settings: {0}")]
    Validation(String),

    /// The caller's last-seen version is stale.
    #[error("settings for {subject} changed: last seen version {expected}, current version {actual}")]
    Conflict {
        subject: Subject,
        expected: u64,
        actual: u64,
    },

    #[error("subject not found: {0}")]
    SubjectNotFound(Subject),

    #[error(transparent)]
    InvalidSubject(#[from] SubjectParseError),

    /// Transient or fatal failure of the backing store.
    #[error("settings store unavailable: {0}")]
    StoreUnavailable(String),
}

impl SettingsError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SettingsError::Syntax { .. } => ErrorCode::SyntaxError,
            SettingsError::Validation(_) => ErrorCode::ValidationError,
            SettingsError::Conflict { .. } => ErrorCode::Conflict,
            SettingsError::SubjectNotFound(_) => ErrorCode::NotFound,
            SettingsError::InvalidSubject(_) => ErrorCode::InvalidRequest,
            SettingsError::StoreUnavailable(_) => ErrorCode::StoreUnavailable,
        }
    }

    /// Convert to an RPC error payload
    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            SettingsError::Syntax { error, .. } => {
                RpcError::syntax_error(self.to_string(), error.line, error.column)
            }
            SettingsError::Conflict {
                subject,
                expected,
                actual,
            } => RpcError::conflict(&subject.to_string(), *expected, *actual),
            SettingsError::SubjectNotFound(subject) => RpcError::not_found(&subject.to_string()),
            _ => RpcError::new(self.code(), self.to_string()),
        }
    }
}

impl From<StoreError> for SettingsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict {
                subject,
                expected,
                actual,
            } => SettingsError::Conflict {
                subject,
                expected,
                actual,
            },
            StoreError::UnknownSubject(subject) => SettingsError::SubjectNotFound(subject),
            StoreError::InvalidSubject(e) => SettingsError::InvalidSubject(e),
            StoreError::AlreadyRegistered(subject) => {
                SettingsError::Validation(format!("subject already registered: {}", subject))
            }
            other @ (StoreError::Unavailable(_) | StoreError::Io(_) | StoreError::Corrupt { .. }) => {
                SettingsError::StoreUnavailable(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_conflict_maps_to_conflict() {
        let err: SettingsError = StoreError::VersionConflict {
            subject: Subject::Global,
            expected: 1,
            actual: 2,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::Conflict);

        let rpc = err.to_rpc_error();
        assert_eq!(rpc.code, ErrorCode::Conflict);
        assert_eq!(rpc.data.unwrap()["current_version"], 2);
    }

    #[test]
    fn test_store_failures_map_to_unavailable() {
        let err: SettingsError = StoreError::Unavailable("down".into()).into();
        assert_eq!(err.code(), ErrorCode::StoreUnavailable);

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SettingsError = StoreError::Io(io).into();
        assert_eq!(err.code(), ErrorCode::StoreUnavailable);
    }

    #[test]
    fn test_unknown_subject_maps_to_not_found() {
        let err: SettingsError = StoreError::UnknownSubject(Subject::Org("x".into())).into();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.to_rpc_error().data.unwrap()["subject"], "org:x");
    }

    #[test]
    fn test_syntax_error_carries_position() {
        let error = cascade_merge::normalize("{\n  oops\n}").unwrap_err();
        let err = SettingsError::Syntax {
            subject: Subject::Global,
            error,
        };
        let rpc = err.to_rpc_error();
        assert_eq!(rpc.code, ErrorCode::SyntaxError);
        assert_eq!(rpc.data.unwrap()["line"], 2);
        assert!(rpc.message.contains("global"));
    }
}
