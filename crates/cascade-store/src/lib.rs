//! Versioned settings document storage.
//!
//! Every subject owns a chain of immutable settings documents. A write never
//! mutates a document; it appends the next version, and only if the caller's
//! expected version is still the current one (compare-and-swap).
//!
//! Two implementations are provided:
//! - [`MemoryStore`]: process-local, used by tests and embedders
//! - [`FsStore`]: one JSON record per version under a root directory

mod directory;
mod document;
mod error;
mod fs;
mod memory;
mod subject;

pub use directory::{Directory, SubjectDirectory};
pub use document::SettingsDocument;
pub use error::StoreError;
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use subject::{Subject, SubjectKind, SubjectParseError};

/// Version number meaning "no document has been written yet".
pub const NO_VERSION: u64 = 0;

/// Source of truth for settings documents.
pub trait SettingsStore: Send + Sync {
    /// The subject's highest-versioned document, if it ever wrote one.
    fn get_current(&self, subject: &Subject) -> Result<Option<SettingsDocument>, StoreError>;

    /// Append version `expected_version + 1` if and only if the current
    /// version is `expected_version` ([`NO_VERSION`] when there is none).
    ///
    /// The check and the append are one atomic step; a mismatch fails with
    /// [`StoreError::VersionConflict`] and writes nothing.
    fn create_if_version_matches(
        &self,
        subject: &Subject,
        expected_version: u64,
        contents: &str,
        author: &str,
    ) -> Result<SettingsDocument, StoreError>;

    /// All stored versions for the subject, oldest first.
    fn history(&self, subject: &Subject) -> Result<Vec<SettingsDocument>, StoreError>;
}

/// Current version of an optional document.
pub fn version_of(document: Option<&SettingsDocument>) -> u64 {
    document.map(|d| d.version).unwrap_or(NO_VERSION)
}
