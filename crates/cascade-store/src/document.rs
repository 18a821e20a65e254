//! Settings document records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::subject::Subject;

/// One immutable version of a subject's settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsDocument {
    /// Owning subject
    pub subject: Subject,

    /// Version, starting at 1 and increasing by exactly 1 per write
    pub version: u64,

    /// Raw JSON-with-comments text
    pub contents: String,

    /// Identity of the writer
    pub author: String,

    pub created_at: DateTime<Utc>,
}

impl SettingsDocument {
    pub fn new(subject: Subject, version: u64, contents: String, author: String) -> Self {
        Self {
            subject,
            version,
            contents,
            author,
            created_at: Utc::now(),
        }
    }
}
