//! Settings subjects: the owners of settings documents.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a settings subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Global,
    Org,
    User,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Global => "global",
            SubjectKind::Org => "org",
            SubjectKind::User => "user",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An identity that owns exactly one settings document.
///
/// Textual form: `global`, `org:<name>` or `user:<name>`. Names are
/// restricted to ASCII alphanumerics, `-`, `_` and `.` (not starting with
/// `.`) so they are safe to use as path components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Subject {
    Global,
    Org(String),
    User(String),
}

impl Subject {
    pub fn org(name: impl Into<String>) -> Result<Self, SubjectParseError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Subject::Org(name))
    }

    pub fn user(name: impl Into<String>) -> Result<Self, SubjectParseError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Subject::User(name))
    }

    pub fn kind(&self) -> SubjectKind {
        match self {
            Subject::Global => SubjectKind::Global,
            Subject::Org(_) => SubjectKind::Org,
            Subject::User(_) => SubjectKind::User,
        }
    }

    /// Name of an org or user; `None` for the global subject.
    pub fn name(&self) -> Option<&str> {
        match self {
            Subject::Global => None,
            Subject::Org(name) | Subject::User(name) => Some(name),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Global => f.write_str("global"),
            Subject::Org(name) => write!(f, "org:{}", name),
            Subject::User(name) => write!(f, "user:{}", name),
        }
    }
}

impl FromStr for Subject {
    type Err = SubjectParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "global" {
            return Ok(Subject::Global);
        }
        match s.split_once(':') {
            Some(("org", name)) => Subject::org(name),
            Some(("user", name)) => Subject::user(name),
            _ => Err(SubjectParseError::Malformed(s.to_string())),
        }
    }
}

impl TryFrom<String> for Subject {
    type Error = SubjectParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Subject> for String {
    fn from(subject: Subject) -> Self {
        subject.to_string()
    }
}

/// Errors from parsing a subject identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubjectParseError {
    #[error("malformed subject '{0}': expected global, org:<name> or user:<name>")]
    Malformed(String),

    #[error("invalid subject name '{0}'")]
    InvalidName(String),
}

fn validate_name(name: &str) -> Result<(), SubjectParseError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(SubjectParseError::InvalidName(name.to_string()))
    }
}
