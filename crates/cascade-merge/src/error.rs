//! Error types for normalization and merging.

use thiserror::Error;

/// A settings document that is not valid JSON once comments and trailing
/// commas are removed.
///
/// Positions are 1-based and refer to the original text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line} column {column}")]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    /// Build an error pointing at a byte offset of `text`.
    pub(crate) fn at_offset(text: &[u8], offset: usize, message: impl Into<String>) -> Self {
        let before = &text[..offset.min(text.len())];
        let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = before
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(0);

        Self {
            line,
            column: before.len() - line_start + 1,
            message: message.into(),
        }
    }

    pub(crate) fn from_json(err: &serde_json::Error) -> Self {
        let line = err.line();
        let column = err.column();
        let rendered = err.to_string();
        let suffix = format!(" at line {} column {}", line, column);
        let message = rendered
            .strip_suffix(&suffix)
            .unwrap_or(&rendered)
            .to_string();

        Self {
            line,
            column,
            message,
        }
    }
}

/// Failure of a whole merge. No partial result is ever produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// Document at `index` (0 = lowest precedence) failed to parse.
    #[error("document {index}: {source}")]
    Syntax { index: usize, source: SyntaxError },

    /// Document at `index` parsed, but its top level is not an object.
    #[error("document {index}: top-level value must be an object")]
    NotAnObject { index: usize },
}

impl MergeError {
    /// Index of the offending document within the merge input.
    pub fn index(&self) -> usize {
        match self {
            MergeError::Syntax { index, .. } | MergeError::NotAnObject { index } => *index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_offset_positions() {
        let text = b"{\n  \"a\": 1,\n  oops\n}";
        let offset = text.iter().position(|&b| b == b'o').unwrap();
        let err = SyntaxError::at_offset(text, offset, "bad");
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 3);
        assert_eq!(err.to_string(), "bad at line 3 column 3");
    }

    #[test]
    fn test_from_json_strips_position_suffix() {
        let json_err = serde_json::from_str::<serde_json::Value>("{\"a\" 1}").unwrap_err();
        let err = SyntaxError::from_json(&json_err);
        assert_eq!(err.line, 1);
        assert!(!err.message.contains("at line"));
        assert!(err
            .to_string()
            .ends_with(&format!("at line 1 column {}", err.column)));
    }
}
