//! JSON-with-comments normalization.
//!
//! Settings documents are JSON extended with `//` line comments, `/* */`
//! block comments and trailing commas. Normalization blanks those out and
//! hands the remainder to a strict JSON parser. Blanked bytes become spaces
//! (newlines are kept) so parser positions still match the original text.

use serde_json::{Map, Value};

use crate::error::SyntaxError;

/// Parse a JSON-with-comments document into a value tree.
///
/// Empty input, or input consisting only of whitespace and comments,
/// normalizes to an empty object.
pub fn normalize(text: &str) -> Result<Value, SyntaxError> {
    let stripped = strip_comments(text.as_bytes())?;
    let stripped = strip_trailing_commas(stripped);

    if stripped.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_slice(&stripped).map_err(|e| SyntaxError::from_json(&e))
}

fn strip_comments(input: &[u8]) -> Result<Vec<u8>, SyntaxError> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        match input[i] {
            b'"' => {
                let end = string_end(input, i);
                out.extend_from_slice(&input[i..end]);
                i = end;
            }
            b'/' if input.get(i + 1) == Some(&b'/') => {
                while i < input.len() && input[i] != b'\n' {
                    out.push(b' ');
                    i += 1;
                }
            }
            b'/' if input.get(i + 1) == Some(&b'*') => {
                let start = i;
                out.extend_from_slice(b"  ");
                i += 2;
                loop {
                    if i >= input.len() {
                        return Err(SyntaxError::at_offset(
                            input,
                            start,
                            "unterminated block comment",
                        ));
                    }
                    if input[i] == b'*' && input.get(i + 1) == Some(&b'/') {
                        out.extend_from_slice(b"  ");
                        i += 2;
                        break;
                    }
                    out.push(blank(input[i]));
                    i += 1;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    Ok(out)
}

/// Blank out commas that are followed (after whitespace) by `}` or `]`.
/// Runs after comment stripping, so only whitespace can sit in between.
///
/// A comma with no element before it (`{,}`, `[1,,]`) is left in place for
/// the JSON parser to reject.
fn strip_trailing_commas(mut buf: Vec<u8>) -> Vec<u8> {
    let mut i = 0;
    let mut previous: Option<u8> = None;

    while i < buf.len() {
        match buf[i] {
            b'"' => {
                i = string_end(&buf, i);
                previous = Some(b'"');
            }
            b',' => {
                let next = buf[i + 1..]
                    .iter()
                    .find(|b| !b.is_ascii_whitespace())
                    .copied();
                let follows_element = !matches!(previous, None | Some(b'{') | Some(b'[') | Some(b','));
                if follows_element && matches!(next, Some(b'}') | Some(b']')) {
                    buf[i] = b' ';
                }
                previous = Some(b',');
                i += 1;
            }
            b if b.is_ascii_whitespace() => i += 1,
            b => {
                previous = Some(b);
                i += 1;
            }
        }
    }

    buf
}

/// Index just past the closing quote of the string literal opening at
/// `start`. An unterminated string runs to the end of input and is left for
/// the JSON parser to report.
fn string_end(input: &[u8], start: usize) -> usize {
    let mut i = start + 1;

    while i < input.len() {
        match input[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            _ => i += 1,
        }
    }

    input.len()
}

fn blank(b: u8) -> u8 {
    if b == b'\n' || b == b'\r' {
        b
    } else {
        b' '
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json() {
        assert_eq!(normalize(r#"{"a":1}"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_empty_input_is_empty_object() {
        assert_eq!(normalize("").unwrap(), json!({}));
        assert_eq!(normalize("  \n\t ").unwrap(), json!({}));
    }

    #[test]
    fn test_all_comments_is_empty_object() {
        let text = "// nothing here\n/* still\n nothing */\n";
        assert_eq!(normalize(text).unwrap(), json!({}));
    }

    #[test]
    fn test_line_and_block_comments() {
        let text = r#"
/* comment */
{
	// comment
	"a": 1 // comment
}"#;
        assert_eq!(normalize(text).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_comment_markers_inside_strings_are_kept() {
        let text = r#"{"url": "https://example.com/*x*/", "path": "a//b"}"#;
        assert_eq!(
            normalize(text).unwrap(),
            json!({"url": "https://example.com/*x*/", "path": "a//b"})
        );
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let text = r#"{"q": "say \"hi\" // not a comment"}"#;
        assert_eq!(
            normalize(text).unwrap(),
            json!({"q": "say \"hi\" // not a comment"})
        );
    }

    #[test]
    fn test_trailing_commas() {
        let text = "{\n  \"a\": [1, 2, 3,],\n  \"b\": {\"c\": true,},\n}";
        assert_eq!(
            normalize(text).unwrap(),
            json!({"a": [1, 2, 3], "b": {"c": true}})
        );
    }

    #[test]
    fn test_trailing_comma_before_comment() {
        let text = "{\"a\": 1, // last one\n}";
        assert_eq!(normalize(text).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_comma_inside_string_untouched() {
        let text = r#"{"a": ",]"}"#;
        assert_eq!(normalize(text).unwrap(), json!({"a": ",]"}));
    }

    #[test]
    fn test_comma_without_element_is_syntax_error() {
        for text in ["{,}", "[,]", "[1,,]", "{\"a\":[,]}", "{\"a\":1,,}", "[ /* x */ , ]"] {
            assert!(normalize(text).is_err(), "{} should not normalize", text);
        }
    }

    #[test]
    fn test_trailing_comma_after_nested_container() {
        assert_eq!(
            normalize(r#"{"a": [1, {"b": 2},], "c": {},}"#).unwrap(),
            json!({"a": [1, {"b": 2}], "c": {}})
        );
    }

    #[test]
    fn test_syntax_error() {
        let err = normalize("error!").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_syntax_error_position_survives_comments() {
        let text = "/* a\n b */ {\n  \"a\": oops\n}";
        let err = normalize(text).unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = normalize("{\"a\": 1} /* open").unwrap_err();
        assert_eq!(err.message, "unterminated block comment");
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 10);
    }

    #[test]
    fn test_non_object_top_level_is_returned() {
        assert_eq!(normalize("[1, 2]").unwrap(), json!([1, 2]));
    }
}
