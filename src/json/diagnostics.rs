//! JSON error diagnostics with source spans
//!
//! Rendered templates and downloaded configuration files are parsed strictly.
//! When parsing fails the offending text is attached to the error so miette
//! can point at the exact location.

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

/// JSON syntax error with source location
#[derive(Debug, Error, Diagnostic)]
#[error("invalid JSON in {name}: {message}")]
#[diagnostic(code(connector::json::syntax))]
pub struct JsonSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    name: String,

    /// The underlying error message
    message: String,
}

impl JsonSyntaxError {
    /// Create a syntax error from a serde_json error
    pub fn from_serde_error(err: &serde_json::Error, source: &str, name: &str) -> Self {
        let offset = line_col_to_offset(source, err.line(), err.column());
        let message = err.to_string();
        let help = generate_help(&message);

        Self {
            src: NamedSource::new(name, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            name: name.to_string(),
            message,
        }
    }

    /// The serde_json message without the source excerpt
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Parse `source` as JSON, attaching the text to the error on failure
pub fn parse_json(source: &str, name: &str) -> Result<Value, JsonSyntaxError> {
    serde_json::from_str(source).map_err(|e| JsonSyntaxError::from_serde_error(&e, source, name))
}

/// Write a value as pretty JSON with a 2-space indent and sorted keys
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let text = to_pretty_string(value, b"  ")?;
    std::fs::write(path, text)
}

/// Serialize a value as pretty JSON using the given indent.
///
/// Values go through `serde_json::Value` first so object keys come out sorted
/// regardless of struct field order.
pub fn to_pretty_string<T: Serialize>(value: &T, indent: &[u8]) -> std::io::Result<String> {
    let value = serde_json::to_value(value)?;
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Convert line/column to byte offset
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    let mut current_line = 1;

    for (i, ch) in source.char_indices() {
        if current_line == line {
            let line_start = i;
            let mut col = 1;
            for (j, c) in source[line_start..].char_indices() {
                if col == column {
                    return line_start + j;
                }
                if c == '\n' {
                    break;
                }
                col += 1;
            }
            return line_start + column.saturating_sub(1);
        }
        if ch == '\n' {
            current_line += 1;
        }
        offset = i;
    }

    offset
}

/// Generate helpful suggestions based on error message
fn generate_help(message: &str) -> Option<String> {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("trailing comma") {
        return Some("Remove the comma after the last item of the object or list.".to_string());
    }

    if msg_lower.contains("expected `,` or `}`") || msg_lower.contains("expected `,` or `]`") {
        return Some("A comma is missing between two items.".to_string());
    }

    if msg_lower.contains("key must be a string") {
        return Some("Object keys must be double-quoted strings: \"key\": value".to_string());
    }

    if msg_lower.contains("eof while parsing") {
        return Some(
            "The document ends early. Check that every '{' and '[' is closed.".to_string(),
        );
    }

    if msg_lower.contains("expected value") {
        return Some(
            "A template token may have rendered outside a string. Wrap tokens in quotes: \"{{@ name @}}\""
                .to_string(),
        );
    }

    None
}
