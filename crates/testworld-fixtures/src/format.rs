//! Fixture classification and structural checks
//!
//! Files are classified by extension (`.json`, `.csv`, anything else is
//! text). Checks are shallow: they catch fixtures that would seed garbage,
//! not every semantic mistake.

use crate::error::FormatError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use testworld_core::ArtifactKind;

/// Fixture file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureFormat {
    /// JSON document
    Json,
    /// Comma-separated values
    Csv,
    /// Plain UTF-8 text (markdown, source code)
    Text,
}

impl FixtureFormat {
    /// Classify by file extension
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let ext = path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "json" => FixtureFormat::Json,
            "csv" => FixtureFormat::Csv,
            _ => FixtureFormat::Text,
        }
    }
}

impl fmt::Display for FixtureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FixtureFormat::Json => "json",
            FixtureFormat::Csv => "csv",
            FixtureFormat::Text => "text",
        })
    }
}

/// What a fixture is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRole {
    /// Content of an artifact of the given kind
    Artifact(ArtifactKind),
    /// Chat message history
    Messages,
}

/// Classify and structurally check fixture bytes
///
/// # Errors
/// - `FormatError` if the content is not UTF-8, does not parse as its
///   format, or lacks the fields its role requires
pub fn check_format(path: &str, bytes: &[u8], role: ContentRole) -> Result<FixtureFormat, FormatError> {
    let format = FixtureFormat::from_path(path);
    let text = std::str::from_utf8(bytes)
        .map_err(|e| FormatError::new(path, format, format!("not valid UTF-8: {e}")))?;

    match (role, format) {
        (ContentRole::Artifact(ArtifactKind::Site), FixtureFormat::Json) => {
            check_site(path, &parse_json(path, text)?)?;
        }
        (ContentRole::Artifact(ArtifactKind::Site), other) => {
            return Err(FormatError::new(path, other, "site fixtures must be JSON"));
        }
        (ContentRole::Messages, FixtureFormat::Json) => {
            check_messages(path, &parse_json(path, text)?)?;
        }
        (ContentRole::Messages, other) => {
            return Err(FormatError::new(path, other, "message fixtures must be JSON"));
        }
        (_, FixtureFormat::Json) => {
            parse_json(path, text)?;
        }
        (_, FixtureFormat::Csv) => check_csv(path, text)?,
        (_, FixtureFormat::Text) => {}
    }

    Ok(format)
}

fn parse_json(path: &str, text: &str) -> Result<Value, FormatError> {
    serde_json::from_str(text)
        .map_err(|e| FormatError::new(path, FixtureFormat::Json, format!("parse error: {e}")))
}

fn check_site(path: &str, value: &Value) -> Result<(), FormatError> {
    if !value.get("blocks").is_some_and(Value::is_array) {
        return Err(FormatError::new(path, FixtureFormat::Json, "missing 'blocks' array"));
    }
    if !value.get("metadata").is_some_and(Value::is_object) {
        return Err(FormatError::new(path, FixtureFormat::Json, "missing 'metadata' object"));
    }
    Ok(())
}

fn check_messages(path: &str, value: &Value) -> Result<(), FormatError> {
    let messages = value
        .as_array()
        .or_else(|| value.get("messages").and_then(Value::as_array))
        .ok_or_else(|| FormatError::new(path, FixtureFormat::Json, "expected an array of messages"))?;
    for (i, message) in messages.iter().enumerate() {
        if !message.get("role").is_some_and(Value::is_string) {
            return Err(FormatError::new(
                path,
                FixtureFormat::Json,
                format!("message {i} has no string 'role'"),
            ));
        }
    }
    Ok(())
}

fn check_csv(path: &str, text: &str) -> Result<(), FormatError> {
    let mut rows = text.lines().filter(|line| !line.trim().is_empty());
    let header = rows
        .next()
        .ok_or_else(|| FormatError::new(path, FixtureFormat::Csv, "empty sheet"))?;
    let columns = csv_field_count(header);
    for (i, row) in rows.enumerate() {
        let count = csv_field_count(row);
        if count != columns {
            return Err(FormatError::new(
                path,
                FixtureFormat::Csv,
                format!("row {} has {count} fields, header has {columns}", i + 2),
            ));
        }
    }
    Ok(())
}

/// Count fields in one CSV line, honouring double-quoted commas
fn csv_field_count(line: &str) -> usize {
    let mut in_quotes = false;
    let mut fields = 1;
    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields += 1,
            _ => {}
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: ContentRole = ContentRole::Artifact(ArtifactKind::Site);
    const TEXT: ContentRole = ContentRole::Artifact(ArtifactKind::Text);
    const SHEET: ContentRole = ContentRole::Artifact(ArtifactKind::Sheet);

    #[test]
    fn classify_by_extension() {
        assert_eq!(FixtureFormat::from_path("a/b.JSON"), FixtureFormat::Json);
        assert_eq!(FixtureFormat::from_path("b.csv"), FixtureFormat::Csv);
        assert_eq!(FixtureFormat::from_path("notes.md"), FixtureFormat::Text);
        assert_eq!(FixtureFormat::from_path("Makefile"), FixtureFormat::Text);
    }

    #[test]
    fn site_requires_blocks_and_metadata() {
        let ok = br#"{"blocks": [], "metadata": {}}"#;
        assert!(check_format("s.json", ok, SITE).is_ok());

        let no_blocks = br#"{"metadata": {}}"#;
        let err = check_format("s.json", no_blocks, SITE).unwrap_err();
        assert!(err.message.contains("blocks"));

        let bad_meta = br#"{"blocks": [], "metadata": []}"#;
        let err = check_format("s.json", bad_meta, SITE).unwrap_err();
        assert!(err.message.contains("metadata"));
    }

    #[test]
    fn site_must_be_json() {
        let err = check_format("s.md", b"# hi", SITE).unwrap_err();
        assert_eq!(err.format, FixtureFormat::Text);
    }

    #[test]
    fn malformed_json_rejected() {
        let err = check_format("x.json", b"{not json", TEXT).unwrap_err();
        assert!(err.message.starts_with("parse error"));
    }

    #[test]
    fn csv_column_mismatch_rejected() {
        assert!(check_format("t.csv", b"a,b\n1,2\n\"x,y\",3\n", SHEET).is_ok());
        let err = check_format("t.csv", b"a,b\n1,2,3\n", SHEET).unwrap_err();
        assert!(err.message.contains("row 2"));
    }

    #[test]
    fn messages_need_roles() {
        let ok = br#"[{"role": "user", "content": "hi"}]"#;
        assert!(check_format("c.json", ok, ContentRole::Messages).is_ok());
        let err = check_format("c.json", br#"[{"content": "hi"}]"#, ContentRole::Messages).unwrap_err();
        assert!(err.message.contains("message 0"));
        assert!(check_format("c.json", br#"{"role": "user"}"#, ContentRole::Messages).is_err());
    }

    #[test]
    fn wrapped_messages_accepted() {
        let wrapped = br#"{"messages": [{"role": "assistant", "parts": []}]}"#;
        assert!(check_format("c.json", wrapped, ContentRole::Messages).is_ok());
    }

    #[test]
    fn non_utf8_rejected() {
        assert!(check_format("a.md", &[0xff, 0xfe], TEXT).is_err());
    }
}
