//! Structured header (YAML front matter) extraction
//!
//! A header is a YAML mapping between a leading `---` line and the next
//! `---` line. Only the header is ever parsed; the body stays opaque.

use std::collections::BTreeMap;

use serde_yaml::Value;

/// Outcome of looking for a header at the top of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Header {
    /// The document does not start with a `---` block
    Absent,
    /// A block exists but is not a YAML mapping
    Malformed(String),
    Fields(BTreeMap<String, Value>),
}

impl Header {
    /// Parse the header of `content`.
    pub fn parse(content: &str) -> Self {
        let Some(block) = extract_block(content) else {
            return Header::Absent;
        };

        if block.trim().is_empty() {
            return Header::Fields(BTreeMap::new());
        }

        match serde_yaml::from_str::<Value>(block) {
            Ok(Value::Mapping(mapping)) => Header::Fields(
                mapping
                    .into_iter()
                    .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), v)))
                    .collect(),
            ),
            Ok(Value::Null) => Header::Fields(BTreeMap::new()),
            Ok(_) => Header::Malformed("header is not a key/value mapping".to_string()),
            Err(e) => Header::Malformed(e.to_string()),
        }
    }

    /// A field's value as trimmed, non-empty text. Numbers and booleans are
    /// rendered; sequences, mappings, and null count as missing.
    pub fn text(&self, field: &str) -> Option<String> {
        let Header::Fields(fields) = self else {
            return None;
        };
        let rendered = match fields.get(field)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        (!rendered.is_empty()).then_some(rendered)
    }
}

/// Text between the opening and closing `---` lines.
fn extract_block(content: &str) -> Option<&str> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let rest = content.strip_prefix("---")?;
    let rest = if let Some(r) = rest.strip_prefix('\n') {
        r
    } else if let Some(r) = rest.strip_prefix("\r\n") {
        r
    } else {
        return None;
    };

    if rest.starts_with("---") {
        return Some("");
    }
    let end = rest.find("\n---")?;
    Some(&rest[..end])
}
