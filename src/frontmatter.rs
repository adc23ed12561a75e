//! Front-matter block parsing and re-serialization.
//!
//! A content document opens with a delimiter line, a YAML key-value block, a
//! second delimiter line, then the Markdown body:
//!
//! ```text
//! ---
//! title: Installation
//! permalink: /install/
//! group: Usage
//! ---
//! Body text...
//! ```
//!
//! Parsing splits on the `---` delimiter into exactly three segments; anything
//! else is not a content document. The body is kept verbatim — later `---`
//! occurrences (horizontal rules) belong to it and survive a round trip.
//!
//! Re-serialization deliberately does NOT go through a structured YAML
//! emitter: values are coerced to strings and written as plain `key: value`
//! lines. The sortkey (`001.000`) carries leading zeros and a literal dot, and
//! a structured re-encode would corrupt it into a number.

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// The front-matter delimiter.
pub const DELIMITER: &str = "---";

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("no front-matter block (expected two `{DELIMITER}` delimiters)")]
    MissingDelimiters,
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("front matter is not a key-value mapping")]
    NotAMapping,
}

/// A content document split into metadata and body.
#[derive(Debug, Clone)]
pub struct Document {
    pub meta: Metadata,
    /// Body text exactly as it appeared after the second delimiter,
    /// leading newline included.
    pub body: String,
}

/// Split a document into front matter and body.
pub fn parse(text: &str) -> Result<Document, FrontMatterError> {
    let mut parts = text.splitn(3, DELIMITER);
    let _preamble = parts.next();
    let block = parts.next().ok_or(FrontMatterError::MissingDelimiters)?;
    let body = parts.next().ok_or(FrontMatterError::MissingDelimiters)?;
    Ok(Document {
        meta: Metadata::parse(block)?,
        body: body.to_string(),
    })
}

/// Re-emit a document: delimiter, one `key: value` line per metadata entry,
/// delimiter, then the body verbatim.
pub fn render(doc: &Document) -> String {
    format!("{DELIMITER}\n{}{DELIMITER}{}", doc.meta.to_block(), doc.body)
}

/// Page metadata: an insertion-ordered, string-keyed mapping.
///
/// Typed accessors cover the keys the pipeline reads; [`Metadata::set`]
/// covers the ones it writes. Unknown keys pass through untouched so pages
/// can carry whatever extra front matter their layouts need.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Metadata(Mapping);

impl Metadata {
    /// Parse a YAML block into a metadata mapping.
    pub fn parse(yaml: &str) -> Result<Self, FrontMatterError> {
        match serde_yaml::from_str::<Value>(yaml)? {
            Value::Mapping(mapping) => Ok(Self(mapping)),
            _ => Err(FrontMatterError::NotAMapping),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value for `key`, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.get_str("title")
    }

    pub fn group(&self) -> Option<&str> {
        self.get_str("group")
    }

    pub fn permalink(&self) -> Option<&str> {
        self.get_str("permalink")
    }

    pub fn sortkey(&self) -> Option<&str> {
        self.get_str("sortkey")
    }

    /// Insert or replace a value. Existing keys keep their position;
    /// new keys append.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(Value::from(key), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Emit the mapping as `key: value` lines, one per entry, values coerced
    /// to strings. Composite values fall back to their inline JSON form
    /// (valid YAML flow syntax).
    pub fn to_block(&self) -> String {
        let mut block = String::new();
        for (key, value) in &self.0 {
            block.push_str(&scalar(key));
            block.push_str(": ");
            block.push_str(&scalar(value));
            block.push('\n');
        }
        block
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "---\ntitle: Installation\npermalink: /install/\ngroup: Usage\n---\n\nBody text.\n";

    #[test]
    fn parse_splits_meta_and_body() {
        let doc = parse(DOC).unwrap();
        assert_eq!(doc.meta.title(), Some("Installation"));
        assert_eq!(doc.meta.permalink(), Some("/install/"));
        assert_eq!(doc.body, "\n\nBody text.\n");
    }

    #[test]
    fn parse_without_delimiters_fails() {
        assert!(matches!(
            parse("just some markdown"),
            Err(FrontMatterError::MissingDelimiters)
        ));
        assert!(matches!(
            parse("---\ntitle: Unclosed\n"),
            Err(FrontMatterError::MissingDelimiters)
        ));
    }

    #[test]
    fn parse_rejects_non_mapping_block() {
        assert!(matches!(
            parse("---\n- a\n- b\n---\nbody"),
            Err(FrontMatterError::NotAMapping)
        ));
    }

    #[test]
    fn body_keeps_later_delimiters() {
        let text = "---\ntitle: Rules\n---\nabove\n\n---\n\nbelow\n";
        let doc = parse(text).unwrap();
        assert!(doc.body.contains("---"));
        assert_eq!(render(&doc), text);
    }

    #[test]
    fn render_round_trips() {
        let doc = parse(DOC).unwrap();
        assert_eq!(render(&doc), DOC);
    }

    #[test]
    fn sortkey_stays_a_literal_string() {
        let mut doc = parse(DOC).unwrap();
        doc.meta.set("sortkey", "001.000");
        assert_eq!(doc.meta.sortkey(), Some("001.000"));

        // The emitted line must carry the leading zeros and the dot
        // verbatim — a structured emitter would re-encode them away.
        let rendered = render(&doc);
        assert!(rendered.contains("sortkey: 001.000\n"));
    }

    #[test]
    fn values_coerce_to_strings() {
        let mut meta = Metadata::default();
        meta.set("show", false);
        meta.set("level", 1u64);
        meta.set("title", "Home");
        assert_eq!(meta.to_block(), "show: false\nlevel: 1\ntitle: Home\n");
    }

    #[test]
    fn set_preserves_position_of_existing_keys() {
        let mut doc = parse(DOC).unwrap();
        doc.meta.set("title", "Renamed");
        doc.meta.set("show", true);
        let block = doc.meta.to_block();
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines[0], "title: Renamed");
        assert_eq!(lines.last(), Some(&"show: true"));
    }
}
