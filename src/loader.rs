use crate::error::SyntaxError;
use serde_yaml::Value;

/// A parsed but not yet validated workflow document.
///
/// This is nothing more than the generic YAML tree; the validator is the only
/// consumer that gives it meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    root: Value,
}

impl RawDocument {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn into_inner(self) -> Value {
        self.root
    }
}

impl From<Value> for RawDocument {
    fn from(root: Value) -> Self {
        Self::new(root)
    }
}

/// Parses YAML text into a [`RawDocument`].
///
/// An empty input loads as YAML `null`; rejecting it is left to the validator
/// so the user gets a regular diagnostic instead of a parser message.
pub fn load(text: &str) -> Result<RawDocument, SyntaxError> {
    if text.trim().is_empty() {
        return Ok(RawDocument::new(Value::Null));
    }
    let root: Value = serde_yaml::from_str(text)?;
    tracing::debug!("loaded workflow document");
    Ok(RawDocument::new(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_mapping() {
        let doc = load("name: demo\nnodes: []\n").expect("valid yaml");
        assert!(doc.root().is_mapping());
        assert_eq!(doc.root()["name"].as_str(), Some("demo"));
    }

    #[test]
    fn test_load_empty_is_null() {
        let doc = load("   \n").expect("empty input loads");
        assert!(doc.root().is_null());
    }

    #[test]
    fn test_load_reports_location() {
        let err = load("name: [unclosed\nnodes: x").unwrap_err();
        match err {
            SyntaxError::At { line, .. } => assert!(line >= 1),
            SyntaxError::Unlocated(msg) => panic!("expected a located error, got {}", msg),
        }
    }
}
