//! # Inputs Documents
//!
//! Tools describe a run in a textual inputs document. The server's
//! `/api/run` endpoint and the CLI both turn that text into a value tree
//! here, so local and remote derivation agree on every document.

use crate::error::InputsError;

/// Parse an inputs document into a JSON value tree.
///
/// Blank text is the empty object. JSON is tried first so its numbers keep
/// their exact form; anything else is read as YAML.
pub fn parse_inputs_document(text: &str) -> Result<serde_json::Value, InputsError> {
    if text.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    if let Ok(value) = serde_json::from_str(text) {
        return Ok(value);
    }
    serde_yaml::from_str(text).map_err(|e| InputsError::Unparseable(e.to_string()))
}
