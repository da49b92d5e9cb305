//! Request body parsing.
//!
//! JSON and form-encoded bodies are accepted. An empty body reads as `null`
//! whatever its content type.

use crate::path::params_from_pairs;
use serde_json::Value;

/// Reasons a body could not be read.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("Could not parse content type header: {0}")]
    UnsupportedContentType(String),

    #[error("Malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed form body: {0}")]
    Form(#[from] serde_urlencoded::de::Error),
}

/// Parse a body according to its `Content-Type`.
pub fn read_body(content_type: Option<&str>, bytes: &[u8]) -> Result<Value, BodyError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }

    let raw_type = content_type.unwrap_or_default();
    let mime = raw_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if mime == "application/json" || mime.ends_with("+json") {
        Ok(serde_json::from_slice(bytes)?)
    } else if mime == "application/x-www-form-urlencoded" {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes)?;
        Ok(Value::Object(params_from_pairs(pairs)))
    } else {
        Err(BodyError::UnsupportedContentType(raw_type.to_string()))
    }
}
