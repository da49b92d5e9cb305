//! Request and response envelopes passed through rule operations.

use crate::Params;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Normalized outcome of a rule operation.
///
/// `data` of `None` means "no body". Headers are applied on top of the
/// transport defaults, so a postfilter can change the content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
}

impl Response {
    /// A response with the given status and payload.
    pub fn new(status: u16, data: Option<Value>) -> Self {
        Self {
            status,
            data,
            headers: Vec::new(),
        }
    }

    /// `200` with a payload.
    pub fn ok(data: Value) -> Self {
        Self::new(200, Some(data))
    }

    /// `404` with whatever the operation reports for a miss.
    pub fn not_found(data: Option<Value>) -> Self {
        Self::new(404, data)
    }

    /// Add a header, replacing an earlier one with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Look up a header case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Information about the incoming request, for hooks and fingerprinting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub method: String,
    pub url: String,
    /// Header names are stored lower-cased
    pub headers: BTreeMap<String, String>,
}

impl RequestMeta {
    /// Metadata for a direct call that did not come from a request.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Output of a prefilter: the parameters and body the operation should use.
#[derive(Debug, Clone, PartialEq)]
pub struct Filtered {
    pub params: Params,
    pub data: Value,
}
