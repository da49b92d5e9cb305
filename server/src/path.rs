//! Path templates and request parameters.
//!
//! A resource registered at `/users/:userId/posts` answers both
//! `/users/7/posts` and `/users/7/posts/<id>`; the optional trailing id
//! segment is added to every template, which is why templates may not declare
//! `:id` themselves. Matching is case-sensitive and tolerates one trailing
//! slash.

use mockrest_engine::Params;
use serde_json::Value;
use std::fmt;

/// Errors compiling a path template.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("a path must be given for a resource")]
    Empty,

    #[error("path '{0}' declares ':id', which is reserved for the item id")]
    ReservedId(String),

    #[error("path '{path}' has an invalid parameter name ':{name}'")]
    InvalidParam { path: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled resource path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    template: String,
    segments: Vec<Segment>,
}

/// Values captured by a successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMatch {
    /// Template parameters, in template order
    pub params: Vec<(String, String)>,
    /// The trailing item id, when present
    pub id: Option<String>,
}

impl PathPattern {
    /// Compile a template such as `/foo/:fooId/bar`.
    pub fn compile(template: &str) -> Result<Self, PathError> {
        let template = template.trim();
        if template.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        for part in template.split('/').filter(|part| !part.is_empty()) {
            match part.strip_prefix(':') {
                Some("id") => return Err(PathError::ReservedId(template.to_string())),
                Some(name) => {
                    let valid = !name.is_empty()
                        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
                    if !valid {
                        return Err(PathError::InvalidParam {
                            path: template.to_string(),
                            name: name.to_string(),
                        });
                    }
                    segments.push(Segment::Param(name.to_string()));
                }
                None => segments.push(Segment::Literal(part.to_string())),
            }
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    /// The template as registered.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Names of the template parameters, in order.
    pub fn param_names(&self) -> Vec<String> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Param(name) => Some(name.clone()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Match a request path (without query string).
    pub fn matches(&self, path: &str) -> Option<PathMatch> {
        let path = path.strip_prefix('/').unwrap_or(path);
        let path = path.strip_suffix('/').unwrap_or(path);
        let parts: Vec<&str> = if path.is_empty() {
            Vec::new()
        } else {
            path.split('/').collect()
        };

        let n = self.segments.len();
        if parts.len() != n && parts.len() != n + 1 {
            return None;
        }
        if parts.iter().any(|part| part.is_empty()) {
            return None;
        }

        let mut matched = PathMatch::default();
        for (segment, part) in self.segments.iter().zip(&parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => matched.params.push((name.clone(), decode(part))),
            }
        }
        matched.id = parts.get(n).map(|id| decode(id));

        Some(matched)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/:id?", self.template.trim_end_matches('/'))
    }
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Collect decoded key/value pairs into parameters.
///
/// Pairs keep their order; a repeated key collects its values into an array.
pub fn params_from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Params {
    let mut params = Params::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match params.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                params.insert(key, value);
            }
        }
    }
    params
}
