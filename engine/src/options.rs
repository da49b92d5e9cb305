//! Rule configuration.
//!
//! Options can be built in code or deserialized from fixture files. Hooks are
//! deliberately absent: prefilters, postfilters, handlers and parameter
//! filters are attached to a [`crate::ResourceRule`] after construction.

use serde::{Deserialize, Serialize};

/// Default response envelope key holding the page of records.
pub const DEFAULT_COLLECTION_KEY: &str = "items";
/// Default response envelope key holding the filtered total.
pub const DEFAULT_COUNT_KEY: &str = "total";
/// Header used to tell clients apart when fingerprinting is enabled.
pub const DEFAULT_FINGERPRINT_HEADER: &str = "user-agent";

/// An ordered set of accepted names for one special parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany", into = "Vec<String>")]
pub struct ParamAliases(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for ParamAliases {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(name) => Self::new([name]),
            OneOrMany::Many(names) => Self::new(names),
        }
    }
}

impl From<ParamAliases> for Vec<String> {
    fn from(aliases: ParamAliases) -> Self {
        aliases.0
    }
}

impl ParamAliases {
    /// Build an alias set, dropping duplicates but keeping first-seen order.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut aliases: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !aliases.contains(&name) {
                aliases.push(name);
            }
        }
        Self(aliases)
    }

    /// Check whether a parameter name is one of the aliases.
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|alias| alias == name)
    }

    /// Iterate the aliases.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Named optional settings for a [`crate::ResourceRule`].
///
/// Every field left as `None` takes the documented default at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct RuleOptions {
    /// Identifier field; inferred from the first record when unset
    pub id_key: Option<String>,
    /// Envelope key for the page of records (`items`)
    pub collection_key: Option<String>,
    /// Envelope key for the filtered total (`total`)
    pub count_key: Option<String>,
    /// Aliases for the offset parameter (`offset`)
    pub offset_param: Option<ParamAliases>,
    /// Aliases for the limit parameter (`limit`)
    pub limit_param: Option<ParamAliases>,
    /// Aliases for the text search parameter (`query`, `q`)
    pub query_param: Option<ParamAliases>,
    /// Aliases for the sort field parameter (`sortBy`)
    pub sort_by_param: Option<ParamAliases>,
    /// Aliases for the sort direction parameter (`sortDir`)
    pub sort_dir_param: Option<ParamAliases>,
    /// Keep an isolated copy of the collection per client
    pub fingerprinting: bool,
    /// Header the client fingerprint is derived from (`user-agent`)
    pub fingerprint_header: Option<String>,
}

impl RuleOptions {
    /// Options with every default.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_key(mut self, key: impl Into<String>) -> Self {
        self.id_key = Some(key.into());
        self
    }

    pub fn with_collection_key(mut self, key: impl Into<String>) -> Self {
        self.collection_key = Some(key.into());
        self
    }

    pub fn with_count_key(mut self, key: impl Into<String>) -> Self {
        self.count_key = Some(key.into());
        self
    }

    pub fn with_offset_param<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.offset_param = Some(ParamAliases::new(names));
        self
    }

    pub fn with_limit_param<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.limit_param = Some(ParamAliases::new(names));
        self
    }

    pub fn with_query_param<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query_param = Some(ParamAliases::new(names));
        self
    }

    pub fn with_sort_by_param<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort_by_param = Some(ParamAliases::new(names));
        self
    }

    pub fn with_sort_dir_param<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort_dir_param = Some(ParamAliases::new(names));
        self
    }

    /// Enable per-client collections keyed by the given header.
    pub fn with_fingerprinting(mut self, header: impl Into<String>) -> Self {
        self.fingerprinting = true;
        self.fingerprint_header = Some(header.into());
        self
    }

    /// Parse options from a JSON value, as found in fixture files.
    pub fn from_value(value: serde_json::Value) -> crate::Result<Self> {
        serde_json::from_value(value).map_err(|e| crate::Error::InvalidOptions(e.to_string()))
    }
}

/// Fully resolved special parameter names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialParams {
    pub offset: ParamAliases,
    pub limit: ParamAliases,
    pub query: ParamAliases,
    pub sort_by: ParamAliases,
    pub sort_dir: ParamAliases,
}

impl Default for SpecialParams {
    fn default() -> Self {
        Self {
            offset: ParamAliases::new(["offset"]),
            limit: ParamAliases::new(["limit"]),
            query: ParamAliases::new(["query", "q"]),
            sort_by: ParamAliases::new(["sortBy"]),
            sort_dir: ParamAliases::new(["sortDir"]),
        }
    }
}

impl SpecialParams {
    /// Apply any overrides from the options on top of the defaults.
    pub fn from_options(options: &RuleOptions) -> Self {
        let defaults = Self::default();
        Self {
            offset: options.offset_param.clone().unwrap_or(defaults.offset),
            limit: options.limit_param.clone().unwrap_or(defaults.limit),
            query: options.query_param.clone().unwrap_or(defaults.query),
            sort_by: options.sort_by_param.clone().unwrap_or(defaults.sort_by),
            sort_dir: options.sort_dir_param.clone().unwrap_or(defaults.sort_dir),
        }
    }

    /// Whether a parameter name is reserved for list control.
    pub fn contains(&self, name: &str) -> bool {
        self.offset.contains(name)
            || self.limit.contains(name)
            || self.query.contains(name)
            || self.sort_by.contains(name)
            || self.sort_dir.contains(name)
    }
}
