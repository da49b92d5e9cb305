//! # Mockrest Engine
//!
//! In-memory REST resources for mock servers and tests.
//!
//! A [`ResourceRule`] owns a collection of JSON records and answers the
//! standard REST operations against it: list, fetch, create, replace, patch
//! and delete, at collection and item granularity. Listing supports text
//! search, field equality filters, custom filters, stable sorting and
//! offset/limit pagination.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine knows nothing about sockets, paths or bodies
//! - **Schemaless**: records are plain JSON values, identifiers compare by
//!   their string form so `1` and `"1"` are the same id
//! - **Never fails at request time**: a missing record is a `404` response,
//!   not an error
//! - **Resettable**: the collection handed to a rule is snapshotted and
//!   [`ResourceRule::reset`] restores it
//!
//! ## Core Concepts
//!
//! ### Identifier inference
//!
//! Unless [`RuleOptions::id_key`] is set, the identifier field is guessed once
//! from the first record: `id`, else the first field ending in `Id`, else the
//! first field, else `id`.
//!
//! ### Hooks
//!
//! - a prefilter rewrites parameters and body before each operation
//! - a postfilter rewrites each response, seeing the original parameters
//! - a handler replaces all operations of a rule
//! - parameter filters add custom list predicates
//!
//! ### Fingerprinting
//!
//! With [`RuleOptions::fingerprinting`] enabled, every distinct client
//! (identified by a request header) gets its own copy of the collection.
//!
//! ## Quick Start
//!
//! ```rust
//! use mockrest_engine::{Params, RequestMeta, ResourceRule, RuleOptions};
//! use serde_json::{json, Value};
//!
//! let mut rule = ResourceRule::new(
//!     vec![
//!         json!({"id": 1, "name": "Alice"}),
//!         json!({"id": 2, "name": "Bob"}),
//!     ],
//!     RuleOptions::new(),
//! );
//!
//! let mut params = Params::new();
//! params.insert("q".into(), json!("Bo"));
//! let response = rule.get_collection(&params, Value::Null, &RequestMeta::none());
//!
//! assert_eq!(response.status, 200);
//! assert_eq!(
//!     response.data,
//!     Some(json!({"items": [{"id": 2, "name": "Bob"}], "total": 1}))
//! );
//! ```

pub mod collections;
pub mod error;
pub mod operation;
pub mod options;
pub mod query;
pub mod record;
pub mod response;
pub mod rule;

// Re-export main types at crate root
pub use collections::{fingerprint, CollectionSet, DEFAULT_FINGERPRINT};
pub use error::{Error, Result};
pub use operation::Operation;
pub use options::{ParamAliases, RuleOptions, SpecialParams};
pub use query::{FilterFn, ListQuery, Page, ParamFilter, SortDir};
pub use record::Record;
pub use response::{Filtered, RequestMeta, Response};
pub use rule::{HandlerFn, PostfilterFn, PrefilterFn, ResourceRule, ID_PARAM};

/// Path and query parameters of a request, in the order they were given.
pub type Params = serde_json::Map<String, serde_json::Value>;
