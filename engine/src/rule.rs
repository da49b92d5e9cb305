//! Resource rule - the per-collection CRUD handler.
//!
//! A rule owns one collection (or one per client fingerprint) and answers the
//! standard operations against it. Every operation goes through the same
//! steps: an optional full handler override, the prefilter, the operation
//! itself, then the postfilter. The postfilter always sees the parameters the
//! caller passed in, not the prefiltered ones.

use crate::collections::{fingerprint, CollectionSet, DEFAULT_FINGERPRINT};
use crate::options::{
    RuleOptions, SpecialParams, DEFAULT_COLLECTION_KEY, DEFAULT_COUNT_KEY,
    DEFAULT_FINGERPRINT_HEADER,
};
use crate::query::{FilterFn, ListQuery, ParamFilter};
use crate::record::{field, infer_id_key, loosely_equal, shallow_merge};
use crate::{error::Result, Error, Filtered, Operation, Params, Record, RequestMeta, Response};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Rewrites parameters and body before an operation runs.
pub type PrefilterFn = Arc<dyn Fn(Params, Value, &RequestMeta) -> Filtered + Send + Sync>;
/// Rewrites the response after an operation runs.
pub type PostfilterFn = Arc<dyn Fn(&Params, Response, &RequestMeta) -> Response + Send + Sync>;
/// Replaces every standard operation of a rule.
pub type HandlerFn = Arc<dyn Fn(&Params, Value, &RequestMeta) -> Response + Send + Sync>;

/// Parameter carrying the item identifier.
pub const ID_PARAM: &str = "id";

/// The per-collection handler.
pub struct ResourceRule {
    id_key: String,
    collection_key: String,
    count_key: String,
    special: SpecialParams,
    path_params: Vec<String>,
    param_filters: Vec<ParamFilter>,
    prefilter: Option<PrefilterFn>,
    postfilter: Option<PostfilterFn>,
    handler: Option<HandlerFn>,
    fingerprinting: bool,
    fingerprint_header: String,
    collections: CollectionSet,
}

impl fmt::Debug for ResourceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRule")
            .field("id_key", &self.id_key)
            .field("collection_key", &self.collection_key)
            .field("count_key", &self.count_key)
            .field("special", &self.special)
            .field("path_params", &self.path_params)
            .field("param_filters", &self.param_filters)
            .field("prefilter", &self.prefilter.is_some())
            .field("postfilter", &self.postfilter.is_some())
            .field("handler", &self.handler.is_some())
            .field("fingerprinting", &self.fingerprinting)
            .field("records", &self.collection().len())
            .finish()
    }
}

impl ResourceRule {
    /// Create a rule over a collection.
    ///
    /// The collection is snapshotted for [`ResourceRule::reset`] and the
    /// identifier field is fixed here, from `options.id_key` or inferred from
    /// the first record.
    pub fn new(collection: Vec<Record>, options: RuleOptions) -> Self {
        let id_key = options
            .id_key
            .clone()
            .unwrap_or_else(|| infer_id_key(collection.first()));

        Self {
            id_key,
            collection_key: options
                .collection_key
                .clone()
                .unwrap_or_else(|| DEFAULT_COLLECTION_KEY.to_string()),
            count_key: options
                .count_key
                .clone()
                .unwrap_or_else(|| DEFAULT_COUNT_KEY.to_string()),
            special: SpecialParams::from_options(&options),
            path_params: Vec::new(),
            param_filters: Vec::new(),
            prefilter: None,
            postfilter: None,
            handler: None,
            fingerprinting: options.fingerprinting,
            fingerprint_header: options
                .fingerprint_header
                .unwrap_or_else(|| DEFAULT_FINGERPRINT_HEADER.to_string()),
            collections: CollectionSet::new(collection),
        }
    }

    /// Create a rule from a JSON value that must be an array.
    pub fn from_value(collection: Value, options: RuleOptions) -> Result<Self> {
        match collection {
            Value::Array(records) => Ok(Self::new(records, options)),
            other => Err(Error::CollectionNotArray(kind_of(&other).to_string())),
        }
    }

    /// Declare the path template parameters, which never act as filters.
    pub fn with_path_params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path_params = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn id_key(&self) -> &str {
        &self.id_key
    }

    pub fn collection_key(&self) -> &str {
        &self.collection_key
    }

    pub fn count_key(&self) -> &str {
        &self.count_key
    }

    pub fn special_params(&self) -> &SpecialParams {
        &self.special
    }

    pub fn path_params(&self) -> &[String] {
        &self.path_params
    }

    pub fn is_fingerprinting(&self) -> bool {
        self.fingerprinting
    }

    /// The snapshot taken at construction.
    pub fn original(&self) -> &[Record] {
        self.collections.original()
    }

    /// The shared (unfingerprinted) live collection.
    pub fn collection(&self) -> &[Record] {
        self.collections.get(DEFAULT_FINGERPRINT).unwrap_or_default()
    }

    /// The live collection a request would see, if it exists yet.
    pub fn collection_for(&self, meta: &RequestMeta) -> Option<&[Record]> {
        self.collections.get(&self.fingerprint_key(meta))
    }

    /// Number of live collections, one per fingerprint seen so far.
    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    pub fn set_prefilter<F>(&mut self, prefilter: F)
    where
        F: Fn(Params, Value, &RequestMeta) -> Filtered + Send + Sync + 'static,
    {
        self.prefilter = Some(Arc::new(prefilter));
    }

    pub fn set_postfilter<F>(&mut self, postfilter: F)
    where
        F: Fn(&Params, Response, &RequestMeta) -> Response + Send + Sync + 'static,
    {
        self.postfilter = Some(Arc::new(postfilter));
    }

    /// Route every operation to `handler`, bypassing the filters.
    pub fn set_handler<F>(&mut self, handler: F)
    where
        F: Fn(&Params, Value, &RequestMeta) -> Response + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
    }

    pub fn clear_handler(&mut self) {
        self.handler = None;
    }

    /// Add a custom list filter for a parameter.
    ///
    /// The parameter stops acting as an equality filter. The predicate only
    /// runs when the parameter is present.
    pub fn add_param_filter<F>(&mut self, param: impl Into<String>, filter: F)
    where
        F: Fn(&Record, &Value) -> bool + Send + Sync + 'static,
    {
        let filter: FilterFn = Arc::new(filter);
        self.param_filters.push(ParamFilter {
            param: param.into(),
            filter,
        });
    }

    /// Restore the just-constructed state, dropping all per-client copies.
    pub fn reset(&mut self) {
        tracing::debug!(id_key = %self.id_key, "Resetting rule");
        self.collections.reset();
    }

    /// Run an operation by name.
    pub fn call(
        &mut self,
        op: Operation,
        params: &Params,
        data: Value,
        meta: &RequestMeta,
    ) -> Response {
        match op {
            Operation::GetCollection => self.get_collection(params, data, meta),
            Operation::GetItem => self.get_item(params, data, meta),
            Operation::AddItem => self.add_item(params, data, meta),
            Operation::ReplaceCollection => self.replace_collection(params, data, meta),
            Operation::ReplaceItem => self.replace_item(params, data, meta),
            Operation::ExtendCollection => self.extend_collection(params, data, meta),
            Operation::ExtendItem => self.extend_item(params, data, meta),
            Operation::DeleteCollection => self.delete_collection(params, data, meta),
            Operation::DeleteItem => self.delete_item(params, data, meta),
        }
    }

    /// List the collection with search, filters, sorting and pagination.
    pub fn get_collection(&mut self, params: &Params, data: Value, meta: &RequestMeta) -> Response {
        self.run(params, data, meta, |rule, filtered, key| {
            let query = ListQuery::from_params(
                &filtered.params,
                &rule.special,
                &rule.param_filters,
                &rule.path_params,
            );
            let collection = rule.collections.working_mut(key);
            let page = query.run(collection, &filtered.params, &rule.param_filters);
            Response::ok(envelope(
                &rule.collection_key,
                &rule.count_key,
                page.items,
                page.total,
            ))
        })
    }

    /// Fetch the record whose identifier matches `params.id`.
    pub fn get_item(&mut self, params: &Params, data: Value, meta: &RequestMeta) -> Response {
        self.run(params, data, meta, |rule, filtered, key| {
            let collection = rule.collections.working_mut(key);
            match position(collection, &rule.id_key, filtered.params.get(ID_PARAM)) {
                Some(index) => Response::ok(collection[index].clone()),
                None => Response::not_found(None),
            }
        })
    }

    /// Append the body to the collection.
    pub fn add_item(&mut self, params: &Params, data: Value, meta: &RequestMeta) -> Response {
        self.run(params, data, meta, |rule, filtered, key| {
            rule.collections.working_mut(key).push(filtered.data.clone());
            Response::ok(filtered.data)
        })
    }

    /// Overwrite the record matching `params.id` with the body.
    pub fn replace_item(&mut self, params: &Params, data: Value, meta: &RequestMeta) -> Response {
        self.run(params, data, meta, |rule, filtered, key| {
            let collection = rule.collections.working_mut(key);
            match position(collection, &rule.id_key, filtered.params.get(ID_PARAM)) {
                Some(index) => {
                    collection[index] = filtered.data.clone();
                    Response::ok(filtered.data)
                }
                None => Response::not_found(Some(Value::Null)),
            }
        })
    }

    /// Merge the body's fields into the record matching `params.id`.
    pub fn extend_item(&mut self, params: &Params, data: Value, meta: &RequestMeta) -> Response {
        self.run(params, data, meta, |rule, filtered, key| {
            let collection = rule.collections.working_mut(key);
            match position(collection, &rule.id_key, filtered.params.get(ID_PARAM)) {
                Some(index) => {
                    shallow_merge(&mut collection[index], &filtered.data);
                    Response::ok(collection[index].clone())
                }
                None => Response::not_found(Some(Value::Null)),
            }
        })
    }

    /// Remove the record matching `params.id`.
    pub fn delete_item(&mut self, params: &Params, data: Value, meta: &RequestMeta) -> Response {
        self.run(params, data, meta, |rule, filtered, key| {
            let collection = rule.collections.working_mut(key);
            match position(collection, &rule.id_key, filtered.params.get(ID_PARAM)) {
                Some(index) => Response::ok(collection.remove(index)),
                None => Response::not_found(Some(Value::Null)),
            }
        })
    }

    /// Empty the collection.
    pub fn delete_collection(&mut self, params: &Params, data: Value, meta: &RequestMeta) -> Response {
        self.run(params, data, meta, |rule, _, key| {
            rule.collections.working_mut(key).clear();
            Response::ok(envelope(&rule.collection_key, &rule.count_key, Vec::new(), 0))
        })
    }

    /// Merge each element of the body into the existing record with its id.
    ///
    /// Elements without a matching record are skipped, never added. The
    /// response lists the merged records in merge order.
    pub fn extend_collection(&mut self, params: &Params, data: Value, meta: &RequestMeta) -> Response {
        self.run(params, data, meta, |rule, filtered, key| {
            let collection = rule.collections.working_mut(key);
            let mut merged = Vec::new();
            for patch in into_records(filtered.data) {
                let patch_id = field(&patch, &rule.id_key);
                for record in collection.iter_mut() {
                    if loosely_equal(field(record, &rule.id_key), patch_id) {
                        shallow_merge(record, &patch);
                        merged.push(record.clone());
                    }
                }
            }
            Response::ok(Value::Array(merged))
        })
    }

    /// Make the body the entire collection.
    pub fn replace_collection(&mut self, params: &Params, data: Value, meta: &RequestMeta) -> Response {
        self.run(params, data, meta, |rule, filtered, key| {
            let collection = rule.collections.working_mut(key);
            *collection = into_records(filtered.data);
            let total = collection.len();
            let items = collection.clone();
            Response::ok(envelope(&rule.collection_key, &rule.count_key, items, total))
        })
    }

    fn fingerprint_key(&self, meta: &RequestMeta) -> String {
        if self.fingerprinting {
            fingerprint(meta.header(&self.fingerprint_header))
        } else {
            DEFAULT_FINGERPRINT.to_string()
        }
    }

    /// Shared wrapper: handler override, prefilter, operation, postfilter.
    fn run<F>(&mut self, params: &Params, data: Value, meta: &RequestMeta, op: F) -> Response
    where
        F: FnOnce(&mut Self, Filtered, &str) -> Response,
    {
        if let Some(handler) = &self.handler {
            return handler(params, data, meta);
        }

        let filtered = match &self.prefilter {
            Some(prefilter) => prefilter(params.clone(), data, meta),
            None => Filtered {
                params: params.clone(),
                data,
            },
        };

        let key = self.fingerprint_key(meta);
        let response = op(self, filtered, &key);

        match &self.postfilter {
            Some(postfilter) => postfilter(params, response, meta),
            None => response,
        }
    }
}

/// Index of the first record whose identifier matches.
fn position(collection: &[Record], id_key: &str, id: Option<&Value>) -> Option<usize> {
    collection
        .iter()
        .position(|record| loosely_equal(field(record, id_key), id))
}

/// A body as a list of records; a non-array body is a single record.
fn into_records(data: Value) -> Vec<Record> {
    match data {
        Value::Array(records) => records,
        other => vec![other],
    }
}

/// The list response body.
fn envelope(collection_key: &str, count_key: &str, items: Vec<Record>, total: usize) -> Value {
    let mut body = Map::new();
    body.insert(collection_key.to_string(), Value::Array(items));
    body.insert(count_key.to_string(), Value::from(total));
    Value::Object(body)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
