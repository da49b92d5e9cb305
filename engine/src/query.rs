//! The list pipeline: search, filter, sort and paginate a collection.
//!
//! Every filter stage is intersected and evaluated before pagination, so the
//! reported total is always the number of matches, not the page size.

use crate::options::{ParamAliases, SpecialParams};
use crate::record::{compare_values, field, is_truthy, loosely_equal, to_js_string};
use crate::{Params, Record};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether a record matches a custom parameter value.
pub type FilterFn = Arc<dyn Fn(&Record, &Value) -> bool + Send + Sync>;

/// A custom filter bound to one parameter name.
#[derive(Clone)]
pub struct ParamFilter {
    pub param: String,
    pub filter: FilterFn,
}

impl fmt::Debug for ParamFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamFilter")
            .field("param", &self.param)
            .finish_non_exhaustive()
    }
}

/// Sort direction taken from the sort direction parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    /// `desc` in any case is descending; anything else is ascending.
    pub fn parse(value: Option<&Value>) -> Self {
        match value {
            Some(value) if is_truthy(value) && to_js_string(Some(value)).to_lowercase() == "desc" => {
                SortDir::Desc
            }
            _ => SortDir::Asc,
        }
    }
}

/// List controls resolved from the request parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery<'p> {
    /// Substring every match must contain in at least one field
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_dir: SortDir,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    /// Field equality filters, in parameter order
    pub equality: Vec<(&'p str, &'p Value)>,
}

/// Value of the first parameter, in parameter order, named by any alias.
fn first_param_value<'p>(params: &'p Params, aliases: &ParamAliases) -> Option<&'p Value> {
    params
        .iter()
        .find(|(key, _)| aliases.contains(key))
        .map(|(_, value)| value)
}

/// Parse a pagination value.
///
/// Strings are read up to the first non-digit (`"5abc"` is 5). Falsy,
/// unparseable and negative values yield `None`, meaning "use the default".
pub fn parse_index(value: &Value) -> Option<usize> {
    if !is_truthy(value) {
        return None;
    }
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(u) => usize::try_from(u).ok(),
            None => n
                .as_f64()
                .filter(|f| *f >= 0.0 && f.is_finite())
                .map(|f| f.trunc() as usize),
        },
        Value::String(s) => {
            let s = s.trim_start();
            let digits = s.strip_prefix('+').unwrap_or(s);
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            digits[..end].parse().ok()
        }
        _ => None,
    }
}

impl<'p> ListQuery<'p> {
    /// Split parameters into list controls and equality filters.
    ///
    /// Special parameters, custom filter parameters and path parameters never
    /// act as equality filters.
    pub fn from_params(
        params: &'p Params,
        special: &SpecialParams,
        filters: &[ParamFilter],
        path_params: &[String],
    ) -> Self {
        let search = first_param_value(params, &special.query)
            .filter(|value| is_truthy(value))
            .map(|value| to_js_string(Some(value)));

        let sort_by = first_param_value(params, &special.sort_by)
            .filter(|value| is_truthy(value))
            .map(|value| to_js_string(Some(value)));

        let sort_dir = SortDir::parse(first_param_value(params, &special.sort_dir));
        let offset = first_param_value(params, &special.offset).and_then(parse_index);
        let limit = first_param_value(params, &special.limit).and_then(parse_index);

        let equality = params
            .iter()
            .filter(|(key, _)| !special.contains(key))
            .filter(|(key, _)| !filters.iter().any(|f| &f.param == *key))
            .filter(|(key, _)| !path_params.iter().any(|p| p == *key))
            .map(|(key, value)| (key.as_str(), value))
            .collect();

        Self {
            search,
            sort_by,
            sort_dir,
            offset,
            limit,
            equality,
        }
    }

    /// Whether a record passes the search, equality and custom filters.
    pub fn matches(&self, record: &Record, params: &Params, filters: &[ParamFilter]) -> bool {
        if let Some(text) = &self.search {
            let found = record.as_object().is_some_and(|fields| {
                fields
                    .values()
                    .any(|value| to_js_string(Some(value)).contains(text.as_str()))
            });
            if !found {
                return false;
            }
        }

        let equal = self
            .equality
            .iter()
            .all(|(key, value)| loosely_equal(field(record, key), Some(*value)));
        if !equal {
            return false;
        }

        filters.iter().all(|f| match params.get(&f.param) {
            Some(value) => (f.filter)(record, value),
            None => true,
        })
    }

    /// Run the whole pipeline over a collection.
    ///
    /// Without an explicit limit the page is as large as the unfiltered
    /// collection, i.e. unbounded.
    pub fn run(&self, collection: &[Record], params: &Params, filters: &[ParamFilter]) -> Page {
        if let Some(text) = &self.search {
            tracing::debug!(search = %text, "Searching for text");
        }
        if !self.equality.is_empty() {
            let keys: Vec<&str> = self.equality.iter().map(|(key, _)| *key).collect();
            tracing::debug!(?keys, "Filtering against properties");
        }

        let mut matched: Vec<&Record> = collection
            .iter()
            .filter(|record| self.matches(record, params, filters))
            .collect();

        if let Some(sort_by) = &self.sort_by {
            tracing::debug!(sort_by = %sort_by, dir = ?self.sort_dir, "Sorting");
            // sort_by is stable, ties keep collection order in both directions
            match self.sort_dir {
                SortDir::Asc => matched.sort_by(|a, b| {
                    compare_values(field(a, sort_by), field(b, sort_by))
                }),
                SortDir::Desc => matched.sort_by(|a, b| {
                    compare_values(field(b, sort_by), field(a, sort_by))
                }),
            }
        }

        let total = matched.len();
        let offset = self.offset.unwrap_or(0);
        let limit = self.limit.unwrap_or(collection.len());
        tracing::debug!(limit, offset, "Returning page");

        let items = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Page { items, total }
    }
}

/// One page of a filtered collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Record>,
    /// Matches before pagination
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    fn collection() -> Vec<Record> {
        vec![
            json!({"id": 1, "foo": "baz", "n": 3}),
            json!({"id": 2, "foo": "bar", "n": 1}),
            json!({"id": 3, "foo": "pax", "n": 2}),
        ]
    }

    fn run(p: &Params) -> Page {
        ListQuery::from_params(p, &SpecialParams::default(), &[], &[]).run(&collection(), p, &[])
    }

    fn ids(page: &Page) -> Vec<i64> {
        page.items.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn index_parsing() {
        assert_eq!(parse_index(&json!("5")), Some(5));
        assert_eq!(parse_index(&json!("5abc")), Some(5));
        assert_eq!(parse_index(&json!(" 7")), Some(7));
        assert_eq!(parse_index(&json!("0")), Some(0));
        assert_eq!(parse_index(&json!("abc")), None);
        assert_eq!(parse_index(&json!("-2")), None);
        assert_eq!(parse_index(&json!("")), None);
        assert_eq!(parse_index(&json!(0)), None);
        assert_eq!(parse_index(&json!(3)), Some(3));
        assert_eq!(parse_index(&json!(2.9)), Some(2));
        assert_eq!(parse_index(&json!(-1)), None);
    }

    #[test]
    fn sort_dir_parsing() {
        assert_eq!(SortDir::parse(Some(&json!("DESC"))), SortDir::Desc);
        assert_eq!(SortDir::parse(Some(&json!("asc"))), SortDir::Asc);
        assert_eq!(SortDir::parse(Some(&json!("sideways"))), SortDir::Asc);
        assert_eq!(SortDir::parse(None), SortDir::Asc);
    }

    #[test]
    fn first_alias_in_parameter_order_wins() {
        let p = params(json!({"q": "pax", "query": "ba"}));
        let page = run(&p);
        assert_eq!(ids(&page), vec![3]);
    }

    #[test]
    fn search_and_equality_intersect() {
        let p = params(json!({"query": "ba", "foo": "bar"}));
        let page = run(&p);
        assert_eq!(ids(&page), vec![2]);
        assert_eq!(page.total, 1);
    }

    #[test]
    fn numeric_sort_both_directions() {
        let page = run(&params(json!({"sortBy": "n"})));
        assert_eq!(ids(&page), vec![2, 3, 1]);

        let page = run(&params(json!({"sortBy": "n", "sortDir": "desc"})));
        assert_eq!(ids(&page), vec![1, 3, 2]);
    }

    #[test]
    fn pagination_keeps_filtered_total() {
        let page = run(&params(json!({"offset": "1", "limit": "1"})));
        assert_eq!(ids(&page), vec![2]);
        assert_eq!(page.total, 3);

        let page = run(&params(json!({"offset": "5"})));
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);

        let page = run(&params(json!({"limit": "0"})));
        assert!(page.items.is_empty());
    }

    #[test]
    fn unparseable_pagination_uses_defaults() {
        let page = run(&params(json!({"offset": "abc", "limit": "nope"})));
        assert_eq!(ids(&page), vec![1, 2, 3]);
    }

    #[test]
    fn excluded_names_are_not_equality_filters() {
        let filters = vec![ParamFilter {
            param: "minN".into(),
            filter: Arc::new(|record, value| {
                record["n"].as_i64().unwrap_or(0) >= to_js_string(Some(value)).parse().unwrap_or(0)
            }),
        }];
        let p = params(json!({"tenant": "acme", "minN": "2", "limit": "10"}));
        let query = ListQuery::from_params(
            &p,
            &SpecialParams::default(),
            &filters,
            &["tenant".to_string()],
        );
        assert!(query.equality.is_empty());

        let page = query.run(&collection(), &p, &filters);
        assert_eq!(ids(&page), vec![1, 3]);
    }
}
