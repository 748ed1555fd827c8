//! Filters and keyset-paged list queries.

use std::{cmp::Ordering, fmt};

use serde_json::Value;

use crate::models::Record;

/// Records fetched per page by every paged walk in the worker.
pub const PAGE_SIZE: usize = 50;

/// One predicate of a filter set. A record matches a set when it matches
/// every filter in it.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Record belongs to this collection.
    Collection(String),
    /// Attribute equals the value.
    Equal(String, Value),
    /// Attribute is strictly less than the value (numbers or strings).
    LessThan(String, Value),
}

impl Filter {
    pub fn collection(tag: impl Into<String>) -> Self {
        Self::Collection(tag.into())
    }

    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equal(attribute.into(), value.into())
    }

    pub fn less_than(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::LessThan(attribute.into(), value.into())
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::Collection(tag) => record.collection == *tag,
            Filter::Equal(attribute, expected) => record
                .attribute(attribute)
                .is_some_and(|actual| compare(actual, expected) == Some(Ordering::Equal)),
            Filter::LessThan(attribute, bound) => record
                .attribute(attribute)
                .is_some_and(|actual| compare(actual, bound) == Some(Ordering::Less)),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Collection(tag) => write!(f, "$collection={}", tag),
            Filter::Equal(attribute, value) => write!(f, "{}={}", attribute, value),
            Filter::LessThan(attribute, value) => write!(f, "{}<{}", attribute, value),
        }
    }
}

/// Orders two attribute values. Mixed or non-scalar types are incomparable.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (l.as_i64(), r.as_i64()) {
            (Some(l), Some(r)) => Some(l.cmp(&r)),
            _ => l.as_f64()?.partial_cmp(&r.as_f64()?),
        },
        (Value::String(l), Value::String(r)) => Some(l.as_str().cmp(r.as_str())),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

/// A page request: records matching every filter, ordered by id ascending
/// (byte-wise string order), strictly after `after` when set.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub limit: usize,
    pub after: Option<String>,
}

impl ListQuery {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self {
            filters,
            limit: PAGE_SIZE,
            after: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn after(mut self, id: impl Into<String>) -> Self {
        self.after = Some(id.into());
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|filter| filter.matches(record))
    }

    /// Filters rendered for logs, e.g. `$collection=tags, functionId="f1"`.
    pub fn describe(&self) -> String {
        self.filters
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
