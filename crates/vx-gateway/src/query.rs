//! Query descriptors and their evaluation
//!
//! A [`QueryDescriptor`] names a collection plus filter, sort and limit
//! parameters. It is immutable once handed to a gateway: changing any part of
//! a query means building a new descriptor and opening a new subscription.
//!
//! Evaluation follows document-store semantics:
//! - range filters only match values of the same type
//! - documents missing an `order_by` field are excluded from the result
//! - ties are broken by document identifier

use crate::document::{Document, DocumentRef};
use crate::error::GatewayError;
use serde_json::Value;
use std::cmp::Ordering;

/// Filter comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// Array field contains the operand
    ArrayContains,
    /// Field equals one of the operand array's elements
    In,
}

/// Single field filter
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field path (dotted for nested fields)
    pub field: String,
    /// Operator
    pub op: FilterOp,
    /// Operand
    pub value: Value,
}

impl Filter {
    /// Check whether a document satisfies this filter
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.field(&self.field) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => values_equal(actual, &self.value),
            FilterOp::NotEq => !values_equal(actual, &self.value),
            FilterOp::Lt => compare_values(actual, &self.value) == Some(Ordering::Less),
            FilterOp::Le => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::Gt => compare_values(actual, &self.value) == Some(Ordering::Greater),
            FilterOp::Ge => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::ArrayContains => actual
                .as_array()
                .is_some_and(|items| items.iter().any(|v| values_equal(v, &self.value))),
            FilterOp::In => self
                .value
                .as_array()
                .is_some_and(|items| items.iter().any(|v| values_equal(actual, v))),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

/// Sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Field path
    pub field: String,
    /// Direction
    pub direction: Direction,
}

/// Collection query: filters, sort keys and an optional limit
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    /// Collection name
    pub collection: String,
    /// Conjunction of filters
    pub filters: Vec<Filter>,
    /// Sort keys, applied in order
    pub order_by: Vec<OrderBy>,
    /// Maximum number of documents
    pub limit: Option<usize>,
}

impl QueryDescriptor {
    /// Query over a whole collection
    #[inline]
    #[must_use]
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Add a filter
    #[inline]
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Add an equality filter
    #[inline]
    #[must_use]
    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    /// Add a sort key
    #[inline]
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Bound the result window
    #[inline]
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check descriptor shape
    ///
    /// # Errors
    /// - `GatewayError::InvalidQuery` for an empty collection or field name,
    ///   a zero limit, or an `in` filter whose operand is not an array
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.collection.trim().is_empty() {
            return Err(GatewayError::InvalidQuery("collection name is empty".into()));
        }
        if self.limit == Some(0) {
            return Err(GatewayError::InvalidQuery("limit must be positive".into()));
        }
        for filter in &self.filters {
            if filter.field.trim().is_empty() {
                return Err(GatewayError::InvalidQuery("filter field is empty".into()));
            }
            if filter.op == FilterOp::In && !filter.value.is_array() {
                return Err(GatewayError::InvalidQuery(format!(
                    "`in` filter on {} needs an array operand",
                    filter.field
                )));
            }
        }
        if self.order_by.iter().any(|o| o.field.trim().is_empty()) {
            return Err(GatewayError::InvalidQuery("sort field is empty".into()));
        }
        Ok(())
    }

    /// Evaluate the query over a set of documents
    #[must_use]
    pub fn apply<'a>(&self, documents: impl IntoIterator<Item = &'a Document>) -> Vec<Document> {
        let mut matched: Vec<&Document> = documents
            .into_iter()
            .filter(|doc| self.filters.iter().all(|f| f.matches(doc)))
            .filter(|doc| self.order_by.iter().all(|o| doc.field(&o.field).is_some()))
            .collect();

        matched.sort_by(|a, b| {
            for key in &self.order_by {
                let ord = match (a.field(&key.field), b.field(&key.field)) {
                    (Some(x), Some(y)) => total_order(x, y),
                    _ => Ordering::Equal,
                };
                let ord = match key.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.id.cmp(&b.id)
        });

        let limit = self.limit.unwrap_or(usize::MAX);
        matched.into_iter().take(limit).cloned().collect()
    }
}

/// What a push channel listens to
#[derive(Debug, Clone, PartialEq)]
pub enum ListenTarget {
    /// Live query over a collection
    Query(QueryDescriptor),
    /// Single document
    Document(DocumentRef),
}

impl ListenTarget {
    /// Collection the target lives in
    #[inline]
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::Query(q) => &q.collection,
            Self::Document(r) => &r.collection,
        }
    }
}

impl std::fmt::Display for ListenTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query(q) => write!(f, "query:{}", q.collection),
            Self::Document(r) => write!(f, "doc:{r}"),
        }
    }
}

/// One push event: the complete current result set
///
/// A snapshot always replaces whatever the consumer held before. There is no
/// incremental form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSnapshot {
    /// Documents in query order
    pub documents: Vec<Document>,
}

impl RawSnapshot {
    /// Create new snapshot
    #[inline]
    #[must_use]
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Number of documents
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if snapshot is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Same-type comparison; `None` across types
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Sort order across all types: type rank first, then value
fn total_order(a: &Value, b: &Value) -> Ordering {
    compare_values(a, b).unwrap_or_else(|| type_rank(a).cmp(&type_rank(b)))
}
