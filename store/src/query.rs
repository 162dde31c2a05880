//! Collection queries: equality/array-containment filters and a single sort.
//!
//! Both backends evaluate queries with [`Query::apply`] so that filtering and
//! ordering behave identically in memory and on disk.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Fields;

/// Filter operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    /// Field equals the value.
    #[serde(rename = "==")]
    Eq,
    /// Field is an array containing the value.
    #[serde(rename = "array-contains")]
    ArrayContains,
}

/// A `(field, operator, value)` triple. Field paths may be dotted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    /// `field == value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    /// `field array-contains value`.
    pub fn array_contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::ArrayContains,
            value: value.into(),
        }
    }

    /// Check whether a document satisfies this filter.
    pub fn matches(&self, fields: &Fields) -> bool {
        let Some(actual) = lookup(fields, &self.field) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::ArrayContains => actual
                .as_array()
                .is_some_and(|items| items.contains(&self.value)),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// A single-field sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Options for loading a collection.
///
/// Filters are ANDed. Without a sort the backend's default order applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub filters: Vec<Filter>,

    #[serde(default)]
    pub sort: Option<Sort>,

    /// Ignore `sort` entirely.
    #[serde(default)]
    pub no_sort: bool,

    #[serde(default)]
    pub limit: Option<usize>,
}

impl Query {
    /// Create an unfiltered, unsorted query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set the sort.
    pub fn order_by(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Suppress sorting.
    pub fn unsorted(mut self) -> Self {
        self.no_sort = true;
        self
    }

    /// Cap the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The sort that will actually be applied.
    pub fn effective_sort(&self) -> Option<&Sort> {
        if self.no_sort { None } else { self.sort.as_ref() }
    }

    /// Check whether a document passes every filter.
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters.iter().all(|f| f.matches(fields))
    }

    /// Filter, sort and limit a backend's documents, given in default order.
    pub fn apply<'a>(&self, docs: impl IntoIterator<Item = &'a Fields>) -> Vec<Fields> {
        let mut matched: Vec<&Fields> = docs.into_iter().filter(|d| self.matches(d)).collect();

        if let Some(sort) = self.effective_sort() {
            // Stable sort keeps the default order among equal keys.
            matched.sort_by(|a, b| compare_fields(a, b, sort));
        }

        let limit = self.limit.unwrap_or(usize::MAX);
        matched.into_iter().take(limit).cloned().collect()
    }
}

/// Resolve a dotted field path.
pub fn lookup<'a>(fields: &'a Fields, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = fields.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Order two documents by the sort field; missing values sort last in
/// either direction.
fn compare_fields(a: &Fields, b: &Fields, sort: &Sort) -> Ordering {
    match (lookup(a, &sort.field), lookup(b, &sort.field)) {
        (Some(x), Some(y)) => match sort.direction {
            SortDirection::Asc => compare_values(x, y),
            SortDirection::Desc => compare_values(y, x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn names(docs: &[Fields]) -> Vec<&str> {
        docs.iter()
            .filter_map(|d| d.get("name").and_then(Value::as_str))
            .collect()
    }

    #[test]
    fn test_dotted_equality() {
        let p1 = doc(json!({"name": "P1", "references": {"s1": "sources"}}));
        let p2 = doc(json!({"name": "P2", "references": {"s1": "keywords"}}));
        let p3 = doc(json!({"name": "P3"}));

        let query = Query::new().filter(Filter::eq("references.s1", "sources"));
        let result = query.apply([&p1, &p2, &p3]);
        assert_eq!(names(&result), vec!["P1"]);
    }

    #[test]
    fn test_array_contains() {
        let a = doc(json!({"name": "A", "tags": ["melee", "heavy"]}));
        let b = doc(json!({"name": "B", "tags": ["ranged"]}));
        let c = doc(json!({"name": "C", "tags": "melee"}));

        let query = Query::new().filter(Filter::array_contains("tags", "melee"));
        assert_eq!(names(&query.apply([&a, &b, &c])), vec!["A"]);
    }

    #[test]
    fn test_filters_are_anded() {
        let a = doc(json!({"name": "A", "systemId": "x", "tier": 1}));
        let b = doc(json!({"name": "B", "systemId": "x", "tier": 2}));
        let c = doc(json!({"name": "C", "systemId": "y", "tier": 1}));

        let query = Query::new()
            .filter(Filter::eq("systemId", "x"))
            .filter(Filter::eq("tier", 1));
        assert_eq!(names(&query.apply([&a, &b, &c])), vec!["A"]);
    }

    #[test]
    fn test_sort_and_limit() {
        let a = doc(json!({"name": "Alpha", "points": 10}));
        let b = doc(json!({"name": "Bravo", "points": 30}));
        let c = doc(json!({"name": "Charlie"}));
        let d = doc(json!({"name": "Delta", "points": 20}));

        let query = Query::new().order_by(Sort::desc("points"));
        assert_eq!(
            names(&query.apply([&a, &b, &c, &d])),
            vec!["Bravo", "Delta", "Alpha", "Charlie"]
        );

        let query = Query::new().order_by(Sort::asc("points")).limit(2);
        assert_eq!(names(&query.apply([&a, &b, &c, &d])), vec!["Alpha", "Delta"]);
    }

    #[test]
    fn test_no_sort_keeps_default_order() {
        let a = doc(json!({"name": "Zulu"}));
        let b = doc(json!({"name": "Alpha"}));

        let query = Query::new().order_by(Sort::asc("name")).unsorted();
        assert!(query.effective_sort().is_none());
        assert_eq!(names(&query.apply([&a, &b])), vec!["Zulu", "Alpha"]);
    }
}
