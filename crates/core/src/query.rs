//! Query capabilities consumed by the engine
//!
//! The engine does not parse or evaluate a query language. Callers hand it a
//! resolved [`Predicate`] and a [`SortSpec`]; the engine only calls
//! `matches` and applies a generic stable multi-key comparator.

use std::cmp::Ordering;

use crate::record::{field, Payload, Record};
use crate::value::Value;
use crate::error::{Error, Result};

/// Boolean test over a record payload
pub trait Predicate: Send + Sync {
    /// True if the payload belongs in the result
    fn matches(&self, payload: &Payload) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&Payload) -> bool + Send + Sync,
{
    fn matches(&self, payload: &Payload) -> bool {
        self(payload)
    }
}

/// Predicate accepting every record
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchAll;

impl Predicate for MatchAll {
    fn matches(&self, _payload: &Payload) -> bool {
        true
    }
}

/// Conjunction of field equality conditions
///
/// An empty filter matches everything. A condition on a field the payload
/// lacks never matches.
///
/// ```ignore
/// let filter = Filter::new().eq("status", "active").eq("year", 2024);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Create an empty filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition (dotted paths allowed)
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    /// Number of conditions
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// True when the filter has no conditions
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl Predicate for Filter {
    fn matches(&self, payload: &Payload) -> bool {
        self.conditions
            .iter()
            .all(|(name, expected)| field(payload, name) == Some(expected))
    }
}

/// Sort direction for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

/// One key of a sort specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    /// Payload field (dotted paths allowed)
    pub field: String,
    /// Direction for this key
    pub direction: Direction,
}

impl SortField {
    /// Ascending key
    pub fn asc(field: impl Into<String>) -> Self {
        SortField {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    /// Descending key
    pub fn desc(field: impl Into<String>) -> Self {
        SortField {
            field: field.into(),
            direction: Direction::Descending,
        }
    }
}

/// Ordered list of sort keys; empty means insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    fields: Vec<SortField>,
}

impl SortSpec {
    /// No sorting
    pub fn none() -> Self {
        Self::default()
    }

    /// Build from explicit keys
    pub fn new(fields: Vec<SortField>) -> Self {
        SortSpec { fields }
    }

    /// Parse a comma separated key list; a leading `-` means descending
    ///
    /// `"name,-age"` sorts by name ascending, then age descending.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut fields = Vec::new();
        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, direction) = match part.strip_prefix('-') {
                Some(rest) => (rest, Direction::Descending),
                None => (part, Direction::Ascending),
            };
            if name.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "empty field name in sort spec '{}'",
                    spec
                )));
            }
            fields.push(SortField {
                field: name.to_string(),
                direction,
            });
        }
        Ok(SortSpec { fields })
    }

    /// Append a key
    pub fn then(mut self, key: SortField) -> Self {
        self.fields.push(key);
        self
    }

    /// The keys in priority order
    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }

    /// True when no sorting is requested
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Compare two records key by key
    ///
    /// A missing field sorts before any present value (including `Null`).
    /// Returns `Equal` when every key ties; callers rely on a stable sort to
    /// keep the prior relative order.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for key in &self.fields {
            let ord = match (a.field(&key.field), b.field(&key.field)) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => x.compare(y),
            };
            let ord = match key.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: i64, name: &str, age: i64) -> Record {
        Record::new(id, "v", Payload::new())
            .with_field("name", name)
            .with_field("age", age)
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let filter = Filter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&rec(1, "a", 1).payload));
    }

    #[test]
    fn test_filter_matches_exact() {
        let filter = Filter::new().eq("name", "a").eq("age", 3);
        assert_eq!(filter.len(), 2);
        assert!(filter.matches(&rec(1, "a", 3).payload));
        assert!(!filter.matches(&rec(1, "a", 4).payload));
    }

    #[test]
    fn test_filter_missing_field() {
        let filter = Filter::new().eq("email", Value::Null);
        assert!(!filter.matches(&rec(1, "a", 3).payload));
    }

    #[test]
    fn test_closure_predicate() {
        let adults = |p: &Payload| p.get("age").and_then(Value::as_int).unwrap_or(0) >= 18;
        assert!(adults.matches(&rec(1, "a", 30).payload));
        assert!(!adults.matches(&rec(1, "a", 3).payload));
        assert!(MatchAll.matches(&Payload::new()));
    }

    #[test]
    fn test_sort_spec_parse() {
        let spec = SortSpec::parse("name, -age").unwrap();
        assert_eq!(
            spec.fields(),
            &[SortField::asc("name"), SortField::desc("age")]
        );
        assert!(SortSpec::parse("").unwrap().is_empty());
        assert!(SortSpec::parse("name,-").is_err());
    }

    #[test]
    fn test_sort_compare_multi_key() {
        let spec = SortSpec::none()
            .then(SortField::asc("name"))
            .then(SortField::desc("age"));
        let a = rec(1, "a", 10);
        let b = rec(2, "a", 20);
        let c = rec(3, "b", 5);
        assert_eq!(spec.compare(&b, &a), Ordering::Less);
        assert_eq!(spec.compare(&a, &c), Ordering::Less);
        assert_eq!(spec.compare(&a, &a.clone()), Ordering::Equal);
    }

    #[test]
    fn test_sort_missing_field_first() {
        let spec = SortSpec::new(vec![SortField::asc("nickname")]);
        let without = rec(1, "a", 1);
        let with = rec(2, "b", 2).with_field("nickname", Value::Null);
        assert_eq!(spec.compare(&without, &with), Ordering::Less);
    }
}
