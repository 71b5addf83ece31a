//! Record model
//!
//! A [`Record`] is the unit of storage: a caller-supplied id, a version tag
//! used for optimistic concurrency, an update timestamp and a semi-structured
//! payload. The engine never generates ids or tags; it only compares and
//! stores them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::value::Value;

/// Field → value mapping carried by every record
pub type Payload = BTreeMap<String, Value>;

/// Look up a field in a payload
///
/// Dotted paths (`"address.city"`) descend into nested objects. A path that
/// runs through a non-object value yields `None`.
pub fn field<'a>(payload: &'a Payload, path: &str) -> Option<&'a Value> {
    if let Some(value) = payload.get(path) {
        return Some(value);
    }
    let mut segments = path.split('.');
    let mut current = payload.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Opaque, comparable record identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordId {
    /// Integer id
    Int(i64),
    /// String id
    Str(String),
    /// UUID id
    Uuid(Uuid),
}

impl RecordId {
    /// Generate a random UUID id
    pub fn new_uuid() -> Self {
        RecordId::Uuid(Uuid::new_v4())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(i) => write!(f, "{}", i),
            RecordId::Str(s) => write!(f, "{}", s),
            RecordId::Uuid(u) => write!(f, "{}", u),
        }
    }
}

impl From<i64> for RecordId {
    fn from(i: i64) -> Self {
        RecordId::Int(i)
    }
}

impl From<i32> for RecordId {
    fn from(i: i32) -> Self {
        RecordId::Int(i as i64)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Str(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId::Str(s)
    }
}

impl From<Uuid> for RecordId {
    fn from(u: Uuid) -> Self {
        RecordId::Uuid(u)
    }
}

/// Optimistic-concurrency token (an ETag)
///
/// Changes whenever the payload changes. Compared byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionTag(String);

impl VersionTag {
    /// Wrap a tag string
    pub fn new(tag: impl Into<String>) -> Self {
        VersionTag(tag.into())
    }

    /// The raw tag
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionTag {
    fn from(s: &str) -> Self {
        VersionTag::new(s)
    }
}

/// A versioned, identified unit of stored data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Caller-supplied identity, unique within a collection
    pub id: RecordId,
    /// Token compared on update/delete
    pub version_tag: VersionTag,
    /// Last modification time as reported by the caller
    pub updated: DateTime<Utc>,
    /// Record fields
    pub payload: Payload,
}

impl Record {
    /// Create a record stamped with the current time
    pub fn new(id: impl Into<RecordId>, version_tag: impl Into<VersionTag>, payload: Payload) -> Self {
        Record {
            id: id.into(),
            version_tag: version_tag.into(),
            updated: Utc::now(),
            payload,
        }
    }

    /// Builder-style field setter
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(name.into(), value.into());
        self
    }

    /// Builder-style timestamp setter
    pub fn with_updated(mut self, updated: DateTime<Utc>) -> Self {
        self.updated = updated;
        self
    }

    /// Look up a (possibly dotted) payload field
    pub fn field(&self, path: &str) -> Option<&Value> {
        field(&self.payload, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> Payload {
        let mut address = BTreeMap::new();
        address.insert("city".to_string(), Value::from("Lyon"));
        let mut payload = Payload::new();
        payload.insert("name".to_string(), Value::from("alice"));
        payload.insert("address".to_string(), Value::Object(address));
        payload
    }

    #[test]
    fn test_field_top_level() {
        let payload = nested();
        assert_eq!(field(&payload, "name"), Some(&Value::from("alice")));
        assert_eq!(field(&payload, "missing"), None);
    }

    #[test]
    fn test_field_dotted_path() {
        let payload = nested();
        assert_eq!(field(&payload, "address.city"), Some(&Value::from("Lyon")));
        assert_eq!(field(&payload, "address.zip"), None);
        assert_eq!(field(&payload, "name.first"), None);
    }

    #[test]
    fn test_field_literal_dotted_key_wins() {
        let mut payload = nested();
        payload.insert("address.city".to_string(), Value::from("literal"));
        assert_eq!(
            field(&payload, "address.city"),
            Some(&Value::from("literal"))
        );
    }

    #[test]
    fn test_record_id_ordering_and_display() {
        assert!(RecordId::from(1) < RecordId::from(2));
        assert_eq!(RecordId::from("abc").to_string(), "abc");
        assert_eq!(RecordId::from(42).to_string(), "42");
    }

    #[test]
    fn test_record_builder() {
        let record = Record::new("u1", "v1", Payload::new())
            .with_field("age", 30)
            .with_field("name", "bob");
        assert_eq!(record.id, RecordId::from("u1"));
        assert_eq!(record.version_tag.as_str(), "v1");
        assert_eq!(record.field("age"), Some(&Value::Int(30)));
    }
}
