// Filter values - the closed set of scalars a predicate can carry

use crate::error::{DocQueryError, Result};
use bson::{oid, Bson};
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Extended-JSON key for identifiers
pub const OID_KEY: &str = "$oid";
/// Extended-JSON key for patterns
pub const REGEX_KEY: &str = "$regex";

/// A value used inside a filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    ObjectId(ObjectId),
    Regex(RegexPattern),
    Array(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Render as extended JSON (`{"$oid": ..}`, `{"$regex": ..}` for the native types).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::Number((*n).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::ObjectId(id) => id.to_json(),
            Value::Regex(re) => serde_json::json!({ REGEX_KEY: re.as_str() }),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }

    /// The BSON form, as a store driver would receive it.
    pub fn to_bson(&self) -> Bson {
        match self {
            Value::Null => Bson::Null,
            Value::Bool(b) => Bson::Boolean(*b),
            Value::Int(n) => Bson::Int64(*n),
            Value::Float(f) => Bson::Double(*f),
            Value::String(s) => Bson::String(s.clone()),
            Value::ObjectId(id) => Bson::ObjectId(*id.as_bson()),
            Value::Regex(re) => Bson::RegularExpression(re.to_bson()),
            Value::Array(items) => Bson::Array(items.iter().map(Value::to_bson).collect()),
        }
    }

    /// Parse an extended-JSON value. Embedded documents other than
    /// `{"$oid": ..}` and `{"$regex": ..}` are rejected.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let value = match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(Value::from_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            serde_json::Value::Object(map) => {
                if let Some(id) = ObjectId::from_json(json) {
                    Value::ObjectId(id)
                } else if let (1, Some(serde_json::Value::String(p))) =
                    (map.len(), map.get(REGEX_KEY))
                {
                    Value::Regex(RegexPattern::new(p.clone()))
                } else {
                    return Err(DocQueryError::Filter(format!(
                        "embedded documents are not supported as values: {json}"
                    )));
                }
            }
        };
        Ok(value)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::ObjectId(id) => id.to_json().serialize(serializer),
            Value::Regex(re) => re.serialize(serializer),
            Value::Array(items) => items.serialize(serializer),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::ObjectId(id)
    }
}

impl From<RegexPattern> for Value {
    fn from(re: RegexPattern) -> Self {
        Value::Regex(re)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

// ── RegexPattern ─────────────────────────────────────────────────────

/// A regular expression handed to the store as a pattern, never as a literal string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegexPattern {
    pattern: String,
}

impl RegexPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        RegexPattern {
            pattern: pattern.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// The BSON regular expression, without options.
    pub fn to_bson(&self) -> bson::Regex {
        bson::Regex {
            pattern: self.pattern.clone(),
            options: String::new(),
        }
    }
}

impl fmt::Display for RegexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.pattern)
    }
}

/// Serialized as the `$regex` query operator.
impl Serialize for RegexPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(REGEX_KEY, &self.pattern)?;
        map.end()
    }
}

// ── ObjectId ─────────────────────────────────────────────────────────

/// The store's native 12-byte document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(oid::ObjectId);

impl ObjectId {
    pub fn new() -> Self {
        ObjectId(oid::ObjectId::new())
    }

    /// Parse the 24-character hex form.
    pub fn parse_str(s: &str) -> Result<Self> {
        oid::ObjectId::parse_str(s)
            .map(ObjectId)
            .map_err(|_| DocQueryError::InvalidId(s.to_string()))
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    /// Creation time encoded in the identifier.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0.timestamp().to_chrono()
    }

    pub fn as_bson(&self) -> &oid::ObjectId {
        &self.0
    }

    /// Read an identifier stored as extended JSON, `{"$oid": "<hex>"}`.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        let map = json.as_object()?;
        if !map.contains_key(OID_KEY) {
            return None;
        }
        match Bson::try_from(json.clone()) {
            Ok(Bson::ObjectId(id)) => Some(ObjectId(id)),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        Bson::ObjectId(self.0).into_relaxed_extjson()
    }
}

impl From<oid::ObjectId> for ObjectId {
    fn from(id: oid::ObjectId) -> Self {
        ObjectId(id)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        ObjectId::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = DocQueryError;

    fn from_str(s: &str) -> Result<Self> {
        ObjectId::parse_str(s)
    }
}
