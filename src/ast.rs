use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The Document is a map of string keys to datum values.
pub type Document = BTreeMap<String, Datum>;

/// A dynamically typed value stored in records and embedded in queries and
/// expressions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Datum {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<Datum>),
    Object(Document),
}

impl Datum {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_) | Self::Decimal(_))
    }

    pub const fn as_object(&self) -> Option<&Document> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Datum]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Integer view of the value; floats are accepted when they carry no
    /// fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) | Self::Float(_) | Self::Decimal(_) => "number",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

impl std::fmt::Display for Datum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{}", v.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Self::Array(items) => write!(
                f,
                "[{}]",
                items
                    .iter()
                    .map(|v| format!("{v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Object(fields) => write!(
                f,
                "{{{}}}",
                fields
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

impl From<bool> for Datum {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Datum {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Datum {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Decimal> for Datum {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Datum {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<DateTime<Utc>> for Datum {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Date(v)
    }
}

impl From<Vec<Datum>> for Datum {
    fn from(v: Vec<Datum>) -> Self {
        Self::Array(v)
    }
}

impl From<Document> for Datum {
    fn from(fields: Document) -> Self {
        Self::Object(fields)
    }
}

impl<T: Into<Datum>> From<Option<T>> for Datum {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Datum {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(fields) => Self::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Converts a JSON object into a document. Non-object values yield an empty
/// document.
pub fn document(value: serde_json::Value) -> Document {
    match Datum::from(value) {
        Datum::Object(fields) => fields,
        _ => Document::new(),
    }
}

/// Look up a dotted path. Returns `None` as soon as a segment is missing or
/// an intermediate value is not an object.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Datum> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Mutable access to the object at a dotted path, creating intermediate
/// objects. Scalars standing in the way of the path are replaced by objects.
/// An empty path addresses the document itself.
pub fn object_at<'a>(doc: &'a mut Document, path: &str) -> Option<&'a mut Document> {
    let mut node = doc;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let entry = node
            .entry(segment.to_string())
            .or_insert_with(|| Datum::Object(Document::new()));
        if !matches!(entry, Datum::Object(_)) {
            *entry = Datum::Object(Document::new());
        }
        let Datum::Object(obj) = entry else {
            return None;
        };
        node = obj;
    }
    Some(node)
}

/// Assign a value at a dotted path, creating intermediate objects.
pub fn set_path(doc: &mut Document, path: &str, value: Datum) {
    let (parent, leaf) = path.rsplit_once('.').unwrap_or(("", path));
    if let Some(target) = object_at(doc, parent) {
        target.insert(leaf.to_string(), value);
    }
}
