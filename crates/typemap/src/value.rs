//! Converted values and records.
//!
//! A [`Record`] is the in-memory form of one wire entity (one case, one
//! project, ...). Records are built fresh by extraction and are plain data
//! afterwards; write-side records may also be assembled by hand or from JSON.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDateTime;
use parking_lot::Mutex;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::util::DATETIME_FORMAT;

/// A readable handle shared between the caller and the serializer.
pub type SharedReader = Arc<Mutex<Box<dyn Read + Send>>>;

/// Source of one file attachment.
#[derive(Clone)]
pub enum Attachment {
    /// Filesystem path, opened when wire arguments are built.
    Path(PathBuf),
    /// A handle the caller already opened.
    Handle(SharedReader),
}

impl Attachment {
    /// Wraps an already-open reader.
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Attachment::Handle(Arc::new(Mutex::new(Box::new(reader))))
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attachment::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Attachment::Handle(_) => f.write_str("Handle(..)"),
        }
    }
}

impl PartialEq for Attachment {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Attachment::Path(a), Attachment::Path(b)) => a == b,
            (Attachment::Handle(a), Attachment::Handle(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<PathBuf> for Attachment {
    fn from(path: PathBuf) -> Self {
        Attachment::Path(path)
    }
}

impl From<&str> for Attachment {
    fn from(path: &str) -> Self {
        Attachment::Path(PathBuf::from(path))
    }
}

/// A converted field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent optional data (missing attribute, unmet condition, empty list head).
    Null,
    /// Integer; empty wire text converts to `0`.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean; only the literal `true` is true.
    Bool(bool),
    /// Raw text.
    Str(String),
    /// Datetime; `None` is the empty-date sentinel.
    DateTime(Option<NaiveDateTime>),
    /// Homogeneous list.
    List(Vec<Value>),
    /// Nested record.
    Record(Record),
    /// Write-only file attachments keyed by attachment name.
    Attachments(BTreeMap<String, Attachment>),
}

impl Value {
    /// Short name of the value kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Attachments(_) => "attachments",
        }
    }

    /// True for `Null`, including conditional fields that were skipped.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The integer, if this is `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The flag, if this is `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The text, if this is `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The items, if this is `List`.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// The nested record, if this is `Record`.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Builds a value from JSON.
    ///
    /// Integral numbers become `Int`, other numbers `Float`, objects nested
    /// records. Strings stay strings even when they look like dates: the
    /// default wire serializer emits them unchanged.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Record(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Int(_) | Value::Float(_) => 1,
            Value::Bool(_) => 2,
            Value::Str(_) => 3,
            Value::DateTime(_) => 4,
            Value::List(_) => 5,
            Value::Record(_) => 6,
            Value::Attachments(_) => 7,
        }
    }

    /// Total order used for sorting extracted records.
    ///
    /// Values of different kinds order by kind; ints and floats compare
    /// numerically; the empty datetime sorts before every real date.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).total_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.total_cmp(&(*b as f64)),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    let ord = x.sort_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(Some(dt))
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Str(s) => serializer.serialize_str(s),
            Value::DateTime(None) => serializer.serialize_str(""),
            Value::DateTime(Some(dt)) => {
                serializer.collect_str(&dt.format(DATETIME_FORMAT))
            }
            Value::List(items) => serializer.collect_seq(items),
            Value::Record(record) => record.serialize(serializer),
            Value::Attachments(files) => {
                let mut map = serializer.serialize_map(Some(files.len()))?;
                for (name, attachment) in files {
                    match attachment {
                        Attachment::Path(path) => {
                            map.serialize_entry(name, &path.display().to_string())?
                        }
                        Attachment::Handle(_) => map.serialize_entry(name, "<handle>")?,
                    }
                }
                map.end()
            }
        }
    }
}

/// One decoded wire entity: field name to converted value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns true if the record holds `name`, even if the value is `Null`.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Stores `value` under `name`, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Takes `name` out of the record.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True for a record without fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Builds a record from a JSON object; other JSON values are rejected.
    pub fn from_json(json: &serde_json::Value) -> Option<Record> {
        match Value::from_json(json) {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl std::ops::Index<&str> for Record {
    type Output = Value;

    /// Missing fields index as `Null`.
    fn index(&self, name: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.fields.get(name).unwrap_or(&NULL)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(&self.fields)
    }
}
