//! Serialization: records to flat wire arguments.
//!
//! [`to_wire_args`] turns a (partial or full) record into the flat
//! `name -> string` form fields of a request, plus any attachment streams.
//! Attachment paths are opened here; the opened files live inside the
//! returned [`WireArgs`] and are closed when it is dropped, including when
//! serialization fails part-way.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};

use crate::error::{Result, TypemapError};
use crate::schema::{NameMap, Schema, remap};
use crate::util::{DATETIME_FORMAT, bool_to_string, is_private_field};
use crate::value::{Attachment, Record, SharedReader, Value};

/// A readable attachment body handed to the transport.
pub enum AttachmentStream {
    /// A file opened from an attachment path.
    File(File),
    /// A handle supplied by the caller.
    Shared(SharedReader),
}

impl Read for AttachmentStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            AttachmentStream::File(file) => file.read(buf),
            AttachmentStream::Shared(reader) => reader.lock().read(buf),
        }
    }
}

impl fmt::Debug for AttachmentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentStream::File(file) => f.debug_tuple("File").field(file).finish(),
            AttachmentStream::Shared(_) => f.write_str("Shared(..)"),
        }
    }
}

/// Request arguments: form fields plus attachment streams.
#[derive(Debug, Default)]
pub struct WireArgs {
    /// Wire argument name to wire text.
    pub fields: BTreeMap<String, String>,
    /// Attachment name to body.
    pub files: BTreeMap<String, AttachmentStream>,
}

impl WireArgs {
    /// Empty arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire text of a plain argument.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Sets a plain argument, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Builder form of [`WireArgs::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Whether a plain argument is set.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Number of plain arguments.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when there are neither arguments nor attachments.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }

}

/// Default value-to-wire conversion.
///
/// Datetimes format as `YYYY-MM-DDTHH:MM:SSZ` (sub-second precision is
/// dropped), lists comma-join their serialized elements, booleans become
/// `true`/`false`, `Null` and the empty date become the empty string.
/// Nested records and attachments have no wire text.
pub fn set_convert(field: &str, value: &Value) -> Result<String> {
    Ok(match value {
        Value::Null | Value::DateTime(None) => String::new(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => float_to_string(*f),
        Value::Bool(b) => bool_to_string(*b).to_string(),
        Value::Str(s) => s.clone(),
        Value::DateTime(Some(dt)) => dt.format(DATETIME_FORMAT).to_string(),
        Value::List(items) => items
            .iter()
            .map(|item| set_convert(field, item))
            .collect::<Result<Vec<_>>>()?
            .join(","),
        Value::Record(_) | Value::Attachments(_) => {
            return Err(TypemapError::UnsupportedValue {
                field: field.to_string(),
                kind: value.kind_name(),
            });
        }
    })
}

/// Whole numbers keep a trailing `.0` so `2.0` does not go out as `2`.
fn float_to_string(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// Builds request arguments for every field present in `record`.
///
/// Private fields (leading `_`) are skipped. A value for a field the schema
/// marks as not writable is an error rather than a silent drop. Fields the
/// schema does not know are written under their own name with the default
/// conversion. When two fields resolve to the same wire name the later one
/// in field-name order wins.
pub fn to_wire_args(
    record: &Record,
    schema: &Schema,
    name_map: &NameMap,
) -> Result<WireArgs> {
    let mut args = WireArgs::new();

    for (name, value) in record {
        if is_private_field(name) {
            continue;
        }
        let field = schema.get(name);
        if let Some(field) = field {
            if !field.is_writable() {
                return Err(TypemapError::WriteOnUnwritableField {
                    field: name.clone(),
                });
            }
        }

        match value {
            Value::Attachments(files) => {
                open_attachments(files, &mut args)?;
                continue;
            }
            Value::Null if field.is_some_and(|f| f.is_attachments()) => continue,
            _ => {}
        }

        let wire_name = remap(name_map, field.map_or(name.as_str(), |f| f.write_name(name)));
        let text = match field.and_then(|f| f.custom_setter()) {
            Some(setter) => setter(value)?,
            None => set_convert(name, value)?,
        };
        args.fields.insert(wire_name.to_string(), text);
    }

    tracing::debug!(
        fields = args.fields.len(),
        files = args.files.len(),
        "built wire arguments"
    );
    Ok(args)
}

fn open_attachments(
    files: &BTreeMap<String, Attachment>,
    args: &mut WireArgs,
) -> Result<()> {
    for (name, attachment) in files {
        let stream = match attachment {
            Attachment::Path(path) => {
                let file = File::open(path).map_err(|source| TypemapError::Attachment {
                    path: path.clone(),
                    source,
                })?;
                AttachmentStream::File(file)
            }
            Attachment::Handle(reader) => AttachmentStream::Shared(reader.clone()),
        };
        args.files.insert(name.clone(), stream);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_set_convert_scalars() {
        assert_eq!(set_convert("f", &Value::Int(42)).unwrap(), "42");
        assert_eq!(set_convert("f", &Value::Bool(true)).unwrap(), "true");
        assert_eq!(set_convert("f", &Value::Float(2.5)).unwrap(), "2.5");
        assert_eq!(set_convert("f", &Value::Float(2.0)).unwrap(), "2.0");
        assert_eq!(set_convert("f", &Value::Float(-3.0)).unwrap(), "-3.0");
        assert_eq!(set_convert("f", &Value::Null).unwrap(), "");
        assert_eq!(set_convert("f", &Value::DateTime(None)).unwrap(), "");
    }

    #[test]
    fn test_set_convert_datetime_drops_fraction() {
        let dt = NaiveDate::from_ymd_opt(2011, 2, 3)
            .unwrap()
            .and_hms_milli_opt(4, 5, 6, 789)
            .unwrap();
        assert_eq!(
            set_convert("dt", &Value::from(dt)).unwrap(),
            "2011-02-03T04:05:06Z"
        );
    }

    #[test]
    fn test_set_convert_lists_join() {
        let value = Value::List(vec![Value::Int(1), Value::List(vec![Value::Int(2), Value::Int(3)])]);
        assert_eq!(set_convert("ixBugChildren", &value).unwrap(), "1,2,3");
    }

    #[test]
    fn test_set_convert_rejects_records() {
        let err = set_convert("events", &Value::Record(Default::default())).unwrap_err();
        assert!(matches!(err, TypemapError::UnsupportedValue { kind: "record", .. }));
    }

    #[test]
    fn test_wire_args_helpers() {
        let mut args = WireArgs::new().with("ixBug", "1").with("sTitle", "x");
        args.insert("ixBug", "2");
        assert_eq!(args.get("ixBug"), Some("2"));
        assert_eq!(args.len(), 2);
        assert!(!args.is_empty());
    }
}
