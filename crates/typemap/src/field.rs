//! Field descriptors.
//!
//! A [`Field`] pairs a [`Converter`] with the metadata that governs how one
//! field is read from and written to the wire: read/write names, attribute
//! vs child-element reads, and read/write eligibility. Descriptors are built
//! once at configuration time and never change afterwards.

use std::fmt;
use std::sync::Arc;

use crate::convert::{Converter, ConverterKind};
use crate::error::{Result, TypemapError};
use crate::schema::SchemaRef;
use crate::value::Value;

/// Wire name shared by the event family of fields.
pub const EVENTS_WIRE_NAME: &str = "events";

/// Custom value-to-wire-text function.
pub type Setter = Arc<dyn Fn(&Value) -> Result<String> + Send + Sync>;

/// Descriptor for one schema field.
#[derive(Clone)]
pub struct Field {
    converter: Converter,
    kind: ConverterKind,
    column: Option<String>,
    wire_name: Option<String>,
    set_name: Option<String>,
    attribute: bool,
    readable: bool,
    writable: bool,
    setter: Option<Setter>,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("kind", &self.kind)
            .field("converter", &self.converter)
            .field("column", &self.column)
            .field("wire_name", &self.wire_name)
            .field("set_name", &self.set_name)
            .field("attribute", &self.attribute)
            .field("readable", &self.readable)
            .field("writable", &self.writable)
            .field("setter", &self.setter.as_ref().map(|_| ".."))
            .finish()
    }
}

impl From<Converter> for Field {
    fn from(converter: Converter) -> Self {
        Field::new(converter)
    }
}

impl Field {
    /// A readable, writable child-element field.
    pub fn new(converter: Converter) -> Self {
        Self {
            kind: converter.kind(),
            converter,
            column: None,
            wire_name: None,
            set_name: None,
            attribute: false,
            readable: true,
            writable: true,
            setter: None,
        }
    }

    /// Integer child element.
    pub fn int() -> Self {
        Self::new(Converter::Int)
    }

    /// Float child element.
    pub fn float() -> Self {
        Self::new(Converter::Float)
    }

    /// Boolean child element.
    pub fn bool() -> Self {
        Self::new(Converter::Bool)
    }

    /// String child element.
    pub fn string() -> Self {
        Self::new(Converter::Str)
    }

    /// Datetime child element.
    pub fn datetime() -> Self {
        Self::new(Converter::DateTime)
    }

    /// Scalar converter mapped over the child elements.
    pub fn list_of(inner: Converter) -> Self {
        Self::new(Converter::list_of(inner))
    }

    /// List of nested records.
    pub fn list_of_schema(schema: SchemaRef) -> Self {
        Self::new(Converter::list_of_schema(schema))
    }

    /// Comma/space separated list in the element text.
    pub fn comma_list_of(inner: Converter) -> Self {
        Self::new(Converter::comma_list_of(inner))
    }

    /// Read only when the boolean sibling `flag` is true, `Null` otherwise.
    pub fn conditional_on_flag(inner: Converter, flag: &str) -> Self {
        Self::new(Converter::conditional_on_flag(inner, flag))
    }

    /// Descriptor with customised names or write behaviour.
    pub fn col(converter: Converter) -> Self {
        Self::new(converter).with_kind(ConverterKind::Col)
    }

    /// Reads an attribute of the record element instead of a child element.
    ///
    /// An absent attribute yields `Null`. Attribute fields are read-only.
    pub fn attr(converter: Converter) -> Self {
        let mut field = Self::new(converter).with_kind(ConverterKind::Attr);
        field.attribute = true;
        field.writable = false;
        field
    }

    /// The record element's own text, for records whose remaining data lives
    /// entirely in attributes. Read-only.
    pub fn self_text() -> Self {
        let mut field = Self::new(Converter::SelfText);
        field.attribute = true;
        field.writable = false;
        field
    }

    fn event_list(schema: SchemaRef, column: &str, kind: ConverterKind) -> Self {
        Self::new(Converter::list_of_schema(schema))
            .column(column)
            .wire_name(EVENTS_WIRE_NAME)
            .read_only()
            .with_kind(kind)
    }

    /// Every event of a case, requested as `events`.
    pub fn events(schema: SchemaRef) -> Self {
        Self::event_list(schema, "events", ConverterKind::Events)
    }

    /// Every event of a case in short form, requested as `minievents`.
    pub fn mini_events(schema: SchemaRef) -> Self {
        Self::event_list(schema, "minievents", ConverterKind::MiniEvents)
    }

    /// Only the latest event of a case, requested as `latestEvent`.
    pub fn latest_event(schema: SchemaRef) -> Self {
        Self::new(Converter::first_of(Converter::list_of_schema(schema)))
            .column("latestEvent")
            .wire_name(EVENTS_WIRE_NAME)
            .read_only()
            .with_kind(ConverterKind::LatestEvent)
    }

    /// Write-only file attachments: attachment name to path or open handle.
    pub fn attachments() -> Self {
        Self::new(Converter::Attachments).write_only()
    }

    /// Name requested in column lists.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.column = Some(name.into());
        self
    }

    /// Element (or attribute) name read from the response.
    pub fn wire_name(mut self, name: impl Into<String>) -> Self {
        self.wire_name = Some(name.into());
        self
    }

    /// Argument name written on requests.
    pub fn set_name(mut self, name: impl Into<String>) -> Self {
        self.set_name = Some(name.into());
        self
    }

    /// Rejects writes of this field.
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Skips this field during extraction.
    pub fn write_only(mut self) -> Self {
        self.readable = false;
        self
    }

    /// Replaces the default wire serializer for this field.
    pub fn setter<F>(mut self, setter: F) -> Self
    where
        F: Fn(&Value) -> Result<String> + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(setter));
        self
    }

    /// Overrides the reported converter family.
    pub fn with_kind(mut self, kind: ConverterKind) -> Self {
        self.kind = kind;
        self
    }

    /// Converter applied on read.
    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    /// Converter family, for listings.
    pub fn kind(&self) -> ConverterKind {
        self.kind
    }

    /// Whether the field reads an attribute of the record element.
    pub fn is_attribute(&self) -> bool {
        self.attribute
    }

    /// Whether extraction produces this field.
    pub fn is_readable(&self) -> bool {
        self.readable
    }

    /// Whether the field may be serialized.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Whether this is the file attachment pseudo-field.
    pub fn is_attachments(&self) -> bool {
        matches!(self.converter, Converter::Attachments)
    }

    /// The converter reads sibling fields, so extraction defers it.
    pub fn needs_record(&self) -> bool {
        self.converter.needs_record()
    }

    /// The converter forwards the name remap into nested extraction.
    pub fn needs_name_map(&self) -> bool {
        self.converter.needs_name_map()
    }

    /// Setter overriding the default wire conversion, if any.
    pub fn custom_setter(&self) -> Option<&Setter> {
        self.setter.as_ref()
    }

    /// Wire name read for the field called `name`, before remapping.
    pub fn read_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.wire_name.as_deref().unwrap_or(name)
    }

    /// Column requested for the field called `name`, before remapping.
    pub fn column_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.column.as_deref().unwrap_or_else(|| self.read_name(name))
    }

    /// Argument written for the field called `name`, before remapping.
    pub fn write_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.set_name.as_deref().unwrap_or(name)
    }

    /// Rejects descriptor combinations the engine cannot honour.
    pub fn validate(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(TypemapError::schema("field names cannot be empty"));
        }
        if self.attribute && !self.converter.is_scalar() {
            return Err(TypemapError::schema(format!(
                "attribute field {name:?} needs a scalar converter, got {}",
                self.converter.kind()
            )));
        }
        if self.is_attachments() && (self.readable || self.attribute) {
            return Err(TypemapError::schema(format!(
                "attachment field {name:?} must be write-only"
            )));
        }
        if !self.readable && !self.writable {
            return Err(TypemapError::schema(format!(
                "field {name:?} is neither readable nor writable"
            )));
        }
        Ok(())
    }
}
