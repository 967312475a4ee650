//! Converter primitives and combinators.
//!
//! A [`Converter`] turns one XML node into a [`Value`]. Primitives handle
//! scalar text; combinators wrap a primitive or a nested schema to read
//! lists, comma lists, conditional data and list heads. Every converter is
//! invoked through the single entry point [`Converter::convert`], which always
//! receives a [`Context`] carrying the partially built record and the name
//! remap, so no converter has to be probed for optional capabilities.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::error::{Result, TypemapError};
use crate::extract::{SortBy, extract_all};
use crate::node::{TextNode, XmlNode};
use crate::schema::{NameMap, SchemaRef};
use crate::util::{DATETIME_FORMAT, comma_or_space_split};
use crate::value::{Record, Value};

/// Converter family tag, kept for introspection and documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConverterKind {
    /// `fbint`: base-10 integer.
    Int,
    /// `fbfloat`: decimal number.
    Float,
    /// `fbbool`: literal `true` check.
    Bool,
    /// `fbstring`: raw text.
    String,
    /// `fbdatetime`: UTC timestamp.
    DateTime,
    /// `fblistof`: list of scalars or nested records.
    ListOf,
    /// `fbcommalistof`: comma or space separated scalars.
    CommaListOf,
    /// `fbconditional`: read only when siblings allow it.
    Conditional,
    /// `fbfirstof`: head of a list.
    FirstOf,
    /// `fbcol`: field with customised names.
    Col,
    /// `fbattr`: attribute of the record element.
    Attr,
    /// `fbself`: the record element's own text.
    SelfText,
    /// `fbevents`: every event of a case.
    Events,
    /// `fbminievents`: short-form events.
    MiniEvents,
    /// `fblatestevent`: newest event only.
    LatestEvent,
    /// `fbattachments`: write-only file uploads.
    Attachments,
    /// `fbcustom`: caller-supplied converter.
    Custom,
}

impl ConverterKind {
    /// Name of the converter family, as shown in schema listings.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConverterKind::Int => "fbint",
            ConverterKind::Float => "fbfloat",
            ConverterKind::Bool => "fbbool",
            ConverterKind::String => "fbstring",
            ConverterKind::DateTime => "fbdatetime",
            ConverterKind::ListOf => "fblistof",
            ConverterKind::CommaListOf => "fbcommalistof",
            ConverterKind::Conditional => "fbconditional",
            ConverterKind::FirstOf => "fbfirstof",
            ConverterKind::Col => "fbcol",
            ConverterKind::Attr => "fbattr",
            ConverterKind::SelfText => "fbself",
            ConverterKind::Events => "fbevents",
            ConverterKind::MiniEvents => "fbminievents",
            ConverterKind::LatestEvent => "fblatestevent",
            ConverterKind::Attachments => "fbattachments",
            ConverterKind::Custom => "fbcustom",
        }
    }
}

impl fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call state handed to every converter.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    /// Fields extracted so far for the record being built.
    pub record: &'a Record,
    /// Caller-supplied wire name overrides.
    pub name_map: &'a NameMap,
}

impl<'a> Context<'a> {
    /// Context over the record built so far.
    pub fn new(record: &'a Record, name_map: &'a NameMap) -> Self {
        Self { record, name_map }
    }
}

/// Predicate over sibling fields, used by conditional converters.
pub type Predicate = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// Caller-provided conversion function.
pub type ConvertFn = Arc<dyn Fn(&dyn XmlNode, &Context<'_>) -> Result<Value> + Send + Sync>;

/// How a single node becomes a value.
#[derive(Clone)]
pub enum Converter {
    /// Base-10 integer; empty text is `0`.
    Int,
    /// Decimal number.
    Float,
    /// `true` iff the text is exactly `true`.
    Bool,
    /// Raw text.
    Str,
    /// `YYYY-MM-DDTHH:MM:SSZ`; empty text is the empty-date sentinel.
    DateTime,
    /// Scalar converter mapped over the node's child elements.
    ListOf(Box<Converter>),
    /// Nested schema extracted from every child element.
    ListOfSchema(SchemaRef),
    /// Scalar converter mapped over comma/space separated tokens of the text.
    CommaListOf(Box<Converter>),
    /// Applied only when the predicate holds for the sibling fields.
    Conditional {
        inner: Box<Converter>,
        predicate: Predicate,
    },
    /// First element of a list conversion, or `Null`.
    FirstOf(Box<Converter>),
    /// The element's own text.
    SelfText,
    /// Write-only data; never read.
    Attachments,
    /// Arbitrary conversion function.
    Custom(ConvertFn),
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Converter::ListOf(inner) => f.debug_tuple("ListOf").field(inner).finish(),
            Converter::ListOfSchema(schema) => f
                .debug_tuple("ListOfSchema")
                .field(&schema.field_names().collect::<Vec<_>>())
                .finish(),
            Converter::CommaListOf(inner) => f.debug_tuple("CommaListOf").field(inner).finish(),
            Converter::Conditional { inner, .. } => f
                .debug_struct("Conditional")
                .field("inner", inner)
                .finish_non_exhaustive(),
            Converter::FirstOf(inner) => f.debug_tuple("FirstOf").field(inner).finish(),
            Converter::Custom(_) => f.write_str("Custom(..)"),
            other => f.write_str(other.kind().as_str()),
        }
    }
}

impl Converter {
    /// Maps a scalar converter over the child elements of the node.
    pub fn list_of(inner: Converter) -> Self {
        Converter::ListOf(Box::new(inner))
    }

    /// Extracts a list of nested records.
    pub fn list_of_schema(schema: SchemaRef) -> Self {
        Converter::ListOfSchema(schema)
    }

    /// Splits the node text on commas/whitespace and converts each token.
    pub fn comma_list_of(inner: Converter) -> Self {
        Converter::CommaListOf(Box::new(inner))
    }

    /// Applies `inner` only when `predicate` accepts the record built so far.
    pub fn conditional<F>(inner: Converter, predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        Converter::Conditional {
            inner: Box::new(inner),
            predicate: Arc::new(predicate),
        }
    }

    /// Applies `inner` only when the boolean sibling `flag` is true.
    pub fn conditional_on_flag(inner: Converter, flag: &str) -> Self {
        let flag = flag.to_string();
        Self::conditional(inner, move |record| {
            record.get(&flag).and_then(Value::as_bool).unwrap_or(false)
        })
    }

    /// Returns the head of a list conversion.
    pub fn first_of(inner: Converter) -> Self {
        Converter::FirstOf(Box::new(inner))
    }

    /// Wraps a custom conversion function.
    pub fn custom<F>(func: F) -> Self
    where
        F: Fn(&dyn XmlNode, &Context<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        Converter::Custom(Arc::new(func))
    }

    /// Converter family of this converter.
    pub fn kind(&self) -> ConverterKind {
        match self {
            Converter::Int => ConverterKind::Int,
            Converter::Float => ConverterKind::Float,
            Converter::Bool => ConverterKind::Bool,
            Converter::Str => ConverterKind::String,
            Converter::DateTime => ConverterKind::DateTime,
            Converter::ListOf(_) | Converter::ListOfSchema(_) => ConverterKind::ListOf,
            Converter::CommaListOf(_) => ConverterKind::CommaListOf,
            Converter::Conditional { .. } => ConverterKind::Conditional,
            Converter::FirstOf(_) => ConverterKind::FirstOf,
            Converter::SelfText => ConverterKind::SelfText,
            Converter::Attachments => ConverterKind::Attachments,
            Converter::Custom(_) => ConverterKind::Custom,
        }
    }

    /// True when the converter reads sibling fields and must run deferred.
    pub fn needs_record(&self) -> bool {
        match self {
            Converter::Conditional { .. } => true,
            Converter::ListOf(inner) | Converter::CommaListOf(inner) | Converter::FirstOf(inner) => {
                inner.needs_record()
            }
            _ => false,
        }
    }

    /// True when the converter forwards the name remap to nested extraction.
    pub fn needs_name_map(&self) -> bool {
        match self {
            Converter::ListOfSchema(_) => true,
            Converter::ListOf(inner)
            | Converter::CommaListOf(inner)
            | Converter::FirstOf(inner)
            | Converter::Conditional { inner, .. } => inner.needs_name_map(),
            _ => false,
        }
    }

    /// True when the converter reads a single scalar text value.
    pub fn is_scalar(&self) -> bool {
        match self {
            Converter::Int
            | Converter::Float
            | Converter::Bool
            | Converter::Str
            | Converter::DateTime
            | Converter::SelfText
            | Converter::Custom(_) => true,
            Converter::Conditional { inner, .. } => inner.is_scalar(),
            _ => false,
        }
    }

    /// Whether the converter should touch the node at all for this record.
    ///
    /// Conditional converters whose predicate rejects the record yield `Null`
    /// without looking the node up.
    pub fn applies_to(&self, record: &Record) -> bool {
        match self {
            Converter::Conditional { predicate, .. } => predicate(record),
            _ => true,
        }
    }

    /// Converts one node.
    pub fn convert(&self, node: &dyn XmlNode, ctx: &Context<'_>) -> Result<Value> {
        match self {
            Converter::Int => convert_int(node),
            Converter::Float => convert_float(node),
            Converter::Bool => Ok(convert_bool(node)),
            Converter::Str => Ok(convert_string(node)),
            Converter::DateTime => convert_datetime(node),
            Converter::ListOf(inner) => node
                .children()
                .iter()
                .filter(|child| !child.is_blank())
                .map(|child| inner.convert(child.as_ref(), ctx))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            Converter::ListOfSchema(schema) => {
                let records = extract_all(node.children(), schema, ctx.name_map, SortBy::default())?;
                Ok(Value::List(records.into_iter().map(Value::Record).collect()))
            }
            Converter::CommaListOf(inner) => {
                let text = node.text();
                comma_or_space_split(&text)
                    .into_iter()
                    .map(|token| inner.convert(&TextNode::new(token), ctx))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::List)
            }
            Converter::Conditional { inner, predicate } => {
                if predicate(ctx.record) {
                    inner.convert(node, ctx)
                } else {
                    Ok(Value::Null)
                }
            }
            Converter::FirstOf(inner) => match inner.convert(node, ctx)? {
                Value::List(items) => Ok(items.into_iter().next().unwrap_or(Value::Null)),
                other => Ok(other),
            },
            Converter::SelfText => Ok(convert_string(node)),
            Converter::Attachments => Ok(Value::Null),
            Converter::Custom(func) => func(node, ctx),
        }
    }
}

/// Integer primitive. Empty text is the documented `0` sentinel.
pub fn convert_int(node: &dyn XmlNode) -> Result<Value> {
    let text = node.text();
    if text.is_empty() {
        return Ok(Value::Int(0));
    }
    text.trim()
        .parse::<i64>()
        .map(Value::Int)
        .map_err(|e| TypemapError::parse(ConverterKind::Int, text.as_str(), e))
}

/// Float primitive.
pub fn convert_float(node: &dyn XmlNode) -> Result<Value> {
    let text = node.text();
    text.trim()
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|e| TypemapError::parse(ConverterKind::Float, text.as_str(), e))
}

/// Boolean primitive: the characteristic function of the literal `true`.
pub fn convert_bool(node: &dyn XmlNode) -> Value {
    Value::Bool(node.text() == "true")
}

/// String primitive.
pub fn convert_string(node: &dyn XmlNode) -> Value {
    Value::Str(node.text())
}

/// Datetime primitive. Empty text is `DateTime(None)`.
pub fn convert_datetime(node: &dyn XmlNode) -> Result<Value> {
    let text = node.text();
    if text.is_empty() {
        return Ok(Value::DateTime(None));
    }
    NaiveDateTime::parse_from_str(&text, DATETIME_FORMAT)
        .map(|dt| Value::DateTime(Some(dt)))
        .map_err(|e| TypemapError::parse(ConverterKind::DateTime, text.as_str(), e))
}
