//! Extraction: XML nodes to records.
//!
//! [`extract`] walks one record element according to a schema. Fields whose
//! converter reads sibling values are deferred until every other field of the
//! schema has been converted. A missing child element is fatal; the response
//! is assumed to carry every requested column, so a gap means the schema and
//! the remote API disagree.

use crate::convert::Context;
use crate::error::{Result, TypemapError};
use crate::field::Field;
use crate::node::{TextNode, XmlNode};
use crate::schema::{NameMap, Schema, remap};
use crate::value::{Record, Value};

/// Sort keys for [`extract_all`]: one field name or several for composite
/// ordering. Empty keeps source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortBy(Vec<String>);

impl SortBy {
    /// Keeps source order.
    pub fn none() -> Self {
        Self::default()
    }

    /// Sort keys, most significant first.
    pub fn keys(&self) -> &[String] {
        &self.0
    }

    /// True when no keys are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stable sort by the tuple of key values. Missing keys compare as `Null`.
    pub fn sort(&self, records: &mut [Record]) {
        if self.0.is_empty() {
            return;
        }
        records.sort_by(|a, b| {
            self.0
                .iter()
                .map(|key| a[key.as_str()].sort_cmp(&b[key.as_str()]))
                .find(|ord| ord.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

impl From<&str> for SortBy {
    fn from(key: &str) -> Self {
        SortBy(vec![key.to_string()])
    }
}

impl From<String> for SortBy {
    fn from(key: String) -> Self {
        SortBy(vec![key])
    }
}

impl From<Option<&str>> for SortBy {
    fn from(key: Option<&str>) -> Self {
        key.map(SortBy::from).unwrap_or_default()
    }
}

impl From<&[&str]> for SortBy {
    fn from(keys: &[&str]) -> Self {
        SortBy(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for SortBy {
    fn from(keys: [&str; N]) -> Self {
        SortBy(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl From<Vec<String>> for SortBy {
    fn from(keys: Vec<String>) -> Self {
        SortBy(keys)
    }
}

/// Converts one record element into a record.
pub fn extract(node: &dyn XmlNode, schema: &Schema, name_map: &NameMap) -> Result<Record> {
    let mut record = Record::new();
    let mut deferred = Vec::new();

    for (name, field) in schema.iter() {
        if field.needs_record() {
            deferred.push((name, field));
            continue;
        }
        convert_field(&mut record, node, name, field, name_map)?;
    }

    for (name, field) in deferred {
        tracing::trace!(field = %name, "converting deferred field");
        convert_field(&mut record, node, name, field, name_map)?;
    }

    tracing::debug!(
        tag = node.tag().unwrap_or_default(),
        fields = record.len(),
        "extracted record"
    );
    Ok(record)
}

/// Converts every record element of a response container.
///
/// Whitespace-only text pseudo-nodes between elements are skipped. With sort
/// keys, records are ordered by the tuple of those field values.
pub fn extract_all<I>(
    nodes: I,
    schema: &Schema,
    name_map: &NameMap,
    sort_by: impl Into<SortBy>,
) -> Result<Vec<Record>>
where
    I: IntoIterator,
    I::Item: XmlNode,
{
    let mut records = nodes
        .into_iter()
        .filter(|node| !node.is_blank())
        .map(|node| extract(&node, schema, name_map))
        .collect::<Result<Vec<_>>>()?;
    sort_by.into().sort(&mut records);
    Ok(records)
}

fn convert_field(
    record: &mut Record,
    node: &dyn XmlNode,
    name: &str,
    field: &Field,
    name_map: &NameMap,
) -> Result<()> {
    if !field.is_readable() {
        return Ok(());
    }

    let wire_name = remap(name_map, field.read_name(name));
    let converter = field.converter();
    let ctx = Context::new(record, name_map);

    let value = if !converter.applies_to(record) {
        Value::Null
    } else if field.is_attribute() {
        read_attribute(node, field, wire_name, &ctx)?
    } else {
        let child = find_child(node, wire_name).ok_or_else(|| TypemapError::MissingField {
            field: name.to_string(),
            wire_name: wire_name.to_string(),
        })?;
        converter.convert(child.as_ref(), &ctx)?
    };

    record.insert(name, value);
    Ok(())
}

fn read_attribute(
    node: &dyn XmlNode,
    field: &Field,
    wire_name: &str,
    ctx: &Context<'_>,
) -> Result<Value> {
    let converter = field.converter();
    if matches!(converter, crate::convert::Converter::SelfText) {
        return converter.convert(node, ctx);
    }
    match node.attribute(wire_name) {
        Some(text) => converter.convert(&TextNode::new(text), ctx),
        None => Ok(Value::Null),
    }
}

/// Exact tag match, then the lowercased tag.
fn find_child<'n>(node: &'n dyn XmlNode, wire_name: &str) -> Option<crate::node::NodeRef<'n>> {
    node.child(wire_name).or_else(|| {
        let lower = wire_name.to_lowercase();
        if lower != wire_name {
            node.child(&lower)
        } else {
            None
        }
    })
}
