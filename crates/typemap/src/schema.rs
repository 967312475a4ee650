//! Schemas, schema composition and the schema registry.
//!
//! A [`Schema`] maps logical field names to [`Field`] descriptors and defines
//! one record type. Schemas are immutable once built and are shared as
//! [`SchemaRef`] (`Arc<Schema>`), so concurrent readers need no locking.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{Result, TypemapError};
use crate::field::Field;

/// Caller-supplied wire name overrides, applied at read and write boundaries.
pub type NameMap = HashMap<String, String>;

/// Shared handle to an immutable schema.
pub type SchemaRef = Arc<Schema>;

/// Looks `name` up in the remap table, passing it through when absent.
pub fn remap<'a>(name_map: &'a NameMap, name: &'a str) -> &'a str {
    name_map.get(name).map(String::as_str).unwrap_or(name)
}

/// Field name to descriptor mapping for one record type.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: BTreeMap<String, Field>,
}

impl Schema {
    /// Starts an empty schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Descriptor of one field.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Whether the schema defines `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True for a schema without fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Field names in schema order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// A schema restricted to `names`.
    ///
    /// Every name must exist, otherwise [`TypemapError::UnknownColumn`].
    pub fn subset<S: AsRef<str>>(&self, names: &[S]) -> Result<Schema> {
        let mut fields = BTreeMap::new();
        for name in names {
            let name = name.as_ref();
            let field = self
                .fields
                .get(name)
                .ok_or_else(|| TypemapError::UnknownColumn {
                    column: name.to_string(),
                })?;
            fields.insert(name.to_string(), field.clone());
        }
        Ok(Schema { fields })
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: BTreeMap<String, Field>,
}

impl SchemaBuilder {
    /// Adds one field. A later definition replaces an earlier one.
    pub fn field(mut self, name: impl Into<String>, field: impl Into<Field>) -> Self {
        let name = name.into();
        if self.fields.insert(name.clone(), field.into()).is_some() {
            tracing::warn!(field = %name, "schema field redefined, later definition wins");
        }
        self
    }

    /// Embeds every field of `other`, replacing duplicates.
    pub fn include(mut self, other: &Schema) -> Self {
        for (name, field) in &other.fields {
            if self.fields.insert(name.clone(), field.clone()).is_some() {
                tracing::warn!(field = %name, "included schema overrides existing field");
            }
        }
        self
    }

    /// Validates every descriptor and freezes the schema.
    pub fn build(self) -> Result<Schema> {
        for (name, field) in &self.fields {
            field.validate(name)?;
        }
        Ok(Schema {
            fields: self.fields,
        })
    }
}

/// Named schemas, with aliases resolving to the same shared schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, SchemaRef>,
}

impl SchemaRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `schema` under `name`; names are unique.
    pub fn register(&mut self, name: impl Into<String>, schema: SchemaRef) -> Result<SchemaRef> {
        let name = name.into();
        if self.schemas.contains_key(&name) {
            return Err(TypemapError::schema(format!(
                "schema {name:?} is already registered"
            )));
        }
        self.schemas.insert(name, schema.clone());
        Ok(schema)
    }

    /// Makes `alias` resolve to the schema registered as `existing`.
    pub fn alias(&mut self, alias: impl Into<String>, existing: &str) -> Result<SchemaRef> {
        let schema = self
            .schemas
            .get(existing)
            .cloned()
            .ok_or_else(|| TypemapError::schema(format!("no schema named {existing:?}")))?;
        self.register(alias, schema)
    }

    /// Schema registered under `name` or an alias.
    pub fn get(&self, name: &str) -> Option<&SchemaRef> {
        self.schemas.get(name)
    }

    /// Registered names, aliases included, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Name and schema pairs, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaRef)> {
        self.schemas.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
