//! Column-list projection.
//!
//! Search and edit calls accept a `cols` argument naming exactly the fields
//! the response should carry. The list is derived from a schema so a response
//! always holds every element [`extract`](crate::extract) will look for.

use crate::error::{Result, TypemapError};
use crate::schema::{NameMap, Schema, remap};
use crate::util::{comma_or_space_split, is_private_field};

/// Wire column names for `schema`, or for the `subset` of its fields.
///
/// Private fields, write-only fields and attribute fields (which travel on
/// the record element itself) are never requested. Subset names must exist
/// in the schema; duplicates are requested once.
pub fn column_names<S: AsRef<str>>(
    schema: &Schema,
    name_map: &NameMap,
    subset: Option<&[S]>,
) -> Result<Vec<String>> {
    let names: Vec<&str> = match subset {
        Some(subset) => {
            let mut names: Vec<&str> = Vec::with_capacity(subset.len());
            for name in subset {
                let name = name.as_ref();
                if !schema.contains(name) {
                    return Err(TypemapError::UnknownColumn {
                        column: name.to_string(),
                    });
                }
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            names
        }
        None => schema.field_names().collect(),
    };

    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let Some(field) = schema.get(name) else {
            continue;
        };
        if is_private_field(name) || !field.is_readable() || field.is_attribute() {
            continue;
        }
        columns.push(remap(name_map, field.column_name(name)).to_string());
    }
    Ok(columns)
}

/// Comma-joined column list, as passed in a `cols` argument.
pub fn column_list<S: AsRef<str>>(
    schema: &Schema,
    name_map: &NameMap,
    subset: Option<&[S]>,
) -> Result<String> {
    Ok(column_names(schema, name_map, subset)?.join(","))
}

/// Column list for a caller-written `cols` string such as `"ixBug, sTitle"`.
pub fn column_list_from_str(schema: &Schema, name_map: &NameMap, cols: &str) -> Result<String> {
    let subset = comma_or_space_split(cols);
    column_list(schema, name_map, Some(&subset))
}
