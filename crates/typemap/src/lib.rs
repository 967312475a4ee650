//! # fbmap typemap engine
//!
//! Declarative conversion between a bug tracker's XML responses and native
//! records, and back to flat request arguments.
//!
//! A [`Schema`] maps each logical field name to a [`Field`] descriptor. The
//! same schema drives three operations:
//!
//! - [`extract`] / [`extract_all`]: XML nodes to [`Record`]s
//! - [`to_wire_args`]: a record to request arguments ([`WireArgs`])
//! - [`column_list`]: the `cols` argument requesting exactly the schema's fields
//!
//! ```
//! use fbmap_typemap::{Field, NameMap, Schema, Value, extract_all, parse_document};
//!
//! let tag = Schema::builder()
//!     .field("ixTag", Field::int())
//!     .field("sTag", Field::string())
//!     .field("cTagUses", Field::int())
//!     .build()?;
//!
//! let doc = parse_document(
//!     "<tags><tag><ixTag>2</ixTag><sTag>ui</sTag><cTagUses>4</cTagUses></tag>\n\
//!      <tag><ixTag>1</ixTag><sTag>db</sTag><cTagUses></cTagUses></tag></tags>",
//! )?;
//! let tags = extract_all(doc.root_element().children(), &tag, &NameMap::new(), "ixTag")?;
//!
//! assert_eq!(tags[0]["sTag"], Value::from("db"));
//! assert_eq!(tags[0]["cTagUses"], Value::Int(0));
//! # Ok::<(), fbmap_typemap::TypemapError>(())
//! ```
//!
//! Schemas are built once and shared read-only; every call works on its own
//! input node and output record, so the engine is safe to use from many
//! threads without locking.

pub mod columns;
pub mod convert;
pub mod error;
pub mod extract;
pub mod field;
pub mod node;
pub mod schema;
pub mod serialize;
pub mod util;
pub mod value;

pub use columns::{column_list, column_list_from_str, column_names};
pub use convert::{Context, ConvertFn, Converter, ConverterKind, Predicate};
pub use error::{Result, TypemapError};
pub use extract::{SortBy, extract, extract_all};
pub use field::{EVENTS_WIRE_NAME, Field, Setter};
pub use node::{NodeRef, TextNode, XmlNode, parse_document};
pub use schema::{NameMap, Schema, SchemaBuilder, SchemaRef, SchemaRegistry, remap};
pub use serialize::{AttachmentStream, WireArgs, set_convert, to_wire_args};
pub use value::{Attachment, Record, SharedReader, Value};
