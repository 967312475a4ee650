//! Error types for typemap conversion.
//!
//! Every failure is raised synchronously to the caller of `extract`,
//! `to_wire_args` or `column_list`; nothing is retried and no partial
//! record is ever returned.

use std::path::PathBuf;

use thiserror::Error;

use crate::convert::ConverterKind;

/// The error type for all conversion operations.
#[derive(Error, Debug)]
pub enum TypemapError {
    /// Scalar text could not be parsed into the requested type.
    #[error("cannot parse {text:?} as {kind}: {reason}")]
    Parse {
        /// Converter family that rejected the text.
        kind: ConverterKind,
        /// The offending wire text.
        text: String,
        /// Parser message.
        reason: String,
    },

    /// A non-optional child element is absent from the source element.
    #[error("could not find element {wire_name:?} for field {field:?}")]
    MissingField {
        /// Logical field name.
        field: String,
        /// Wire name that was looked up (after remapping).
        wire_name: String,
    },

    /// A record carried a value for a field that cannot be written back.
    #[error("field {field:?} is not writable")]
    WriteOnUnwritableField {
        /// Logical field name.
        field: String,
    },

    /// A requested column subset names a field the schema does not define.
    #[error("column {column:?} does not have a defined type")]
    UnknownColumn {
        /// The unknown column name.
        column: String,
    },

    /// A descriptor or schema was assembled from an invalid combination.
    #[error("invalid schema construction: {message}")]
    SchemaConstruction {
        /// Description of the problem.
        message: String,
    },

    /// A record value has no wire representation.
    #[error("field {field:?} holds a {kind} value which has no wire form")]
    UnsupportedValue {
        /// Logical field name.
        field: String,
        /// Value kind (`record`, `attachments`, ...).
        kind: &'static str,
    },

    /// An attachment path could not be opened for reading.
    #[error("cannot open attachment {path:?}: {source}")]
    Attachment {
        /// The attachment path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The XML document itself is malformed.
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),
}

impl TypemapError {
    /// Builds a [`TypemapError::Parse`].
    pub fn parse(kind: ConverterKind, text: impl Into<String>, reason: impl ToString) -> Self {
        TypemapError::Parse {
            kind,
            text: text.into(),
            reason: reason.to_string(),
        }
    }

    /// Builds a [`TypemapError::SchemaConstruction`].
    pub fn schema(message: impl Into<String>) -> Self {
        TypemapError::SchemaConstruction {
            message: message.into(),
        }
    }
}

/// Result type alias for typemap operations.
pub type Result<T> = std::result::Result<T, TypemapError>;
