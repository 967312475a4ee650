//! Command errors.

use fbmap_typemap::TypemapError;
use thiserror::Error;

/// Errors raised by [`Client`](crate::Client) calls.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Arguments rejected before anything was sent.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Conversion failed in either direction.
    #[error(transparent)]
    Typemap(#[from] TypemapError),

    /// The transport could not deliver the request.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The API answered with an `<error>` element.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// The response lacks the element the command reads its records from.
    #[error("response has no <{tag}> element")]
    MissingElement { tag: String },
}

impl CommandError {
    /// Bad command arguments, rejected before anything is sent.
    pub fn invalid(message: impl Into<String>) -> Self {
        CommandError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Transport failure reported by the caller's [`Transport`](crate::Transport).
    pub fn transport(message: impl Into<String>) -> Self {
        CommandError::Transport {
            message: message.into(),
        }
    }
}

/// Result alias for command operations.
pub type Result<T> = std::result::Result<T, CommandError>;
