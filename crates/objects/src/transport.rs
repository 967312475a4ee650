//! The seam between the client and whatever carries requests to the API.

use fbmap_typemap::WireArgs;

use crate::error::Result;

/// One API call: the command name and its arguments.
#[derive(Debug)]
pub struct Request {
    pub command: String,
    pub args: WireArgs,
}

impl Request {
    /// Request without arguments.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: WireArgs::new(),
        }
    }

    /// Request carrying prebuilt arguments and attachments.
    pub fn with_args(command: impl Into<String>, args: WireArgs) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Adds one plain argument.
    pub fn arg(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.args.insert(name, value.to_string());
        self
    }

    /// Adds an argument only when `value` is present.
    pub fn arg_opt<V: ToString>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.arg(name, value),
            None => self,
        }
    }

    /// Adds `name=1` when `flag` is set.
    pub fn flag(self, name: impl Into<String>, flag: bool) -> Self {
        if flag { self.arg(name, 1) } else { self }
    }
}

/// Delivers a request and returns the raw XML response body.
///
/// Implementations own connection and session state; the client never
/// shares one process-wide.
pub trait Transport {
    fn call(&self, request: Request) -> Result<String>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn call(&self, request: Request) -> Result<String> {
        (**self).call(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn call(&self, request: Request) -> Result<String> {
        (**self).call(request)
    }
}
