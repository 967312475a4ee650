//! # fbmap objects
//!
//! The named schema catalogue for the FogBugz XML API (cases, events,
//! projects, areas, ...) and a transport-agnostic [`Client`] that wraps the
//! API commands: it builds request arguments from records, hands them to a
//! caller-supplied [`Transport`], and extracts records from the response.
//!
//! No network code lives here. The transport owns connections and sessions;
//! the client only sees response bodies.

pub mod commands;
pub mod error;
pub mod schemas;
pub mod transport;

pub use commands::{
    Client, FilterSelector, ListAreas, ListFixFors, ListOptions, ListPeople, ListProjects,
    ListStatuses,
};
pub use error::{CommandError, Result};
pub use schemas::{registry, schema};
pub use transport::{Request, Transport};
