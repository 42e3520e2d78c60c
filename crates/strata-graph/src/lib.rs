//! strata-graph: OrientDB client for schema reconciliation.
//!
//! This crate is the single point where schema statements reach the server.
//! Statements are built in [`ddl`], submitted through the [`SchemaServer`] /
//! [`SchemaSession`] traits, and served either by the HTTP client or by the
//! in-process [`memory`] server.

pub mod client;
pub mod ddl;
pub mod memory;
pub mod mutations;
pub mod queries;
pub mod server;

pub use client::{GraphError, OrientClient, OrientSession, ServerConfig};
pub use ddl::Statement;
pub use memory::MemoryServer;
pub use server::{ClassInfo, Credentials, Registry, SchemaServer, SchemaSession};
