//! The server collaborator seen by the reconciler.
//!
//! `SchemaServer` covers server-level operations (databases), and
//! `SchemaSession` covers schema operations against one database. Both the
//! HTTP client and the in-process memory server implement them.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use strata_core::document::DatabaseSpec;
use strata_core::{
    ClassDef, ClusterDef, FunctionDef, IndexDef, PropertyDef, ScheduleDef, SequenceDef,
};

use crate::client::GraphError;
use crate::ddl::Statement;

pub type Result<T> = std::result::Result<T, GraphError>;

/// Username/password pair used for basic auth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Registry classes holding named server-side objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Registry {
    Functions,
    Sequences,
    Schedules,
}

impl Registry {
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Functions => "OFunction",
            Self::Sequences => "OSequence",
            Self::Schedules => "OSchedule",
        }
    }
}

/// A class as observed on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    pub super_classes: Vec<String>,
    pub properties: Vec<String>,
}

impl ClassInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p == name)
    }

    pub fn extends(&self, super_class: &str) -> bool {
        self.super_classes.iter().any(|s| s == super_class)
    }
}

/// Server-level operations.
#[async_trait]
pub trait SchemaServer: Send + Sync {
    async fn list_databases(&self) -> Result<Vec<String>>;

    async fn create_database(&self, name: &str, spec: &DatabaseSpec) -> Result<()>;

    async fn drop_database(&self, name: &str) -> Result<()>;

    /// Open a session on an existing database. Credentials default to the
    /// server credentials.
    fn open(&self, name: &str, credentials: Option<Credentials>)
        -> Result<Arc<dyn SchemaSession>>;

    /// Release the server connection. Every later call fails with
    /// [`GraphError::Closed`].
    async fn close(&self);
}

/// Schema operations against one database.
#[async_trait]
pub trait SchemaSession: Send + Sync {
    fn database(&self) -> &str;

    /// List classes. `refresh` bypasses the session's class cache.
    async fn list_classes(&self, refresh: bool) -> Result<Vec<ClassInfo>>;

    async fn create_class(&self, class: &ClassDef) -> Result<()>;

    async fn set_super_class(&self, class: &str, super_class: &str) -> Result<()>;

    /// Create several properties of one class in a single request.
    async fn create_properties(&self, class: &str, properties: &[PropertyDef]) -> Result<()>;

    async fn list_clusters(&self) -> Result<Vec<String>>;

    async fn create_cluster(&self, cluster: &ClusterDef) -> Result<()>;

    async fn list_indexes(&self, refresh: bool) -> Result<Vec<String>>;

    async fn create_index(&self, index: &IndexDef) -> Result<()>;

    /// Names of the records stored in a registry class.
    async fn list_registry(&self, registry: Registry) -> Result<Vec<String>>;

    async fn create_function(&self, function: &FunctionDef) -> Result<()>;

    async fn create_sequence(&self, sequence: &SequenceDef) -> Result<()>;

    async fn create_schedule(&self, schedule: &ScheduleDef) -> Result<()>;

    /// Execute a raw statement with bound parameters.
    async fn execute(&self, statement: &Statement) -> Result<Vec<Value>>;
}
