//! Write operations: data-definition statements against one database.
//!
//! Statements come from [`crate::ddl`]; this module only submits them and
//! keeps the session's class cache coherent.

use async_trait::async_trait;
use serde_json::Value;

use strata_core::{
    ClassDef, ClusterDef, FunctionDef, IndexDef, PropertyDef, ScheduleDef, SequenceDef,
};

use crate::client::OrientSession;
use crate::ddl::{self, Statement};
use crate::server::{ClassInfo, Registry, Result, SchemaSession};

impl OrientSession {
    pub async fn run(&self, statement: &Statement) -> Result<Vec<Value>> {
        self.command(&statement.sql, &statement.params).await
    }

    /// Create one class. Classes changed on the server invalidate the cache.
    pub async fn add_class(&self, class: &ClassDef) -> Result<()> {
        self.run(&ddl::create_class(class)).await?;
        self.invalidate_classes().await;
        Ok(())
    }

    pub async fn link_super_class(&self, class: &str, super_class: &str) -> Result<()> {
        self.run(&ddl::alter_super_class(class, super_class)).await?;
        self.invalidate_classes().await;
        Ok(())
    }

    /// Create properties of one class in a single batch request.
    pub async fn add_properties(&self, class: &str, properties: &[PropertyDef]) -> Result<()> {
        if properties.is_empty() {
            return Ok(());
        }
        let script: Vec<String> = properties
            .iter()
            .map(|p| ddl::create_property(class, p).sql)
            .collect();
        self.script(&script).await?;
        self.invalidate_classes().await;
        Ok(())
    }
}

#[async_trait]
impl SchemaSession for OrientSession {
    fn database(&self) -> &str {
        self.name()
    }

    async fn list_classes(&self, refresh: bool) -> Result<Vec<ClassInfo>> {
        self.fetch_classes(refresh).await
    }

    async fn create_class(&self, class: &ClassDef) -> Result<()> {
        self.add_class(class).await
    }

    async fn set_super_class(&self, class: &str, super_class: &str) -> Result<()> {
        self.link_super_class(class, super_class).await
    }

    async fn create_properties(&self, class: &str, properties: &[PropertyDef]) -> Result<()> {
        self.add_properties(class, properties).await
    }

    async fn list_clusters(&self) -> Result<Vec<String>> {
        self.fetch_clusters().await
    }

    async fn create_cluster(&self, cluster: &ClusterDef) -> Result<()> {
        self.run(&ddl::create_cluster(cluster)).await.map(|_| ())
    }

    async fn list_indexes(&self, refresh: bool) -> Result<Vec<String>> {
        self.fetch_indexes(refresh).await
    }

    async fn create_index(&self, index: &IndexDef) -> Result<()> {
        self.run(&ddl::create_index(index)).await.map(|_| ())
    }

    async fn list_registry(&self, registry: Registry) -> Result<Vec<String>> {
        self.fetch_registry(registry).await
    }

    async fn create_function(&self, function: &FunctionDef) -> Result<()> {
        self.run(&ddl::create_function(function)).await.map(|_| ())
    }

    async fn create_sequence(&self, sequence: &SequenceDef) -> Result<()> {
        self.run(&ddl::create_sequence(sequence)).await.map(|_| ())
    }

    async fn create_schedule(&self, schedule: &ScheduleDef) -> Result<()> {
        self.run(&ddl::insert_schedule(schedule)).await.map(|_| ())
    }

    async fn execute(&self, statement: &Statement) -> Result<Vec<Value>> {
        self.run(statement).await
    }
}
