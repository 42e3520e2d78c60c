//! Read operations: schema inventory of one database.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::client::{GraphError, OrientSession};
use crate::ddl;
use crate::server::{ClassInfo, Registry, Result};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawMetadata {
    classes: Vec<RawClass>,
    clusters: Vec<RawCluster>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawClass {
    name: String,
    super_class: Option<String>,
    super_classes: Vec<String>,
    properties: Vec<RawProperty>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProperty {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCluster {
    name: String,
}

impl From<RawClass> for ClassInfo {
    fn from(raw: RawClass) -> Self {
        let mut super_classes = raw.super_classes;
        if let Some(single) = raw.super_class.filter(|s| !s.is_empty()) {
            if !super_classes.contains(&single) {
                super_classes.push(single);
            }
        }
        ClassInfo {
            name: raw.name,
            super_classes,
            properties: raw.properties.into_iter().map(|p| p.name).collect(),
        }
    }
}

fn decode_metadata(body: Value) -> Result<RawMetadata> {
    serde_json::from_value(body).map_err(|e| GraphError::Serialization(e.to_string()))
}

/// Collect the `name` column of a result set.
pub(crate) fn names(rows: &[Value]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.get("name")?.as_str().map(str::to_string))
        .collect()
}

impl OrientSession {
    /// List classes with their properties, using the session cache unless
    /// `refresh` is set.
    pub async fn fetch_classes(&self, refresh: bool) -> Result<Vec<ClassInfo>> {
        let mut cache = self.classes.lock().await;
        if !refresh {
            if let Some(classes) = cache.as_ref() {
                return Ok(classes.clone());
            }
        }

        let metadata = decode_metadata(self.metadata().await?)?;
        let classes: Vec<ClassInfo> = metadata.classes.into_iter().map(ClassInfo::from).collect();

        tracing::debug!(
            database = %self.name(),
            count = classes.len(),
            "Fetched class list"
        );
        *cache = Some(classes.clone());
        Ok(classes)
    }

    pub async fn fetch_clusters(&self) -> Result<Vec<String>> {
        let metadata = decode_metadata(self.metadata().await?)?;
        Ok(metadata.clusters.into_iter().map(|c| c.name).collect())
    }

    /// Index names. The index manager is always read fresh; `refresh` is
    /// accepted for symmetry with the class list.
    pub async fn fetch_indexes(&self, _refresh: bool) -> Result<Vec<String>> {
        let stmt = ddl::select_index_names();
        let rows = self.command(&stmt.sql, &stmt.params).await?;
        Ok(names(&rows))
    }

    pub async fn fetch_registry(&self, registry: Registry) -> Result<Vec<String>> {
        let stmt = ddl::select_names(registry);
        let rows = self.command(&stmt.sql, &Map::new()).await?;
        Ok(names(&rows))
    }
}
