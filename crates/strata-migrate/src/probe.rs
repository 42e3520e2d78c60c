//! Existence probing.
//!
//! Each reconciler call takes one fresh snapshot of the names that already
//! exist on the server for its kind. Snapshots are never shared between
//! reconciler calls.

use std::collections::{HashMap, HashSet};

use strata_graph::{ClassInfo, Registry, SchemaSession};

use strata_graph::server::Result;

/// What to list on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Classes { refresh: bool },
    Clusters,
    Indexes { refresh: bool },
    Registry(Registry),
}

/// Names present server-side for one kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    names: HashSet<String>,
}

impl Inventory {
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<String> for Inventory {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

/// List existing names of one kind. With a `desired` filter, only names in
/// that set are kept.
pub async fn probe(
    session: &dyn SchemaSession,
    what: Probe,
    desired: Option<&HashSet<String>>,
) -> Result<Inventory> {
    let names: Vec<String> = match what {
        Probe::Classes { refresh } => session
            .list_classes(refresh)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect(),
        Probe::Clusters => session.list_clusters().await?,
        Probe::Indexes { refresh } => session.list_indexes(refresh).await?,
        Probe::Registry(registry) => session.list_registry(registry).await?,
    };

    let inventory: Inventory = names
        .into_iter()
        .filter(|name| desired.map_or(true, |d| d.contains(name)))
        .collect();

    tracing::debug!(
        database = %session.database(),
        probe = ?what,
        existing = inventory.len(),
        "Probed server inventory"
    );
    Ok(inventory)
}

/// Existing classes with their properties and superclasses, keyed by name.
pub async fn probe_classes(
    session: &dyn SchemaSession,
    refresh: bool,
    desired: Option<&HashSet<String>>,
) -> Result<HashMap<String, ClassInfo>> {
    Ok(session
        .list_classes(refresh)
        .await?
        .into_iter()
        .filter(|c| desired.map_or(true, |d| d.contains(&c.name)))
        .map(|c| (c.name.clone(), c))
        .collect())
}
