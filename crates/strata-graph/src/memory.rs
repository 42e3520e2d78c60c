//! In-process server.
//!
//! Keeps a schema inventory per database and a journal of the statements it
//! was asked to run, rendered by the same builder the HTTP client uses. It
//! enforces the server's ordering rules (a superclass must exist before it
//! is linked, a class before its properties or indexes, a function before a
//! schedule that calls it) so that reconciliation order is observable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

use strata_core::document::DatabaseSpec;
use strata_core::{
    ClassDef, ClusterDef, FunctionDef, IndexDef, PropertyDef, ScheduleDef, SequenceDef,
};

use crate::client::GraphError;
use crate::ddl::{self, Statement};
use crate::server::{ClassInfo, Credentials, Registry, Result, SchemaServer, SchemaSession};

/// Inventory of one in-memory database.
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    pub classes: IndexMap<String, ClassInfo>,
    pub clusters: Vec<String>,
    pub indexes: Vec<String>,
    pub functions: Vec<String>,
    pub sequences: Vec<String>,
    pub schedules: Vec<String>,
    /// Every statement executed against this database, in order.
    pub journal: Vec<String>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        let classes = ["V", "E", "OFunction", "OSequence", "OSchedule"]
            .into_iter()
            .map(|name| (name.to_string(), ClassInfo::new(name)))
            .collect();
        Self {
            classes,
            clusters: vec!["internal".into(), "default".into(), "v".into(), "e".into()],
            indexes: Vec::new(),
            functions: Vec::new(),
            sequences: Vec::new(),
            schedules: Vec::new(),
            journal: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    databases: IndexMap<String, MemoryDatabase>,
    fail_patterns: Vec<String>,
}

/// In-process implementation of [`SchemaServer`].
///
/// Clone is cheap; clones share state, so a test can keep a handle while
/// the engine owns another.
#[derive(Clone, Default)]
pub struct MemoryServer {
    state: Arc<Mutex<MemoryState>>,
    closed: Arc<AtomicBool>,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty existing database.
    pub fn with_database(self, name: &str) -> Self {
        self.lock()
            .databases
            .insert(name.to_string(), MemoryDatabase::default());
        self
    }

    /// Fail every statement whose SQL contains `pattern`.
    pub fn fail_when(self, pattern: &str) -> Self {
        self.lock().fail_patterns.push(pattern.to_string());
        self
    }

    /// Snapshot of one database.
    pub fn database(&self, name: &str) -> Option<MemoryDatabase> {
        self.lock().databases.get(name).cloned()
    }

    pub fn journal(&self, name: &str) -> Vec<String> {
        self.database(name).map(|db| db.journal).unwrap_or_default()
    }

    /// A new open connection to the same databases.
    pub fn reopen(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock only happens in a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(GraphError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SchemaServer for MemoryServer {
    async fn list_databases(&self) -> Result<Vec<String>> {
        self.check_open()?;
        Ok(self.lock().databases.keys().cloned().collect())
    }

    async fn create_database(&self, name: &str, _spec: &DatabaseSpec) -> Result<()> {
        self.check_open()?;
        let mut state = self.lock();
        if state.databases.contains_key(name) {
            return Err(GraphError::Server {
                status: 409,
                message: format!("Database '{name}' already exists"),
            });
        }
        state
            .databases
            .insert(name.to_string(), MemoryDatabase::default());
        Ok(())
    }

    async fn drop_database(&self, name: &str) -> Result<()> {
        self.check_open()?;
        self.lock()
            .databases
            .shift_remove(name)
            .map(|_| ())
            .ok_or_else(|| GraphError::DatabaseNotFound(name.to_string()))
    }

    fn open(
        &self,
        name: &str,
        _credentials: Option<Credentials>,
    ) -> Result<Arc<dyn SchemaSession>> {
        self.check_open()?;
        if !self.lock().databases.contains_key(name) {
            return Err(GraphError::DatabaseNotFound(name.to_string()));
        }
        Ok(Arc::new(MemorySession {
            server: self.clone(),
            database: name.to_string(),
        }))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Session on one in-memory database.
pub struct MemorySession {
    server: MemoryServer,
    database: String,
}

impl MemorySession {
    /// Run `apply` against the database after journaling `sql`, unless the
    /// server is closed or the statement matches a failure pattern.
    fn apply<T>(
        &self,
        sql: &str,
        apply: impl FnOnce(&mut MemoryDatabase) -> Result<T>,
    ) -> Result<T> {
        self.server.check_open()?;
        let mut state = self.server.lock();
        if state.fail_patterns.iter().any(|p| sql.contains(p.as_str())) {
            return Err(GraphError::Server {
                status: 500,
                message: format!("Injected failure for: {sql}"),
            });
        }
        let db = state
            .databases
            .get_mut(&self.database)
            .ok_or_else(|| GraphError::DatabaseNotFound(self.database.clone()))?;
        let result = apply(db)?;
        db.journal.push(sql.to_string());
        Ok(result)
    }

    fn read<T>(&self, read: impl FnOnce(&MemoryDatabase) -> T) -> Result<T> {
        self.server.check_open()?;
        let state = self.server.lock();
        state
            .databases
            .get(&self.database)
            .map(read)
            .ok_or_else(|| GraphError::DatabaseNotFound(self.database.clone()))
    }
}

fn conflict(what: &str, name: &str) -> GraphError {
    GraphError::Server {
        status: 409,
        message: format!("{what} '{name}' already exists"),
    }
}

fn insert_unique(list: &mut Vec<String>, what: &str, name: &str) -> Result<()> {
    if list.iter().any(|n| n == name) {
        return Err(conflict(what, name));
    }
    list.push(name.to_string());
    Ok(())
}

#[async_trait]
impl SchemaSession for MemorySession {
    fn database(&self) -> &str {
        &self.database
    }

    async fn list_classes(&self, _refresh: bool) -> Result<Vec<ClassInfo>> {
        self.read(|db| db.classes.values().cloned().collect())
    }

    async fn create_class(&self, class: &ClassDef) -> Result<()> {
        let sql = ddl::create_class(class).sql;
        self.apply(&sql, |db| {
            if db.classes.contains_key(&class.name) {
                return Err(conflict("Class", &class.name));
            }
            db.classes
                .insert(class.name.clone(), ClassInfo::new(&class.name));
            Ok(())
        })
    }

    async fn set_super_class(&self, class: &str, super_class: &str) -> Result<()> {
        let sql = ddl::alter_super_class(class, super_class).sql;
        self.apply(&sql, |db| {
            if !db.classes.contains_key(super_class) {
                return Err(GraphError::ClassNotFound(super_class.to_string()));
            }
            let info = db
                .classes
                .get_mut(class)
                .ok_or_else(|| GraphError::ClassNotFound(class.to_string()))?;
            info.super_classes = vec![super_class.to_string()];
            Ok(())
        })
    }

    async fn create_properties(&self, class: &str, properties: &[PropertyDef]) -> Result<()> {
        let sql = properties
            .iter()
            .map(|p| ddl::create_property(class, p).sql)
            .collect::<Vec<_>>()
            .join(";\n");
        self.apply(&sql, |db| {
            let info = db
                .classes
                .get_mut(class)
                .ok_or_else(|| GraphError::ClassNotFound(class.to_string()))?;
            for property in properties {
                if info.has_property(&property.name) {
                    return Err(conflict("Property", &format!("{class}.{}", property.name)));
                }
            }
            info.properties
                .extend(properties.iter().map(|p| p.name.clone()));
            Ok(())
        })
    }

    async fn list_clusters(&self) -> Result<Vec<String>> {
        self.read(|db| db.clusters.clone())
    }

    async fn create_cluster(&self, cluster: &ClusterDef) -> Result<()> {
        let sql = ddl::create_cluster(cluster).sql;
        self.apply(&sql, |db| insert_unique(&mut db.clusters, "Cluster", &cluster.name))
    }

    async fn list_indexes(&self, _refresh: bool) -> Result<Vec<String>> {
        self.read(|db| db.indexes.clone())
    }

    async fn create_index(&self, index: &IndexDef) -> Result<()> {
        let sql = ddl::create_index(index).sql;
        self.apply(&sql, |db| {
            let info = db
                .classes
                .get(&index.class)
                .ok_or_else(|| GraphError::ClassNotFound(index.class.clone()))?;
            if let Some(missing) = index.properties.iter().find(|p| !info.has_property(p)) {
                return Err(GraphError::Server {
                    status: 500,
                    message: format!("Property '{}.{missing}' does not exist", index.class),
                });
            }
            insert_unique(&mut db.indexes, "Index", &index.name)
        })
    }

    async fn list_registry(&self, registry: Registry) -> Result<Vec<String>> {
        self.read(|db| match registry {
            Registry::Functions => db.functions.clone(),
            Registry::Sequences => db.sequences.clone(),
            Registry::Schedules => db.schedules.clone(),
        })
    }

    async fn create_function(&self, function: &FunctionDef) -> Result<()> {
        let sql = ddl::create_function(function).sql;
        self.apply(&sql, |db| {
            insert_unique(&mut db.functions, "Function", &function.name)
        })
    }

    async fn create_sequence(&self, sequence: &SequenceDef) -> Result<()> {
        let sql = ddl::create_sequence(sequence).sql;
        self.apply(&sql, |db| {
            insert_unique(&mut db.sequences, "Sequence", &sequence.name)
        })
    }

    async fn create_schedule(&self, schedule: &ScheduleDef) -> Result<()> {
        let sql = ddl::insert_schedule(schedule).sql;
        self.apply(&sql, |db| {
            if !db.functions.iter().any(|f| f == &schedule.function) {
                return Err(GraphError::Server {
                    status: 500,
                    message: format!("Function '{}' not found", schedule.function),
                });
            }
            insert_unique(&mut db.schedules, "Schedule", &schedule.name)
        })
    }

    async fn execute(&self, statement: &Statement) -> Result<Vec<Value>> {
        self.apply(&statement.sql, |_| Ok(Vec::new()))
    }
}
