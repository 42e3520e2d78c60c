//! Target databases and the sessions opened on them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use strata_core::{DatabaseSpec, ObjectKind, SchemaDocument};
use strata_graph::ddl;
use strata_graph::{Credentials, SchemaServer, SchemaSession};

use crate::error::{MigrateError, Result};
use crate::report::{Diagnostic, Diagnostics, KindOutcome};

/// Which database a document is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// The database named by the document's `db` section. An existing
    /// database is reported.
    Declared,
    /// A database named on the command line. An existing database is reused
    /// silently.
    Named(&'a str),
}

/// One session per target database, opened on first use and shared by every
/// reconciler and document that targets it.
pub struct SessionPool<'a> {
    server: &'a dyn SchemaServer,
    sessions: HashMap<String, Arc<dyn SchemaSession>>,
}

impl<'a> SessionPool<'a> {
    pub fn new(server: &'a dyn SchemaServer) -> Self {
        Self {
            server,
            sessions: HashMap::new(),
        }
    }

    pub fn server(&self) -> &'a dyn SchemaServer {
        self.server
    }

    pub fn get_or_open(
        &mut self,
        name: &str,
        spec: Option<&DatabaseSpec>,
    ) -> strata_graph::server::Result<Arc<dyn SchemaSession>> {
        if let Some(session) = self.sessions.get(name) {
            return Ok(Arc::clone(session));
        }
        let session = self.server.open(name, credentials(spec))?;
        self.sessions.insert(name.to_string(), Arc::clone(&session));
        Ok(session)
    }
}

/// Database-level credentials, when the document gives both halves.
fn credentials(spec: Option<&DatabaseSpec>) -> Option<Credentials> {
    let spec = spec?;
    Some(Credentials {
        username: spec.username.clone()?,
        password: spec.password.clone()?,
    })
}

/// Make sure the target database exists and open a session on it.
///
/// Returns `None` when the document names no database and none was given on
/// the command line; the document is then skipped with a warning.
pub async fn ensure(
    pool: &mut SessionPool<'_>,
    document: &SchemaDocument,
    target: Target<'_>,
    diagnostics: &Diagnostics,
) -> Result<Option<(Arc<dyn SchemaSession>, KindOutcome)>> {
    let kind = ObjectKind::Database;
    let source = document.source();
    let spec = document.db.as_ref();

    let name = match target {
        Target::Named(name) => name.to_string(),
        Target::Declared => match document.database_name() {
            Some(name) => name.to_string(),
            None => {
                let missing = if spec.is_none() { "db" } else { "db.name" };
                diagnostics.emit(
                    Diagnostic::warning(format!(
                        "\"{missing}\" was not found in \"{}\"",
                        source.display()
                    ))
                    .kind(kind),
                );
                return Ok(None);
            }
        },
    };

    let server = pool.server();
    let mut outcome = KindOutcome::new(kind);
    let exists = server
        .list_databases()
        .await
        .map_err(|e| server_error(kind, source, e))?
        .contains(&name);

    if exists {
        if target == Target::Declared {
            diagnostics.emit(
                Diagnostic::warning(format!("[DatabaseIgnored] \"{name}\" already exists"))
                    .kind(kind)
                    .database(&name)
                    .source(source),
            );
        }
        outcome.skipped.push(name.clone());
    } else {
        let spec = spec.cloned().unwrap_or_default();
        server
            .create_database(&name, &spec)
            .await
            .map_err(|e| server_error(kind, source, e))?;
        outcome.created.push(name.clone());
    }

    let session = pool
        .get_or_open(&name, spec)
        .map_err(|e| server_error(kind, source, e))?;

    if !outcome.created.is_empty() {
        if spec.is_some_and(|s| s.lightweight_edges) {
            session
                .execute(&ddl::alter_database_custom("useLightweightEdges", true))
                .await
                .map_err(|e| server_error(kind, source, e))?;
        }
        diagnostics.emit(
            Diagnostic::success(format!("Creating \"{name}\" database"))
                .kind(kind)
                .database(&name)
                .source(source),
        );
    }

    Ok(Some((session, outcome)))
}

fn server_error(kind: ObjectKind, path: &Path, source: strata_graph::GraphError) -> MigrateError {
    MigrateError::Server {
        kind,
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use strata_graph::MemoryServer;

    use super::*;

    fn document(yaml: &str) -> SchemaDocument {
        serde_yaml::from_str::<SchemaDocument>(yaml)
            .unwrap()
            .with_source("app.yml")
    }

    #[tokio::test]
    async fn test_creates_missing_database_with_lightweight_edges() {
        let server = MemoryServer::new();
        let mut pool = SessionPool::new(&server);
        let diagnostics = Diagnostics::new();
        let doc = document("db:\n  name: demo\n  lightweightEdges: true\n");

        let (session, outcome) = ensure(&mut pool, &doc, Target::Declared, &diagnostics)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(session.database(), "demo");
        assert_eq!(outcome.created, vec!["demo"]);
        assert_eq!(
            server.journal("demo"),
            vec!["ALTER DATABASE CUSTOM useLightweightEdges = true"]
        );
        assert_eq!(
            diagnostics.successes()[0].message,
            "Creating \"demo\" database"
        );
    }

    #[tokio::test]
    async fn test_existing_database_warns_only_when_declared() {
        let server = MemoryServer::new().with_database("demo");
        let mut pool = SessionPool::new(&server);
        let diagnostics = Diagnostics::new();
        let doc = document("db:\n  name: demo\n");

        ensure(&mut pool, &doc, Target::Named("demo"), &diagnostics)
            .await
            .unwrap();
        assert!(diagnostics.warnings().is_empty());

        ensure(&mut pool, &doc, Target::Declared, &diagnostics)
            .await
            .unwrap();
        assert_eq!(
            diagnostics.warnings()[0].message,
            "[DatabaseIgnored] \"demo\" already exists"
        );
    }

    #[tokio::test]
    async fn test_missing_name_skips_document() {
        let server = MemoryServer::new();
        let mut pool = SessionPool::new(&server);
        let diagnostics = Diagnostics::new();

        let none = ensure(&mut pool, &document("class:\n  Person:\n"), Target::Declared, &diagnostics)
            .await
            .unwrap();
        assert!(none.is_none());
        assert_eq!(
            diagnostics.warnings()[0].message,
            "\"db\" was not found in \"app.yml\""
        );
    }
}
