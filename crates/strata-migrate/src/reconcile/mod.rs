//! Object reconcilers.
//!
//! Every reconciler follows the same steps: probe the names that already
//! exist for its kind, warn about and skip those, validate and create the
//! rest with bounded concurrency, then report one aggregate success line if
//! anything was created.

pub mod class;
pub mod database;
pub mod edge;
pub mod index;
pub mod named;
pub mod property;

use std::future::Future;
use std::path::Path;

use futures_util::stream::{self, StreamExt};

use strata_core::{ObjectKind, ValidationError};
use strata_graph::{GraphError, SchemaSession};

use crate::config::ConcurrencyConfig;
use crate::error::{MigrateError, Result};
use crate::report::{Diagnostic, Diagnostics, KindOutcome};

/// Everything a reconciler needs for one document against one database.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub session: &'a dyn SchemaSession,
    pub source: &'a Path,
    pub diagnostics: &'a Diagnostics,
    pub concurrency: &'a ConcurrencyConfig,
}

impl Context<'_> {
    pub fn database(&self) -> &str {
        self.session.database()
    }

    pub fn warn(&self, kind: ObjectKind, message: impl Into<String>) {
        self.diagnostics.emit(
            Diagnostic::warning(message)
                .kind(kind)
                .database(self.database())
                .source(self.source),
        );
    }

    /// Report an object that already exists.
    pub fn skipped(&self, kind: ObjectKind, name: &str) {
        self.warn(
            kind,
            format!(
                "[{}Ignored] \"{name}\" already exists in \"{}\"",
                kind.tag(),
                self.database()
            ),
        );
    }

    /// Emit the aggregate success line for a kind, if anything was created.
    pub fn finish(&self, outcome: &KindOutcome) {
        if outcome.created.is_empty() {
            return;
        }
        self.diagnostics.emit(
            Diagnostic::success(format!(
                "Creating \"{}\" {}",
                self.database(),
                outcome.kind.plural()
            ))
            .kind(outcome.kind)
            .database(self.database())
            .source(self.source),
        );
    }

    pub fn invalid(&self, source: ValidationError) -> MigrateError {
        MigrateError::Validation {
            path: self.source.to_path_buf(),
            source,
        }
    }

    pub fn server_error(&self, kind: ObjectKind, source: GraphError) -> MigrateError {
        MigrateError::Server {
            kind,
            path: self.source.to_path_buf(),
            source,
        }
    }
}

/// Run `f` over `items` with at most `limit` in flight.
///
/// Every future runs to completion; the first error in completion order is
/// returned after all of them have settled.
pub async fn run_bounded<I, T, F, Fut>(items: Vec<I>, limit: usize, f: F) -> Result<Vec<T>>
where
    F: FnMut(I) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let results: Vec<Result<T>> = stream::iter(items)
        .map(f)
        .buffer_unordered(limit.max(1))
        .collect()
        .await;
    results.into_iter().collect()
}
