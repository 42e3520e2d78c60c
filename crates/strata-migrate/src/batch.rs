//! Batch drivers: the entry points used by the CLI.
//!
//! Both drivers own the server connection for the length of the batch and
//! close it whether the batch succeeds or fails.

use futures_util::stream::{self, StreamExt};

use strata_core::{ObjectKind, SchemaDocument};
use strata_graph::SchemaServer;

use crate::config::ConcurrencyConfig;
use crate::error::{MigrateError, Result};
use crate::orchestrator::Orchestrator;
use crate::report::{BatchReport, Diagnostic, Diagnostics};

/// Reconcile `documents` against the server.
pub async fn apply(
    server: &dyn SchemaServer,
    documents: &[SchemaDocument],
    targets: &[String],
    concurrency: &ConcurrencyConfig,
    diagnostics: &Diagnostics,
) -> Result<BatchReport> {
    let result = Orchestrator::new(server, diagnostics, concurrency)
        .run(documents, targets)
        .await;
    server.close().await;

    if let Ok(report) = &result {
        tracing::info!(
            documents = report.documents.len(),
            created = report.created_total(),
            skipped = report.skipped_total(),
            "Schema applied"
        );
    }
    result
}

/// Drop each named database that exists. Returns the names dropped.
pub async fn drop_databases(
    server: &dyn SchemaServer,
    names: &[String],
    concurrency: &ConcurrencyConfig,
    diagnostics: &Diagnostics,
) -> Result<Vec<String>> {
    let result = drop_existing(server, names, concurrency, diagnostics).await;
    server.close().await;
    result
}

async fn drop_existing(
    server: &dyn SchemaServer,
    names: &[String],
    concurrency: &ConcurrencyConfig,
    diagnostics: &Diagnostics,
) -> Result<Vec<String>> {
    let existing = server.list_databases().await?;

    let mut pending = Vec::new();
    for name in names {
        if existing.contains(name) {
            pending.push(name.as_str());
        } else {
            diagnostics.emit(
                Diagnostic::warning(format!("\"{name}\" doesn't exist"))
                    .kind(ObjectKind::Database)
                    .database(name),
            );
        }
    }

    let results: Vec<Result<String>> = stream::iter(pending)
        .map(|name| async move {
            server.drop_database(name).await?;
            diagnostics.emit(
                Diagnostic::success(format!("Dropping \"{name}\""))
                    .kind(ObjectKind::Database)
                    .database(name),
            );
            Ok::<_, MigrateError>(name.to_string())
        })
        .buffer_unordered(concurrency.drops.max(1))
        .collect()
        .await;
    results.into_iter().collect()
}
