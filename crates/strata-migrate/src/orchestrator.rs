//! Two-stage schema application.
//!
//! The immediate stage runs per document, one document at a time: database,
//! sequences, functions, schedules, clusters, class declarations. The
//! deferred stage (superclass links, class properties, edges, indexes) runs
//! once every document has been declared, with bounded concurrency across
//! documents. Its input is the set of class names the immediate stage left
//! on the server.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};

use strata_core::{ObjectKind, SchemaDocument};
use strata_graph::{SchemaServer, SchemaSession};

use crate::config::ConcurrencyConfig;
use crate::error::Result;
use crate::reconcile::database::{self, SessionPool, Target};
use crate::reconcile::{class, edge, index, named, property, Context};
use crate::report::{BatchReport, Diagnostics, DocumentReport, KindOutcome};

/// Work left for one document after its immediate stage.
struct DeferredStage<'d> {
    document: &'d SchemaDocument,
    session: Arc<dyn SchemaSession>,
    declared_classes: BTreeSet<String>,
    report: usize,
}

pub struct Orchestrator<'a> {
    server: &'a dyn SchemaServer,
    diagnostics: &'a Diagnostics,
    concurrency: &'a ConcurrencyConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        server: &'a dyn SchemaServer,
        diagnostics: &'a Diagnostics,
        concurrency: &'a ConcurrencyConfig,
    ) -> Self {
        Self {
            server,
            diagnostics,
            concurrency,
        }
    }

    /// Apply every document. With `targets`, each document is applied to
    /// each named database; otherwise to the database it declares.
    pub async fn run(&self, documents: &[SchemaDocument], targets: &[String]) -> Result<BatchReport> {
        let mut pool = SessionPool::new(self.server);
        let mut reports = Vec::new();
        let mut stages = Vec::new();

        let plan: Vec<Target<'_>> = if targets.is_empty() {
            vec![Target::Declared]
        } else {
            targets.iter().map(|t| Target::Named(t)).collect()
        };

        for document in documents {
            for target in &plan {
                if let Some(stage) = self
                    .declare(&mut pool, document, *target, &mut reports)
                    .await?
                {
                    stages.push(stage);
                }
            }
        }

        let settled: Vec<Result<(usize, Vec<KindOutcome>)>> = stream::iter(stages)
            .map(|stage| self.settle(stage))
            .buffer_unordered(self.concurrency.deferred.max(1))
            .collect()
            .await;
        for result in settled {
            let (report, outcomes) = result?;
            reports[report].outcomes.extend(outcomes);
        }

        Ok(BatchReport { documents: reports })
    }

    fn context<'s>(&'s self, session: &'s dyn SchemaSession, document: &'s SchemaDocument) -> Context<'s> {
        Context {
            session,
            source: document.source(),
            diagnostics: self.diagnostics,
            concurrency: self.concurrency,
        }
    }

    async fn declare<'d>(
        &self,
        pool: &mut SessionPool<'_>,
        document: &'d SchemaDocument,
        target: Target<'_>,
        reports: &mut Vec<DocumentReport>,
    ) -> Result<Option<DeferredStage<'d>>> {
        let Some((session, database)) =
            database::ensure(pool, document, target, self.diagnostics).await?
        else {
            return Ok(None);
        };

        let ctx = self.context(session.as_ref(), document);
        tracing::debug!(
            database = %ctx.database(),
            source = %document.source().display(),
            "Declaring schema document"
        );

        let mut outcomes = vec![database];
        outcomes.push(named::sequences(&ctx, &document.sequence).await?);
        outcomes.push(named::functions(&ctx, &document.function).await?);
        outcomes.push(named::schedules(&ctx, &document.schedule).await?);
        outcomes.push(named::clusters(&ctx, &document.cluster).await?);
        let (classes, declared_classes) =
            class::declare(&ctx, &document.class, ObjectKind::Class).await?;
        outcomes.push(classes);

        reports.push(DocumentReport {
            source: document.source().to_path_buf(),
            database: ctx.database().to_string(),
            outcomes,
        });

        Ok(Some(DeferredStage {
            document,
            session: Arc::clone(&session),
            declared_classes,
            report: reports.len() - 1,
        }))
    }

    async fn settle(&self, stage: DeferredStage<'_>) -> Result<(usize, Vec<KindOutcome>)> {
        let document = stage.document;
        let ctx = self.context(stage.session.as_ref(), document);
        let declared = &stage.declared_classes;

        let mut outcomes = Vec::new();
        outcomes.push(class::link_super_classes(&ctx, &document.class, declared).await?);
        outcomes
            .push(property::reconcile(&ctx, &document.class, declared, ObjectKind::Property).await?);
        outcomes.extend(edge::reconcile(&ctx, document).await?);
        outcomes.push(index::reconcile(&ctx, document).await?);
        Ok((stage.report, outcomes))
    }
}
