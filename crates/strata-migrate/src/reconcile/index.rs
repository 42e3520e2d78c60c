//! Indexes, from the global index map and the indexes nested under classes.

use std::collections::HashSet;

use strata_core::{validate, ObjectKind, SchemaDocument};

use crate::error::Result;
use crate::probe::{probe, Probe};
use crate::report::KindOutcome;

use super::{run_bounded, Context};

pub async fn reconcile(ctx: &Context<'_>, document: &SchemaDocument) -> Result<KindOutcome> {
    let kind = ObjectKind::Index;
    let mut outcome = KindOutcome::new(kind);

    let candidates = document.index_candidates();
    if candidates.is_empty() {
        return Ok(outcome);
    }

    let desired: HashSet<String> = candidates.iter().map(|c| c.name()).collect();
    let existing = probe(ctx.session, Probe::Indexes { refresh: true }, Some(&desired))
        .await
        .map_err(|e| ctx.server_error(kind, e))?;

    let mut pending = Vec::new();
    for candidate in candidates {
        let name = candidate.name();
        if existing.contains(&name) {
            ctx.skipped(kind, &name);
            outcome.skipped.push(name);
        } else {
            pending.push(candidate);
        }
    }

    outcome.created = run_bounded(pending, ctx.concurrency.objects, |candidate| async move {
        let index = validate::index(&candidate).map_err(|e| ctx.invalid(e))?;
        ctx.session
            .create_index(&index)
            .await
            .map_err(|e| ctx.server_error(kind, e))?;
        Ok(index.name)
    })
    .await?;

    ctx.finish(&outcome);
    Ok(outcome)
}
