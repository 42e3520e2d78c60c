//! Class properties.
//!
//! Missing properties of one class are created in a single batch request.
//! Properties already present on the class are never part of that batch.

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;

use strata_core::{validate, ClassSpec, ObjectKind, PropertyDef};

use crate::error::Result;
use crate::probe::probe_classes;
use crate::report::KindOutcome;

use super::{run_bounded, Context};

pub async fn reconcile(
    ctx: &Context<'_>,
    classes: &IndexMap<String, ClassSpec>,
    declared: &BTreeSet<String>,
    kind: ObjectKind,
) -> Result<KindOutcome> {
    let mut outcome = KindOutcome::new(kind);

    let owners: Vec<(&str, &ClassSpec)> = classes
        .iter()
        .map(|(key, spec)| (spec.effective_name(key), spec))
        .filter(|(name, spec)| !spec.props.is_empty() && declared.contains(*name))
        .collect();
    if owners.is_empty() {
        return Ok(outcome);
    }

    let desired: HashSet<String> = owners.iter().map(|(name, _)| name.to_string()).collect();
    let existing = probe_classes(ctx.session, true, Some(&desired))
        .await
        .map_err(|e| ctx.server_error(kind, e))?;

    let mut batches: Vec<(&str, Vec<PropertyDef>)> = Vec::new();
    for (class, spec) in owners {
        let info = existing.get(class);
        let mut batch = Vec::new();
        for (key, entry) in &spec.props {
            let name = entry.effective_name(key);
            if info.is_some_and(|info| info.has_property(name)) {
                let qualified = format!("{class}.{name}");
                ctx.skipped(kind, &qualified);
                outcome.skipped.push(qualified);
            } else {
                batch.push(validate::property(key, entry).map_err(|e| ctx.invalid(e))?);
            }
        }
        if !batch.is_empty() {
            batches.push((class, batch));
        }
    }

    let created = run_bounded(batches, ctx.concurrency.properties, |(class, batch)| async move {
        ctx.session
            .create_properties(class, &batch)
            .await
            .map_err(|e| ctx.server_error(kind, e))?;
        Ok(batch
            .iter()
            .map(|p| format!("{class}.{}", p.name))
            .collect::<Vec<_>>())
    })
    .await?;
    outcome.created = created.into_iter().flatten().collect();

    ctx.finish(&outcome);
    Ok(outcome)
}
