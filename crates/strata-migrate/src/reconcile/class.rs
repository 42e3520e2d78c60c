//! Class declaration and superclass linking.
//!
//! Classes are created bare first. Superclasses are linked in a second pass,
//! once every class of the batch exists, so a class may name a sibling as its
//! superclass regardless of creation order.

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;

use strata_core::{ClassDef, ClassSpec, ObjectKind};

use crate::error::Result;
use crate::probe::{probe, probe_classes, Probe};
use crate::report::KindOutcome;

use super::{run_bounded, Context};

/// Create the classes that do not exist yet, without superclasses.
///
/// Returns the outcome and the names of every class now known to exist
/// (created or already present).
pub async fn declare(
    ctx: &Context<'_>,
    classes: &IndexMap<String, ClassSpec>,
    kind: ObjectKind,
) -> Result<(KindOutcome, BTreeSet<String>)> {
    let mut outcome = KindOutcome::new(kind);
    if classes.is_empty() {
        return Ok((outcome, BTreeSet::new()));
    }

    let desired: HashSet<String> = classes
        .iter()
        .map(|(key, spec)| spec.effective_name(key).to_string())
        .collect();
    let existing = probe(ctx.session, Probe::Classes { refresh: false }, Some(&desired))
        .await
        .map_err(|e| ctx.server_error(kind, e))?;

    let mut pending = Vec::new();
    for (key, spec) in classes {
        let name = spec.effective_name(key);
        if existing.contains(name) {
            ctx.skipped(kind, name);
            outcome.skipped.push(name.to_string());
        } else {
            pending.push(ClassDef {
                super_class: None,
                ..spec.to_def(key)
            });
        }
    }

    outcome.created = run_bounded(pending, ctx.concurrency.objects, |class| async move {
        ctx.session
            .create_class(&class)
            .await
            .map_err(|e| ctx.server_error(kind, e))?;
        Ok(class.name)
    })
    .await?;

    ctx.finish(&outcome);

    let declared: BTreeSet<String> = outcome
        .created
        .iter()
        .chain(&outcome.skipped)
        .cloned()
        .collect();
    Ok((outcome, declared))
}

/// Link every declared class to the superclass its spec names. Links already
/// present on the server are skipped.
pub async fn link_super_classes(
    ctx: &Context<'_>,
    classes: &IndexMap<String, ClassSpec>,
    declared: &BTreeSet<String>,
) -> Result<KindOutcome> {
    let kind = ObjectKind::SuperClass;
    let mut outcome = KindOutcome::new(kind);

    let links: Vec<(String, String)> = classes
        .iter()
        .filter_map(|(key, spec)| {
            let name = spec.effective_name(key);
            let parent = spec.super_class.as_ref()?;
            declared
                .contains(name)
                .then(|| (name.to_string(), parent.clone()))
        })
        .collect();
    if links.is_empty() {
        return Ok(outcome);
    }

    let desired: HashSet<String> = links.iter().map(|(name, _)| name.clone()).collect();
    let existing = probe_classes(ctx.session, true, Some(&desired))
        .await
        .map_err(|e| ctx.server_error(kind, e))?;

    let mut pending = Vec::new();
    for (name, parent) in links {
        if existing.get(&name).is_some_and(|info| info.extends(&parent)) {
            ctx.warn(
                kind,
                format!("[SuperClassIgnored] \"{name}\" already extends \"{parent}\""),
            );
            outcome.skipped.push(name);
        } else {
            pending.push((name, parent));
        }
    }

    outcome.created = run_bounded(pending, ctx.concurrency.objects, |(name, parent)| async move {
        ctx.session
            .set_super_class(&name, &parent)
            .await
            .map_err(|e| ctx.server_error(kind, e))?;
        Ok(name)
    })
    .await?;

    ctx.finish(&outcome);
    Ok(outcome)
}
