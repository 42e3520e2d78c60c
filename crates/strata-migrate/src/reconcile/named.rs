//! Clusters, functions, sequences and schedules.
//!
//! These kinds share one shape: a map of shorthand-or-full entries, a
//! validator producing a normalized definition, and a single create call.

use std::collections::HashSet;

use futures_util::future::BoxFuture;
use indexmap::IndexMap;

use strata_core::error::Result as ValidationResult;
use strata_core::{validate, ClusterDef, Entry, FunctionDef, ObjectKind, ScheduleDef, SequenceDef};
use strata_graph::server::Result as GraphResult;
use strata_graph::{Registry, SchemaSession};

use crate::error::Result;
use crate::probe::{probe, Probe};
use crate::report::KindOutcome;

use super::{run_bounded, Context};

/// A validated object that can be created by name.
pub trait NamedObject: Sized {
    const KIND: ObjectKind;
    const PROBE: Probe;

    fn validate(key: &str, entry: &Entry) -> ValidationResult<Self>;

    fn name(&self) -> &str;

    fn create<'a>(&'a self, session: &'a dyn SchemaSession) -> BoxFuture<'a, GraphResult<()>>;
}

impl NamedObject for ClusterDef {
    const KIND: ObjectKind = ObjectKind::Cluster;
    const PROBE: Probe = Probe::Clusters;

    fn validate(key: &str, entry: &Entry) -> ValidationResult<Self> {
        validate::cluster(key, entry)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn create<'a>(&'a self, session: &'a dyn SchemaSession) -> BoxFuture<'a, GraphResult<()>> {
        session.create_cluster(self)
    }
}

impl NamedObject for FunctionDef {
    const KIND: ObjectKind = ObjectKind::Function;
    const PROBE: Probe = Probe::Registry(Registry::Functions);

    fn validate(key: &str, entry: &Entry) -> ValidationResult<Self> {
        validate::function(key, entry)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn create<'a>(&'a self, session: &'a dyn SchemaSession) -> BoxFuture<'a, GraphResult<()>> {
        session.create_function(self)
    }
}

impl NamedObject for SequenceDef {
    const KIND: ObjectKind = ObjectKind::Sequence;
    const PROBE: Probe = Probe::Registry(Registry::Sequences);

    fn validate(key: &str, entry: &Entry) -> ValidationResult<Self> {
        validate::sequence(key, entry)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn create<'a>(&'a self, session: &'a dyn SchemaSession) -> BoxFuture<'a, GraphResult<()>> {
        session.create_sequence(self)
    }
}

impl NamedObject for ScheduleDef {
    const KIND: ObjectKind = ObjectKind::Schedule;
    const PROBE: Probe = Probe::Registry(Registry::Schedules);

    fn validate(key: &str, entry: &Entry) -> ValidationResult<Self> {
        validate::schedule(key, entry)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn create<'a>(&'a self, session: &'a dyn SchemaSession) -> BoxFuture<'a, GraphResult<()>> {
        session.create_schedule(self)
    }
}

/// Reconcile one map of named entries.
pub async fn reconcile<D: NamedObject>(
    ctx: &Context<'_>,
    entries: &IndexMap<String, Entry>,
) -> Result<KindOutcome> {
    let mut outcome = KindOutcome::new(D::KIND);
    if entries.is_empty() {
        return Ok(outcome);
    }

    let desired: HashSet<String> = entries
        .iter()
        .map(|(key, entry)| entry.effective_name(key).to_string())
        .collect();
    let existing = probe(ctx.session, D::PROBE, Some(&desired))
        .await
        .map_err(|e| ctx.server_error(D::KIND, e))?;

    let mut pending = Vec::new();
    for (key, entry) in entries {
        let name = entry.effective_name(key);
        if existing.contains(name) {
            ctx.skipped(D::KIND, name);
            outcome.skipped.push(name.to_string());
        } else {
            pending.push((key.as_str(), entry));
        }
    }

    outcome.created = run_bounded(pending, ctx.concurrency.objects, |(key, entry)| async move {
        let def = D::validate(key, entry).map_err(|e| ctx.invalid(e))?;
        def.create(ctx.session)
            .await
            .map_err(|e| ctx.server_error(D::KIND, e))?;
        Ok(def.name().to_string())
    })
    .await?;

    ctx.finish(&outcome);
    Ok(outcome)
}

pub async fn clusters(ctx: &Context<'_>, entries: &IndexMap<String, Entry>) -> Result<KindOutcome> {
    reconcile::<ClusterDef>(ctx, entries).await
}

pub async fn functions(ctx: &Context<'_>, entries: &IndexMap<String, Entry>) -> Result<KindOutcome> {
    reconcile::<FunctionDef>(ctx, entries).await
}

pub async fn sequences(ctx: &Context<'_>, entries: &IndexMap<String, Entry>) -> Result<KindOutcome> {
    reconcile::<SequenceDef>(ctx, entries).await
}

pub async fn schedules(ctx: &Context<'_>, entries: &IndexMap<String, Entry>) -> Result<KindOutcome> {
    reconcile::<ScheduleDef>(ctx, entries).await
}
