//! Edge classes: class specs rooted at the base edge class.

use strata_core::{ObjectKind, SchemaDocument};

use crate::error::Result;
use crate::report::KindOutcome;

use super::{class, property, Context};

/// Declare the document's edge classes, link them to their superclasses,
/// then create their properties.
pub async fn reconcile(ctx: &Context<'_>, document: &SchemaDocument) -> Result<Vec<KindOutcome>> {
    let edges = document.edge_classes();
    if edges.is_empty() {
        return Ok(Vec::new());
    }

    let (declared, names) = class::declare(ctx, &edges, ObjectKind::Edge).await?;
    let linked = class::link_super_classes(ctx, &edges, &names).await?;
    let properties = property::reconcile(ctx, &edges, &names, ObjectKind::EdgeProperty).await?;
    Ok(vec![declared, linked, properties])
}
