//! strata-migrate: declarative schema reconciliation for OrientDB.
//!
//! Schema documents are loaded from YAML or JSON files and applied to the
//! server in two stages per document. Objects that already exist are
//! reported and left untouched; everything else is validated and created.
//!
//! - [`loader`]: schema file discovery and parsing
//! - [`probe`]: server inventory snapshots
//! - [`reconcile`]: one reconciler per object kind
//! - [`orchestrator`]: stage ordering across documents
//! - [`batch`]: connection-owning entry points
//! - [`runner`]: the external versioned-migration tool

pub mod batch;
pub mod config;
pub mod error;
pub mod loader;
pub mod orchestrator;
pub mod probe;
pub mod reconcile;
pub mod report;
pub mod runner;

pub use config::{load_config, ConcurrencyConfig, RunnerConfig, ServerOverrides, StrataConfig};
pub use error::{MigrateError, Result};
pub use report::{BatchReport, Diagnostic, Diagnostics, Severity};
