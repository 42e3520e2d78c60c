//! Diagnostics and run reports.
//!
//! Every user-facing line goes through [`Diagnostics`], which keeps a copy
//! for the caller and logs the rendered line through `tracing` on the
//! matching level.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use strata_core::ObjectKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Failure,
}

impl Severity {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Success => "✔",
            Self::Warning => "⚠",
            Self::Failure => "✖",
        }
    }
}

/// One diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub kind: Option<ObjectKind>,
    pub database: Option<String>,
    pub source: Option<PathBuf>,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            kind: None,
            database: None,
            source: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(Severity::Failure, message)
    }

    pub fn kind(mut self, kind: ObjectKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn database(mut self, database: &str) -> Self {
        self.database = Some(database.to_string());
        self
    }

    /// Attach the schema file as a hint.
    pub fn source(mut self, source: &Path) -> Self {
        if !source.as_os_str().is_empty() {
            self.source = Some(source.to_path_buf());
        }
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.severity.symbol(), self.message)?;
        if let Some(source) = &self.source {
            write!(f, "\n  at {}", source.display())?;
        }
        Ok(())
    }
}

/// Shared diagnostic sink. Clone is cheap and clones share entries.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and log its rendered line.
    pub fn emit(&self, diagnostic: Diagnostic) {
        let kind = diagnostic.kind.map(|k| k.label());
        let database = diagnostic.database.as_deref();
        let source = diagnostic.source.as_ref().map(|p| p.display().to_string());

        match diagnostic.severity {
            Severity::Success => tracing::info!(?database, ?kind, ?source, "{diagnostic}"),
            Severity::Warning => tracing::warn!(?database, ?kind, ?source, "{diagnostic}"),
            Severity::Failure => tracing::error!(?database, ?kind, ?source, "{diagnostic}"),
        }

        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(diagnostic);
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn with_severity(&self, severity: Severity) -> Vec<Diagnostic> {
        self.entries()
            .into_iter()
            .filter(|d| d.severity == severity)
            .collect()
    }

    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.with_severity(Severity::Warning)
    }

    pub fn successes(&self) -> Vec<Diagnostic> {
        self.with_severity(Severity::Success)
    }
}

/// What one reconciler call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindOutcome {
    pub kind: ObjectKind,
    pub created: Vec<String>,
    pub skipped: Vec<String>,
}

impl KindOutcome {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            created: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Outcomes of every reconciler run for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub source: PathBuf,
    pub database: String,
    pub outcomes: Vec<KindOutcome>,
}

impl DocumentReport {
    pub fn created_total(&self) -> usize {
        self.outcomes.iter().map(|o| o.created.len()).sum()
    }

    pub fn skipped_total(&self) -> usize {
        self.outcomes.iter().map(|o| o.skipped.len()).sum()
    }

    /// Names created for one kind, in completion order.
    pub fn created(&self, kind: ObjectKind) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.kind == kind)
            .flat_map(|o| o.created.iter().cloned())
            .collect()
    }

    pub fn skipped(&self, kind: ObjectKind) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.kind == kind)
            .flat_map(|o| o.skipped.iter().cloned())
            .collect()
    }
}

/// Reports of a whole batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub documents: Vec<DocumentReport>,
}

impl BatchReport {
    pub fn created_total(&self) -> usize {
        self.documents.iter().map(DocumentReport::created_total).sum()
    }

    pub fn skipped_total(&self) -> usize {
        self.documents.iter().map(DocumentReport::skipped_total).sum()
    }

    pub fn created(&self, kind: ObjectKind) -> Vec<String> {
        self.documents.iter().flat_map(|d| d.created(kind)).collect()
    }

    pub fn skipped(&self, kind: ObjectKind) -> Vec<String> {
        self.documents.iter().flat_map(|d| d.skipped(kind)).collect()
    }
}
