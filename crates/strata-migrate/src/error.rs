//! Error types for the strata-migrate crate.

use std::path::PathBuf;

use thiserror::Error;

use strata_core::{ObjectKind, ValidationError};
use strata_graph::GraphError;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("[{}Error] {source}\n  at {}", .source.kind.tag(), .path.display())]
    Validation {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },

    #[error("[{}Error] {source}\n  at {}", .kind.tag(), .path.display())]
    Server {
        kind: ObjectKind,
        path: PathBuf,
        #[source]
        source: GraphError,
    },

    #[error("[ServerError] {0}")]
    Graph(#[from] GraphError),

    #[error("The schema file could not be found: {pattern}")]
    SchemaNotFound { pattern: String },

    #[error("Invalid schema pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("[ParseError] {message}\n  at {}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("The file format is not supported: {}", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Migration runner not found: {program}")]
    RunnerNotFound { program: String },

    #[error("Migration runner exited with code {code}: {output}")]
    Runner { code: i32, output: String },
}

impl MigrateError {
    /// Whether the error came from schema validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;
