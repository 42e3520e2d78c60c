//! strata-core: Schema document model and validators for strata.
//!
//! This crate provides the foundational types shared by the server client and
//! the reconciliation engine:
//! - The parsed schema document (classes, edges, indexes, clusters, functions,
//!   sequences, schedules, database descriptor)
//! - Normalized definition records produced by validation
//! - Per-kind validators and the validation error type

pub mod document;
pub mod error;
pub mod types;
pub mod validate;

pub use document::{ClassSpec, DatabaseSpec, EdgeEntry, Entry, IndexCandidate, SchemaDocument};
pub use error::ValidationError;
pub use types::{
    ClassDef, ClusterDef, ClusterRef, FunctionDef, FunctionLanguage, IndexDef, IndexType,
    ObjectKind, PropertyDef, PropertyType, ScheduleDef, SequenceDef, SequenceType, StartTime,
};
