use thiserror::Error;

use crate::types::ObjectKind;

/// A schema fragment failed validation.
///
/// Carries the object kind, the effective object name and the offending
/// field. The document path is attached by the caller, which knows where the
/// fragment came from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} \"{name}\": {message}")]
pub struct ValidationError {
    pub kind: ObjectKind,
    pub name: String,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(
        kind: ObjectKind,
        name: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ValidationError>;
