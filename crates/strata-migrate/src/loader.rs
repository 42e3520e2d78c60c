//! Schema file loading.
//!
//! A glob pattern is expanded, matches are sorted, and every file is parsed
//! into one or more [`SchemaDocument`]s annotated with the path they came
//! from. The result is one flat, ordered list.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use strata_core::SchemaDocument;

use crate::error::{MigrateError, Result};

/// Load every schema document matched by `pattern`.
pub fn load(pattern: &str) -> Result<Vec<SchemaDocument>> {
    let mut paths = glob::glob(pattern)?
        .map(|entry| entry.map_err(|e| MigrateError::Io(e.into_error())))
        .collect::<Result<Vec<PathBuf>>>()?;
    paths.retain(|p| p.is_file());
    paths.sort();

    if paths.is_empty() {
        return Err(MigrateError::SchemaNotFound {
            pattern: pattern.to_string(),
        });
    }

    let mut documents = Vec::new();
    for path in &paths {
        let loaded = load_file(path)?;
        tracing::debug!(path = %path.display(), documents = loaded.len(), "Loaded schema file");
        documents.extend(loaded);
    }
    Ok(documents)
}

/// Parse one schema file according to its extension.
pub fn load_file(path: &Path) -> Result<Vec<SchemaDocument>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let documents = match extension.as_deref() {
        Some("json") => parse_json(path, &std::fs::read_to_string(path)?)?,
        Some("yml") | Some("yaml") => parse_yaml(path, &std::fs::read_to_string(path)?)?,
        _ => {
            return Err(MigrateError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };

    Ok(documents
        .into_iter()
        .map(|doc| doc.with_source(path))
        .collect())
}

fn parse_error(path: &Path, message: impl ToString) -> MigrateError {
    MigrateError::Parse {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// A JSON file holds one document or an array of documents.
fn parse_json(path: &Path, text: &str) -> Result<Vec<SchemaDocument>> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| parse_error(path, e))?;
    let values = match value {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };
    values
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(|e| parse_error(path, e)))
        .collect()
}

/// A YAML file holds one or more `---` separated documents. Empty documents
/// are skipped.
fn parse_yaml(path: &Path, text: &str) -> Result<Vec<SchemaDocument>> {
    let mut documents = Vec::new();
    for de in serde_yaml::Deserializer::from_str(text) {
        let doc = Option::<SchemaDocument>::deserialize(de).map_err(|e| parse_error(path, e))?;
        documents.extend(doc);
    }
    Ok(documents)
}
