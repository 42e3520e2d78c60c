//! The parsed schema document.
//!
//! A document is the root unit read from a schema file. Kinds that accept a
//! terse scalar shorthand keep their raw form as an [`Entry`] until the
//! validator resolves them into a normalized definition.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::types::{ClassDef, ClusterRef};

/// Base class every edge class extends unless told otherwise.
pub const BASE_EDGE_CLASS: &str = "E";

/// One schema document, annotated with the file it was read from.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    #[serde(skip)]
    pub source: PathBuf,

    #[serde(default)]
    pub db: Option<DatabaseSpec>,

    #[serde(default, deserialize_with = "nullable_map")]
    pub class: IndexMap<String, ClassSpec>,

    #[serde(default, deserialize_with = "nullable_map")]
    pub edge: IndexMap<String, EdgeEntry>,

    #[serde(default, deserialize_with = "nullable_map")]
    pub index: IndexMap<String, Entry>,

    #[serde(default, deserialize_with = "nullable_map")]
    pub cluster: IndexMap<String, Entry>,

    #[serde(default, deserialize_with = "nullable_map")]
    pub function: IndexMap<String, Entry>,

    #[serde(default, deserialize_with = "nullable_map")]
    pub sequence: IndexMap<String, Entry>,

    #[serde(default, deserialize_with = "nullable_map")]
    pub schedule: IndexMap<String, Entry>,
}

impl SchemaDocument {
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = source.into();
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Name of the database this document declares, if any.
    pub fn database_name(&self) -> Option<&str> {
        self.db.as_ref().and_then(|db| db.name.as_deref())
    }

    /// Expand edge entries into class specs rooted at the base edge class.
    pub fn edge_classes(&self) -> IndexMap<String, ClassSpec> {
        self.edge
            .iter()
            .map(|(key, entry)| (key.clone(), entry.to_class_spec()))
            .collect()
    }

    /// Every index declared by the document, global entries first, then the
    /// entries nested under each class.
    pub fn index_candidates(&self) -> Vec<IndexCandidate<'_>> {
        let global = self.index.iter().map(|(key, entry)| IndexCandidate {
            key,
            owner: None,
            entry,
        });

        let inline = self.class.iter().flat_map(|(class_key, class)| {
            let owner = class.effective_name(class_key);
            class.index.iter().map(move |(key, entry)| IndexCandidate {
                key,
                owner: Some(owner),
                entry,
            })
        });

        global.chain(inline).collect()
    }
}

// ── Database ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    #[default]
    Plocal,
    Memory,
}

impl Storage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plocal => "plocal",
            Self::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[default]
    Graph,
    Document,
}

impl DatabaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Graph => "graph",
            Self::Document => "document",
        }
    }
}

/// Target database descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub storage: Storage,
    #[serde(rename = "type", default)]
    pub database_type: DatabaseType,
    /// Enable lightweight edges right after the database is created.
    #[serde(default)]
    pub lightweight_edges: bool,
}

// ── Shorthand Entries ─────────────────────────────────────────────

/// A schema entry written either as a scalar shorthand or a full descriptor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    Full(Map<String, Value>),
    Shorthand(Value),
}

impl Default for Entry {
    fn default() -> Self {
        Self::Shorthand(Value::Null)
    }
}

impl Entry {
    /// The `name` field if it is a string, otherwise the map key.
    pub fn effective_name<'a>(&'a self, key: &'a str) -> &'a str {
        match self {
            Self::Full(map) => map.get("name").and_then(Value::as_str).unwrap_or(key),
            Self::Shorthand(_) => key,
        }
    }

    /// Expand to a descriptor map. A shorthand value becomes the sole
    /// `field`; a null shorthand becomes an empty descriptor.
    pub fn descriptor(&self, field: &str) -> Map<String, Value> {
        match self {
            Self::Full(map) => map.clone(),
            Self::Shorthand(Value::Null) => Map::new(),
            Self::Shorthand(value) => {
                let mut map = Map::new();
                map.insert(field.to_string(), value.clone());
                map
            }
        }
    }
}

// ── Classes ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClassSpec {
    pub name: Option<String>,
    #[serde(alias = "parent")]
    pub super_class: Option<String>,
    pub cluster: Option<ClusterRef>,
    #[serde(rename = "abstract", default)]
    pub is_abstract: bool,
    #[serde(default, deserialize_with = "nullable_map")]
    pub props: IndexMap<String, Entry>,
    #[serde(default, deserialize_with = "nullable_map")]
    pub index: IndexMap<String, Entry>,
}

impl ClassSpec {
    pub fn effective_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(key)
    }

    pub fn to_def(&self, key: &str) -> ClassDef {
        ClassDef {
            name: self.effective_name(key).to_string(),
            super_class: self.super_class.clone(),
            cluster: self.cluster.clone(),
            is_abstract: self.is_abstract,
        }
    }
}

/// An edge entry: a bare superclass name or a full class spec.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EdgeEntry {
    SuperClass(String),
    Class(ClassSpec),
}

impl Default for EdgeEntry {
    fn default() -> Self {
        Self::Class(ClassSpec::default())
    }
}

impl EdgeEntry {
    pub fn to_class_spec(&self) -> ClassSpec {
        let mut spec = match self {
            Self::SuperClass(parent) => ClassSpec {
                super_class: Some(parent.clone()),
                ..ClassSpec::default()
            },
            Self::Class(spec) => spec.clone(),
        };
        if spec.super_class.is_none() {
            spec.super_class = Some(BASE_EDGE_CLASS.to_string());
        }
        spec
    }
}

// ── Indexes ───────────────────────────────────────────────────────

/// An index entry together with where it was declared.
#[derive(Debug, Clone, Copy)]
pub struct IndexCandidate<'a> {
    pub key: &'a str,
    /// Owning class name for entries nested under a class.
    pub owner: Option<&'a str>,
    pub entry: &'a Entry,
}

impl IndexCandidate<'_> {
    /// Effective index name: the explicit `name`, else the key, qualified
    /// with the owning class when the key names a bare property.
    pub fn name(&self) -> String {
        if let Entry::Full(map) = self.entry {
            if let Some(name) = map.get("name").and_then(Value::as_str) {
                return name.to_string();
            }
        }
        match self.owner {
            Some(owner) if !self.key.contains('.') => format!("{owner}.{}", self.key),
            _ => self.key.to_string(),
        }
    }
}

/// Deserialize a map whose values may be written as null, e.g. a bare
/// `Person:` line in YAML.
fn nullable_map<'de, D, T>(deserializer: D) -> Result<IndexMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let raw: Option<IndexMap<String, Option<T>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, value.unwrap_or_default()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> SchemaDocument {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_parse_full_document() {
        let doc = parse(
            r#"
db:
  name: demo
  lightweightEdges: true
class:
  Person:
    props:
      name: string
  Employee:
    parent: Person
    abstract: true
edge:
  Knows: E
cluster:
  archive: 12
sequence:
  idseq: ordered
"#,
        );

        assert_eq!(doc.database_name(), Some("demo"));
        assert!(doc.db.as_ref().unwrap().lightweight_edges);
        assert_eq!(doc.class.len(), 2);
        assert_eq!(doc.class["Employee"].super_class.as_deref(), Some("Person"));
        assert!(doc.class["Employee"].is_abstract);
        assert_eq!(doc.edge["Knows"], EdgeEntry::SuperClass("E".to_string()));
        assert_eq!(doc.cluster["archive"], Entry::Shorthand(Value::from(12)));
    }

    #[test]
    fn test_null_class_entry_is_default() {
        let doc = parse("class:\n  Person:\n");
        assert_eq!(doc.class["Person"], ClassSpec::default());
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        let result: Result<SchemaDocument, _> = serde_yaml::from_str("tables: {}");
        assert!(result.is_err());
    }

    #[test]
    fn test_edge_shorthand_matches_full_form() {
        let short = EdgeEntry::SuperClass("E".to_string()).to_class_spec();
        let full = EdgeEntry::Class(ClassSpec {
            super_class: Some("E".to_string()),
            ..ClassSpec::default()
        })
        .to_class_spec();
        assert_eq!(short, full);
    }

    #[test]
    fn test_edge_defaults_to_base_edge_class() {
        let doc = parse("edge:\n  Likes:\n  Follows:\n    props:\n      since: date\n");
        let edges = doc.edge_classes();
        assert_eq!(edges["Likes"].super_class.as_deref(), Some("E"));
        assert_eq!(edges["Follows"].super_class.as_deref(), Some("E"));
        assert_eq!(edges["Follows"].props.len(), 1);
    }

    #[test]
    fn test_entry_descriptor() {
        let short = Entry::Shorthand(Value::from("ordered"));
        let map = short.descriptor("type");
        assert_eq!(map.get("type"), Some(&Value::from("ordered")));
        assert!(Entry::Shorthand(Value::Null).descriptor("type").is_empty());
    }

    #[test]
    fn test_index_candidates_merge_global_and_inline() {
        let doc = parse(
            r#"
class:
  Person:
    name: Human
    index:
      email: unique
index:
  Person.name: notunique
"#,
        );
        let names: Vec<String> = doc.index_candidates().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Person.name", "Human.email"]);
    }
}
