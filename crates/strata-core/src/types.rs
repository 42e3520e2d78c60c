//! Normalized schema object definitions.
//!
//! Every schema fragment, whether written in shorthand or as a full
//! descriptor, is resolved into one of these records before any statement is
//! built from it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Object Kinds ──────────────────────────────────────────────────

/// The kinds of schema objects the reconciler manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Database,
    Sequence,
    Function,
    Schedule,
    Cluster,
    Class,
    SuperClass,
    Property,
    Edge,
    EdgeProperty,
    Index,
}

impl ObjectKind {
    /// Lowercase singular label used in messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Sequence => "sequence",
            Self::Function => "function",
            Self::Schedule => "schedule",
            Self::Cluster => "cluster",
            Self::Class => "class",
            Self::SuperClass => "super class",
            Self::Property => "class property",
            Self::Edge => "edge",
            Self::EdgeProperty => "edge property",
            Self::Index => "index",
        }
    }

    /// Lowercase plural label used in aggregate messages.
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Database => "databases",
            Self::Sequence => "sequences",
            Self::Function => "functions",
            Self::Schedule => "schedules",
            Self::Cluster => "clusters",
            Self::Class => "classes",
            Self::SuperClass => "super classes",
            Self::Property => "class properties",
            Self::Edge => "edges",
            Self::EdgeProperty => "edge properties",
            Self::Index => "indexes",
        }
    }

    /// PascalCase tag used in bracketed diagnostics, e.g. `[ClassIgnored]`.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Database => "Database",
            Self::Sequence => "Sequence",
            Self::Function => "Function",
            Self::Schedule => "Schedule",
            Self::Cluster => "Cluster",
            Self::Class => "Class",
            Self::SuperClass => "SuperClass",
            Self::Property => "ClassProperty",
            Self::Edge => "Edge",
            Self::EdgeProperty => "EdgeProperty",
            Self::Index => "Index",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a keyword does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKeyword(pub String);

impl fmt::Display for UnknownKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown keyword \"{}\"", self.0)
    }
}

impl std::error::Error for UnknownKeyword {}

// ── Property Types ────────────────────────────────────────────────

/// Server-side property types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Boolean,
    Integer,
    Short,
    Long,
    Float,
    Double,
    Decimal,
    Byte,
    String,
    Binary,
    Date,
    Datetime,
    Embedded,
    EmbeddedList,
    EmbeddedSet,
    EmbeddedMap,
    Link,
    LinkList,
    LinkSet,
    LinkMap,
    LinkBag,
    Transient,
    Custom,
    Any,
}

impl PropertyType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::Integer => "INTEGER",
            Self::Short => "SHORT",
            Self::Long => "LONG",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Decimal => "DECIMAL",
            Self::Byte => "BYTE",
            Self::String => "STRING",
            Self::Binary => "BINARY",
            Self::Date => "DATE",
            Self::Datetime => "DATETIME",
            Self::Embedded => "EMBEDDED",
            Self::EmbeddedList => "EMBEDDEDLIST",
            Self::EmbeddedSet => "EMBEDDEDSET",
            Self::EmbeddedMap => "EMBEDDEDMAP",
            Self::Link => "LINK",
            Self::LinkList => "LINKLIST",
            Self::LinkSet => "LINKSET",
            Self::LinkMap => "LINKMAP",
            Self::LinkBag => "LINKBAG",
            Self::Transient => "TRANSIENT",
            Self::Custom => "CUSTOM",
            Self::Any => "ANY",
        }
    }

    /// Whether the type may reference a linked class.
    pub fn is_link(&self) -> bool {
        matches!(
            self,
            Self::Link | Self::LinkList | Self::LinkSet | Self::LinkMap | Self::LinkBag
        )
    }
}

impl FromStr for PropertyType {
    type Err = UnknownKeyword;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.to_ascii_uppercase().as_str() {
            "BOOLEAN" => Self::Boolean,
            "INTEGER" => Self::Integer,
            "SHORT" => Self::Short,
            "LONG" => Self::Long,
            "FLOAT" => Self::Float,
            "DOUBLE" => Self::Double,
            "DECIMAL" => Self::Decimal,
            "BYTE" => Self::Byte,
            "STRING" => Self::String,
            "BINARY" => Self::Binary,
            "DATE" => Self::Date,
            "DATETIME" => Self::Datetime,
            "EMBEDDED" => Self::Embedded,
            "EMBEDDEDLIST" => Self::EmbeddedList,
            "EMBEDDEDSET" => Self::EmbeddedSet,
            "EMBEDDEDMAP" => Self::EmbeddedMap,
            "LINK" => Self::Link,
            "LINKLIST" => Self::LinkList,
            "LINKSET" => Self::LinkSet,
            "LINKMAP" => Self::LinkMap,
            "LINKBAG" => Self::LinkBag,
            "TRANSIENT" => Self::Transient,
            "CUSTOM" => Self::Custom,
            "ANY" => Self::Any,
            _ => return Err(UnknownKeyword(s.to_string())),
        };
        Ok(parsed)
    }
}

// ── Index Types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    Unique,
    NotUnique,
    Fulltext,
    Dictionary,
    UniqueHash,
    NotUniqueHash,
    FulltextHash,
    DictionaryHash,
    Spatial,
}

impl IndexType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Unique => "UNIQUE",
            Self::NotUnique => "NOTUNIQUE",
            Self::Fulltext => "FULLTEXT",
            Self::Dictionary => "DICTIONARY",
            Self::UniqueHash => "UNIQUE_HASH_INDEX",
            Self::NotUniqueHash => "NOTUNIQUE_HASH_INDEX",
            Self::FulltextHash => "FULLTEXT_HASH_INDEX",
            Self::DictionaryHash => "DICTIONARY_HASH_INDEX",
            Self::Spatial => "SPATIAL",
        }
    }
}

impl FromStr for IndexType {
    type Err = UnknownKeyword;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.to_ascii_uppercase().as_str() {
            "UNIQUE" => Self::Unique,
            "NOTUNIQUE" => Self::NotUnique,
            "FULLTEXT" => Self::Fulltext,
            "DICTIONARY" => Self::Dictionary,
            "UNIQUE_HASH_INDEX" => Self::UniqueHash,
            "NOTUNIQUE_HASH_INDEX" => Self::NotUniqueHash,
            "FULLTEXT_HASH_INDEX" => Self::FulltextHash,
            "DICTIONARY_HASH_INDEX" => Self::DictionaryHash,
            "SPATIAL" => Self::Spatial,
            _ => return Err(UnknownKeyword(s.to_string())),
        };
        Ok(parsed)
    }
}

// ── Functions & Sequences ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionLanguage {
    Sql,
    /// Server-side scripting (JavaScript).
    Scripting,
}

impl FunctionLanguage {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Sql => "SQL",
            Self::Scripting => "JAVASCRIPT",
        }
    }
}

impl FromStr for FunctionLanguage {
    type Err = UnknownKeyword;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sql" => Ok(Self::Sql),
            "scripting" | "javascript" => Ok(Self::Scripting),
            _ => Err(UnknownKeyword(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceType {
    Ordered,
    Cached,
}

impl SequenceType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Ordered => "ORDERED",
            Self::Cached => "CACHED",
        }
    }
}

impl FromStr for SequenceType {
    type Err = UnknownKeyword;

    // Exact lowercase keywords only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ordered" => Ok(Self::Ordered),
            "cached" => Ok(Self::Cached),
            _ => Err(UnknownKeyword(s.to_string())),
        }
    }
}

// ── Definitions ───────────────────────────────────────────────────

/// Cluster assignment for a class: numeric id or cluster name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClusterRef {
    Id(u32),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    pub super_class: Option<String>,
    pub cluster: Option<ClusterRef>,
    pub is_abstract: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    pub name: String,
    pub property_type: PropertyType,
    pub linked_class: Option<String>,
    pub linked_type: Option<PropertyType>,
    pub mandatory: Option<bool>,
    pub not_null: Option<bool>,
    pub readonly: Option<bool>,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub regexp: Option<String>,
    pub default: Option<Value>,
    pub collate: Option<String>,
}

impl PropertyDef {
    /// A plain property of the given type with no constraints.
    pub fn simple(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            linked_class: None,
            linked_type: None,
            mandatory: None,
            not_null: None,
            readonly: None,
            min: None,
            max: None,
            regexp: None,
            default: None,
            collate: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDef {
    pub name: String,
    pub class: String,
    pub properties: Vec<String>,
    pub index_type: IndexType,
    pub engine: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterDef {
    pub name: String,
    pub id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    pub code: String,
    pub parameters: Vec<String>,
    pub idempotent: Option<bool>,
    pub language: Option<FunctionLanguage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceDef {
    pub name: String,
    pub sequence_type: SequenceType,
    pub start: Option<u64>,
    pub increment: Option<u64>,
    pub cache: Option<u64>,
}

/// When a scheduled job first fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartTime {
    /// A server-parsable datetime string, passed through unchanged.
    Text(String),
    /// An instant given as milliseconds since the Unix epoch.
    At(DateTime<Utc>),
}

impl StartTime {
    /// Render as the `yyyy-MM-dd HH:mm:ss` form the server parses.
    pub fn to_server_string(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::At(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleDef {
    pub name: String,
    pub function: String,
    pub rule: String,
    pub arguments: Option<Map<String, Value>>,
    pub start_time: Option<StartTime>,
}
