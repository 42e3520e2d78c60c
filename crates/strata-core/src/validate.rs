//! Per-kind validators.
//!
//! Each validator takes the map key and the raw entry, resolves the shorthand
//! form into a descriptor and returns a normalized definition. Validation
//! fails closed: any field the kind does not know is rejected.

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};

use crate::document::{Entry, IndexCandidate};
use crate::error::{Result, ValidationError};
use crate::types::{
    ClusterDef, FunctionDef, FunctionLanguage, IndexDef, IndexType, ObjectKind, PropertyDef,
    PropertyType, ScheduleDef, SequenceDef, SequenceType, StartTime,
};

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\w+$").expect("valid pattern"))
}

fn cluster_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\w-]+$").expect("valid pattern"))
}

/// Descriptor fields being consumed for one object.
struct Fields {
    kind: ObjectKind,
    name: String,
    map: Map<String, Value>,
}

impl Fields {
    fn new(kind: ObjectKind, default_name: &str, mut map: Map<String, Value>) -> Result<Self> {
        let name = match map.remove("name") {
            None | Some(Value::Null) => default_name.to_string(),
            Some(Value::String(name)) => name,
            Some(_) => {
                return Err(ValidationError::new(
                    kind,
                    default_name,
                    "name",
                    "name must be a string",
                ))
            }
        };
        Ok(Self { kind, name, map })
    }

    fn error(&self, field: &str, message: impl Into<String>) -> ValidationError {
        ValidationError::new(self.kind, &self.name, field, message)
    }

    fn check_name(&self, pattern: &Regex, allowed: &str) -> Result<String> {
        if pattern.is_match(&self.name) {
            Ok(self.name.clone())
        } else {
            Err(self.error(
                "name",
                format!(
                    "{} name must only include {allowed}: \"{}\"",
                    self.kind.tag(),
                    self.name
                ),
            ))
        }
    }

    fn take(&mut self, field: &str) -> Option<Value> {
        match self.map.remove(field) {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    fn string(&mut self, field: &str) -> Result<Option<String>> {
        match self.take(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(self.error(field, format!("{field} must be a string"))),
        }
    }

    fn required_string(&mut self, field: &str) -> Result<String> {
        match self.string(field)? {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(self.error(field, format!("{field} is a required field"))),
        }
    }

    fn boolean(&mut self, field: &str) -> Result<Option<bool>> {
        match self.take(field) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(_) => Err(self.error(field, format!("{field} must be a boolean"))),
        }
    }

    fn positive_int(&mut self, field: &str) -> Result<Option<u64>> {
        let value = match self.take(field) {
            None => return Ok(None),
            Some(value) => value,
        };
        let parsed = match &value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        match parsed {
            Some(n) if n > 0 => Ok(Some(n)),
            _ => Err(self.error(field, format!("{field} must be a positive integer"))),
        }
    }

    fn keyword<T: FromStr>(&mut self, field: &str, allowed: &str) -> Result<Option<T>> {
        match self.string(field)? {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
                self.error(
                    field,
                    format!("{field} must be one of the following values: {allowed}"),
                )
            }),
        }
    }

    fn object(&mut self, field: &str) -> Result<Option<Map<String, Value>>> {
        match self.take(field) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(_) => Err(self.error(field, format!("{field} must be an object"))),
        }
    }

    fn scalar(&mut self, field: &str) -> Result<Option<Value>> {
        match self.take(field) {
            None => Ok(None),
            Some(v @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => Ok(Some(v)),
            Some(_) => Err(self.error(field, format!("{field} must be a scalar value"))),
        }
    }

    fn string_list(&mut self, field: &str) -> Result<Option<Vec<String>>> {
        match self.take(field) {
            None => Ok(None),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    _ => Err(self.error(field, format!("{field} must only contain strings"))),
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(_) => Err(self.error(field, format!("{field} must be an array of strings"))),
        }
    }

    /// Reject whatever fields are left over.
    fn finish(self) -> Result<()> {
        match self.map.keys().next() {
            None => Ok(()),
            Some(field) => Err(ValidationError::new(
                self.kind,
                &self.name,
                field.as_str(),
                format!("field \"{field}\" is not allowed"),
            )),
        }
    }
}

/// Validate a cluster entry. Shorthand value is the cluster id.
pub fn cluster(key: &str, entry: &Entry) -> Result<ClusterDef> {
    let mut fields = Fields::new(ObjectKind::Cluster, key, entry.descriptor("id"))?;
    let name = fields.check_name(
        cluster_pattern(),
        "alphanumeric characters, underscores and dashes",
    )?;
    let id = match fields.positive_int("id")? {
        None => None,
        Some(id) => Some(
            u32::try_from(id).map_err(|_| fields.error("id", "id is out of range"))?,
        ),
    };
    fields.finish()?;

    Ok(ClusterDef { name, id })
}

/// Validate a function entry. Shorthand value is the function code.
pub fn function(key: &str, entry: &Entry) -> Result<FunctionDef> {
    let mut fields = Fields::new(ObjectKind::Function, key, entry.descriptor("code"))?;
    let name = fields.check_name(word_pattern(), "alphanumeric characters and underscores")?;
    let code = fields.required_string("code")?;
    let parameters = fields.string_list("parameters")?.unwrap_or_default();
    let idempotent = fields.boolean("idempotent")?;
    let language = fields.keyword::<FunctionLanguage>("language", "sql, scripting")?;
    fields.finish()?;

    Ok(FunctionDef {
        name,
        code,
        parameters,
        idempotent,
        language,
    })
}

/// Validate a sequence entry. Shorthand value is the sequence type.
pub fn sequence(key: &str, entry: &Entry) -> Result<SequenceDef> {
    let mut fields = Fields::new(ObjectKind::Sequence, key, entry.descriptor("type"))?;
    let name = fields.check_name(word_pattern(), "alphanumeric characters and underscores")?;
    let sequence_type = fields
        .keyword::<SequenceType>("type", "ordered, cached")?
        .ok_or_else(|| fields.error("type", "type is a required field"))?;
    let start = fields.positive_int("start")?;
    let increment = fields.positive_int("incr")?;
    let cache = fields.positive_int("cache")?;
    fields.finish()?;

    Ok(SequenceDef {
        name,
        sequence_type,
        start,
        increment,
        cache,
    })
}

/// Validate a schedule entry. Schedules have no shorthand form.
pub fn schedule(key: &str, entry: &Entry) -> Result<ScheduleDef> {
    let map = match entry {
        Entry::Full(map) => map.clone(),
        Entry::Shorthand(_) => {
            return Err(ValidationError::new(
                ObjectKind::Schedule,
                key,
                "",
                "schedule must be an object",
            ))
        }
    };
    let mut fields = Fields::new(ObjectKind::Schedule, key, map)?;
    let name = fields.check_name(word_pattern(), "alphanumeric characters and underscores")?;
    let function = fields.required_string("function")?;
    let rule = fields.required_string("rule")?;
    let arguments = fields.object("arguments")?;

    let camel = fields.take("startTime");
    let lower = fields.take("starttime");
    let start_time = match (camel, lower) {
        (Some(_), Some(_)) => {
            return Err(fields.error("startTime", "startTime is given twice"));
        }
        (Some(v), None) | (None, Some(v)) => Some(start_time(&fields, v)?),
        (None, None) => None,
    };
    fields.finish()?;

    Ok(ScheduleDef {
        name,
        function,
        rule,
        arguments,
        start_time,
    })
}

fn start_time(fields: &Fields, value: Value) -> Result<StartTime> {
    match value {
        Value::String(s) => Ok(StartTime::Text(s)),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(StartTime::At)
            .ok_or_else(|| {
                fields.error("startTime", format!("startTime {n} is not a valid timestamp"))
            }),
        _ => Err(fields.error("startTime", "startTime must be string or number")),
    }
}

/// Validate a class property. Shorthand value is the property type.
pub fn property(key: &str, entry: &Entry) -> Result<PropertyDef> {
    const TYPES: &str = "a property type such as string, integer, link";

    let mut fields = Fields::new(ObjectKind::Property, key, entry.descriptor("type"))?;
    let name = fields.name.clone();
    let property_type = fields
        .keyword::<PropertyType>("type", TYPES)?
        .ok_or_else(|| fields.error("type", "type is a required field"))?;
    let linked_class = fields.string("linkedClass")?;
    let linked_type = fields.keyword::<PropertyType>("linkedType", TYPES)?;
    if linked_class.is_some() && !property_type.is_link() {
        return Err(fields.error(
            "linkedClass",
            format!("linkedClass requires a link type, got {}", property_type.as_sql()),
        ));
    }
    let mandatory = fields.boolean("mandatory")?;
    let not_null = fields.boolean("notNull")?;
    let readonly = fields.boolean("readonly")?;
    let min = fields.scalar("min")?;
    let max = fields.scalar("max")?;
    let regexp = fields.string("regexp")?;
    let default = fields.scalar("default")?;
    let collate = fields.string("collate")?;
    fields.finish()?;

    Ok(PropertyDef {
        name,
        property_type,
        linked_class,
        linked_type,
        mandatory,
        not_null,
        readonly,
        min,
        max,
        regexp,
        default,
        collate,
    })
}

/// Validate an index candidate. Shorthand value is the index type; class and
/// properties default to the `Class.property` split of the key.
pub fn index(candidate: &IndexCandidate<'_>) -> Result<IndexDef> {
    let mut fields = Fields::new(
        ObjectKind::Index,
        &candidate.name(),
        candidate.entry.descriptor("type"),
    )?;
    let name = fields.name.clone();

    let (key_class, key_property) = match candidate.key.split_once('.') {
        Some((class, property)) => (Some(class), Some(property)),
        None if candidate.owner.is_some() => (None, Some(candidate.key)),
        None => (None, None),
    };

    let class = match fields.string("class")? {
        Some(class) => class,
        None => candidate
            .owner
            .or(key_class)
            .map(str::to_string)
            .ok_or_else(|| fields.error("class", "class is a required field"))?,
    };

    let properties = match fields.take("properties") {
        None => key_property
            .map(|p| vec![p.to_string()])
            .ok_or_else(|| fields.error("properties", "properties is a required field"))?,
        Some(Value::String(list)) => list
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(fields.error("properties", "properties must only contain strings")),
            })
            .collect::<Result<Vec<_>>>()?,
        Some(_) => {
            return Err(fields.error("properties", "properties must be a string or an array"))
        }
    };
    if properties.is_empty() {
        return Err(fields.error("properties", "properties must not be empty"));
    }

    let index_type = fields
        .keyword::<IndexType>("type", "unique, notunique, fulltext, dictionary, *_hash_index, spatial")?
        .ok_or_else(|| fields.error("type", "type is a required field"))?;
    let engine = fields.string("engine")?;
    if engine.as_deref().is_some_and(|e| !word_pattern().is_match(e)) {
        return Err(fields.error("engine", "engine must be a single word such as lucene"));
    }
    let metadata = fields.object("metadata")?;
    fields.finish()?;

    Ok(IndexDef {
        name,
        class,
        properties,
        index_type,
        engine,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn full(value: Value) -> Entry {
        match value {
            Value::Object(map) => Entry::Full(map),
            other => panic!("not an object: {other}"),
        }
    }

    fn short(value: Value) -> Entry {
        Entry::Shorthand(value)
    }

    #[test]
    fn test_cluster_shorthand_matches_full() {
        let a = cluster("archive", &short(json!(12))).unwrap();
        let b = cluster("archive", &full(json!({"id": 12}))).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.id, Some(12));
    }

    #[test]
    fn test_cluster_without_id() {
        let c = cluster("archive", &Entry::default()).unwrap();
        assert_eq!(c, ClusterDef { name: "archive".into(), id: None });
    }

    #[test]
    fn test_cluster_rejects_bad_name() {
        let err = cluster("bad name!", &short(json!(3))).unwrap_err();
        assert_eq!(err.field, "name");
        assert_eq!(err.kind, ObjectKind::Cluster);
        assert!(err.message.contains("bad name!"));
    }

    #[test]
    fn test_cluster_accepts_dashes() {
        assert!(cluster("hot-data", &Entry::default()).is_ok());
    }

    #[test]
    fn test_cluster_rejects_non_positive_id() {
        let err = cluster("c", &full(json!({"id": -1}))).unwrap_err();
        assert_eq!(err.field, "id");
        let err = cluster("c", &full(json!({"id": 0}))).unwrap_err();
        assert_eq!(err.field, "id");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = cluster("c", &full(json!({"id": 1, "size": 4}))).unwrap_err();
        assert_eq!(err.field, "size");
    }

    #[test]
    fn test_function_shorthand_matches_full() {
        let a = function("hello", &short(json!("return 1"))).unwrap();
        let b = function("hello", &full(json!({"code": "return 1"}))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_function_full_descriptor() {
        let f = function(
            "sum",
            &full(json!({
                "code": "return a + b",
                "parameters": ["a", "b"],
                "idempotent": true,
                "language": "scripting"
            })),
        )
        .unwrap();
        assert_eq!(f.parameters, vec!["a", "b"]);
        assert_eq!(f.idempotent, Some(true));
        assert_eq!(f.language, Some(FunctionLanguage::Scripting));
    }

    #[test]
    fn test_function_rejects_unknown_language() {
        let err = function("f", &full(json!({"code": "x", "language": "python"}))).unwrap_err();
        assert_eq!(err.field, "language");
    }

    #[test]
    fn test_function_requires_code() {
        let err = function("f", &full(json!({"idempotent": false}))).unwrap_err();
        assert_eq!(err.field, "code");
        let err = function("f", &short(json!(""))).unwrap_err();
        assert_eq!(err.field, "code");
    }

    #[test]
    fn test_function_name_pattern() {
        let err = function("my-func", &short(json!("x"))).unwrap_err();
        assert_eq!(err.field, "name");
    }

    #[test]
    fn test_sequence_shorthand_matches_full() {
        let a = sequence("idseq", &short(json!("cached"))).unwrap();
        let b = sequence("idseq", &full(json!({"type": "cached"}))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sequence_rejects_invalid_type() {
        let err = sequence("s", &full(json!({"type": "invalid"}))).unwrap_err();
        assert_eq!(err.field, "type");
        let err = sequence("s", &full(json!({"start": 1}))).unwrap_err();
        assert_eq!(err.field, "type");
    }

    #[test]
    fn test_sequence_numbers() {
        let s = sequence(
            "s",
            &full(json!({"type": "ordered", "start": 10, "incr": 2, "cache": 50})),
        )
        .unwrap();
        assert_eq!(s.start, Some(10));
        assert_eq!(s.increment, Some(2));
        assert_eq!(s.cache, Some(50));

        let err = sequence("s", &full(json!({"type": "ordered", "incr": 1.5}))).unwrap_err();
        assert_eq!(err.field, "incr");
    }

    #[test]
    fn test_schedule_requires_rule() {
        let err = schedule("nightly", &full(json!({"function": "cleanup"}))).unwrap_err();
        assert_eq!(err.field, "rule");
    }

    #[test]
    fn test_schedule_start_time_forms() {
        let s = schedule(
            "nightly",
            &full(json!({
                "function": "cleanup",
                "rule": "0 0 3 * * ?",
                "arguments": {"days": 7},
                "startTime": 0
            })),
        )
        .unwrap();
        assert_eq!(s.start_time, Some(StartTime::At(DateTime::UNIX_EPOCH)));
        assert_eq!(s.arguments.unwrap()["days"], json!(7));

        let s = schedule(
            "nightly",
            &full(json!({"function": "f", "rule": "r", "starttime": "2024-01-01 00:00:00"})),
        )
        .unwrap();
        assert_eq!(s.start_time, Some(StartTime::Text("2024-01-01 00:00:00".into())));

        let err = schedule(
            "nightly",
            &full(json!({"function": "f", "rule": "r", "startTime": true})),
        )
        .unwrap_err();
        assert_eq!(err.field, "startTime");
    }

    #[test]
    fn test_schedule_start_time_out_of_range() {
        let err = schedule(
            "nightly",
            &full(json!({"function": "f", "rule": "r", "startTime": 9_000_000_000_000_000_000i64})),
        )
        .unwrap_err();
        assert_eq!(err.field, "startTime");
        assert!(err.to_string().contains("not a valid timestamp"));
    }

    #[test]
    fn test_schedule_rejects_shorthand() {
        assert!(schedule("nightly", &short(json!("0 * * * * ?"))).is_err());
    }

    #[test]
    fn test_property_shorthand_and_link() {
        let p = property("name", &short(json!("string"))).unwrap();
        assert_eq!(p, PropertyDef::simple("name", PropertyType::String));

        let p = property(
            "friend",
            &full(json!({"type": "link", "linkedClass": "Person", "mandatory": true})),
        )
        .unwrap();
        assert_eq!(p.linked_class.as_deref(), Some("Person"));
        assert_eq!(p.mandatory, Some(true));

        let err = property("age", &full(json!({"type": "integer", "linkedClass": "X"})))
            .unwrap_err();
        assert_eq!(err.field, "linkedClass");
    }

    #[test]
    fn test_property_unknown_type() {
        let err = property("age", &short(json!("number"))).unwrap_err();
        assert_eq!(err.field, "type");
    }

    #[test]
    fn test_index_from_global_key() {
        let entry = short(json!("unique"));
        let candidate = IndexCandidate {
            key: "Person.name",
            owner: None,
            entry: &entry,
        };
        let idx = index(&candidate).unwrap();
        assert_eq!(idx.name, "Person.name");
        assert_eq!(idx.class, "Person");
        assert_eq!(idx.properties, vec!["name"]);
        assert_eq!(idx.index_type, IndexType::Unique);
    }

    #[test]
    fn test_index_inline_bare_property() {
        let entry = full(json!({"type": "notunique", "properties": "first, last"}));
        let candidate = IndexCandidate {
            key: "fullname",
            owner: Some("Person"),
            entry: &entry,
        };
        let idx = index(&candidate).unwrap();
        assert_eq!(idx.name, "Person.fullname");
        assert_eq!(idx.class, "Person");
        assert_eq!(idx.properties, vec!["first", "last"]);
    }

    #[test]
    fn test_index_requires_class() {
        let entry = short(json!("unique"));
        let candidate = IndexCandidate {
            key: "orphan",
            owner: None,
            entry: &entry,
        };
        assert_eq!(index(&candidate).unwrap_err().field, "class");
    }

    #[test]
    fn test_index_engine_must_be_a_word() {
        let entry = full(json!({"type": "fulltext", "engine": "lucene"}));
        let candidate = IndexCandidate {
            key: "Person.bio",
            owner: None,
            entry: &entry,
        };
        assert_eq!(index(&candidate).unwrap().engine.as_deref(), Some("lucene"));

        let entry = full(json!({"type": "fulltext", "engine": "LUCENE; DROP CLASS V"}));
        let candidate = IndexCandidate {
            key: "Person.bio",
            owner: None,
            entry: &entry,
        };
        assert_eq!(index(&candidate).unwrap_err().field, "engine");
    }
}
