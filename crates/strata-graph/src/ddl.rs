//! Statement builder.
//!
//! Every data-definition statement sent to the server is built here, one
//! function per object kind. Identifiers are back-quoted, literals are
//! JSON-quoted, and free-form user values travel as named parameters.

use serde_json::{Map, Value};

use strata_core::{
    ClassDef, ClusterDef, ClusterRef, FunctionDef, IndexDef, PropertyDef, ScheduleDef,
    SequenceDef,
};

use crate::server::Registry;

/// A statement with its named parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Map<String, Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Map::new(),
        }
    }

    /// Bind a named parameter referenced as `:key` in the statement.
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

/// Back-quote an identifier.
pub fn ident(name: &str) -> String {
    format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
}

/// Render a scalar as a SQL literal.
pub fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => quote(s),
        other => other.to_string(),
    }
}

/// Double-quote a string literal.
pub fn quote(s: &str) -> String {
    // JSON string escaping is accepted by the server's SQL parser.
    Value::String(s.to_string()).to_string()
}

pub fn create_class(class: &ClassDef) -> Statement {
    let mut sql = format!("CREATE CLASS {}", ident(&class.name));
    match &class.cluster {
        Some(ClusterRef::Id(id)) => sql.push_str(&format!(" CLUSTER {id}")),
        Some(ClusterRef::Name(name)) => sql.push_str(&format!(" CLUSTER {}", ident(name))),
        None => {}
    }
    if class.is_abstract {
        sql.push_str(" ABSTRACT");
    }
    Statement::new(sql)
}

pub fn alter_super_class(class: &str, super_class: &str) -> Statement {
    Statement::new(format!(
        "ALTER CLASS {} SUPERCLASS {}",
        ident(class),
        ident(super_class)
    ))
}

pub fn create_property(class: &str, property: &PropertyDef) -> Statement {
    let mut sql = format!(
        "CREATE PROPERTY {}.{} {}",
        ident(class),
        ident(&property.name),
        property.property_type.as_sql()
    );
    if let Some(linked) = &property.linked_class {
        sql.push_str(&format!(" {}", ident(linked)));
    } else if let Some(linked) = property.linked_type {
        sql.push(' ');
        sql.push_str(linked.as_sql());
    }

    let mut attributes = Vec::new();
    let flags = [
        ("MANDATORY", property.mandatory),
        ("NOTNULL", property.not_null),
        ("READONLY", property.readonly),
    ];
    for (keyword, flag) in flags {
        if let Some(flag) = flag {
            attributes.push(format!("{keyword} {}", if flag { "TRUE" } else { "FALSE" }));
        }
    }
    if let Some(min) = &property.min {
        attributes.push(format!("MIN {}", literal(min)));
    }
    if let Some(max) = &property.max {
        attributes.push(format!("MAX {}", literal(max)));
    }
    if let Some(regexp) = &property.regexp {
        attributes.push(format!("REGEXP {}", quote(regexp)));
    }
    if let Some(default) = &property.default {
        attributes.push(format!("DEFAULT {}", literal(default)));
    }
    if !attributes.is_empty() {
        sql.push_str(&format!(" ({})", attributes.join(", ")));
    }
    if let Some(collate) = &property.collate {
        sql.push_str(&format!(" COLLATE {}", ident(collate)));
    }
    Statement::new(sql)
}

pub fn create_cluster(cluster: &ClusterDef) -> Statement {
    let mut sql = format!("CREATE CLUSTER {}", ident(&cluster.name));
    if let Some(id) = cluster.id {
        sql.push_str(&format!(" ID {id}"));
    }
    Statement::new(sql)
}

pub fn create_function(function: &FunctionDef) -> Statement {
    let mut sql = format!("CREATE FUNCTION {} :code", ident(&function.name));
    if !function.parameters.is_empty() {
        let params: Vec<String> = function.parameters.iter().map(|p| ident(p)).collect();
        sql.push_str(&format!(" PARAMETERS [{}]", params.join(",")));
    }
    if let Some(idempotent) = function.idempotent {
        sql.push_str(if idempotent {
            " IDEMPOTENT true"
        } else {
            " IDEMPOTENT false"
        });
    }
    if let Some(language) = function.language {
        sql.push_str(" LANGUAGE ");
        sql.push_str(language.as_sql());
    }
    Statement::new(sql).param("code", function.code.clone())
}

pub fn create_sequence(sequence: &SequenceDef) -> Statement {
    let mut sql = format!(
        "CREATE SEQUENCE {} TYPE {}",
        ident(&sequence.name),
        sequence.sequence_type.as_sql()
    );
    if let Some(start) = sequence.start {
        sql.push_str(&format!(" START {start}"));
    }
    if let Some(incr) = sequence.increment {
        sql.push_str(&format!(" INCREMENT {incr}"));
    }
    if let Some(cache) = sequence.cache {
        sql.push_str(&format!(" CACHE {cache}"));
    }
    Statement::new(sql)
}

pub fn create_index(index: &IndexDef) -> Statement {
    let properties: Vec<String> = index.properties.iter().map(|p| ident(p)).collect();
    let mut sql = format!(
        "CREATE INDEX {} ON {} ({}) {}",
        ident(&index.name),
        ident(&index.class),
        properties.join(", "),
        index.index_type.as_sql()
    );
    if let Some(engine) = &index.engine {
        sql.push_str(&format!(" ENGINE {}", engine.to_ascii_uppercase()));
    }
    if let Some(metadata) = &index.metadata {
        sql.push_str(&format!(" METADATA {}", Value::Object(metadata.clone())));
    }
    Statement::new(sql)
}

/// Insert a scheduled job, resolving the function reference with a
/// sub-query in the same statement.
pub fn insert_schedule(schedule: &ScheduleDef) -> Statement {
    let mut assignments = vec!["name = :name".to_string(), "rule = :rule".to_string()];
    let mut statement = Statement::new("")
        .param("name", schedule.name.clone())
        .param("rule", schedule.rule.clone())
        .param("function", schedule.function.clone());

    if let Some(arguments) = &schedule.arguments {
        assignments.push("arguments = :arguments".to_string());
        statement = statement.param("arguments", Value::Object(arguments.clone()));
    }
    if let Some(start) = &schedule.start_time {
        assignments.push("starttime = :starttime".to_string());
        statement = statement.param("starttime", start.to_server_string());
    }
    assignments.push(format!(
        "function = ({})",
        select_by_name(Registry::Functions, ":function")
    ));

    statement.sql = format!(
        "INSERT INTO {} SET {}",
        Registry::Schedules.class_name(),
        assignments.join(", ")
    );
    statement
}

fn select_by_name(registry: Registry, placeholder: &str) -> String {
    format!(
        "SELECT FROM {} WHERE name = {placeholder}",
        registry.class_name()
    )
}

pub fn select_names(registry: Registry) -> Statement {
    Statement::new(format!("SELECT name FROM {}", registry.class_name()))
}

pub fn select_index_names() -> Statement {
    Statement::new("SELECT name FROM (SELECT expand(indexes) FROM metadata:indexmanager)")
}

/// Set a custom database attribute, e.g. `useLightweightEdges`.
pub fn alter_database_custom(key: &str, value: impl Into<Value>) -> Statement {
    Statement::new(format!(
        "ALTER DATABASE CUSTOM {key} = {}",
        literal(&value.into())
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use strata_core::{
        FunctionLanguage, IndexType, PropertyType, SequenceType, StartTime,
    };

    use super::*;

    #[test]
    fn test_ident_escapes_backquotes() {
        assert_eq!(ident("Person"), "`Person`");
        assert_eq!(ident("we`ird"), "`we\\`ird`");
    }

    #[test]
    fn test_create_class() {
        let class = ClassDef {
            name: "Person".into(),
            super_class: Some("V".into()),
            cluster: Some(ClusterRef::Id(12)),
            is_abstract: true,
        };
        // Superclass links are issued separately.
        assert_eq!(
            create_class(&class).sql,
            "CREATE CLASS `Person` CLUSTER 12 ABSTRACT"
        );
    }

    #[test]
    fn test_alter_super_class() {
        assert_eq!(
            alter_super_class("Knows", "E").sql,
            "ALTER CLASS `Knows` SUPERCLASS `E`"
        );
    }

    #[test]
    fn test_create_property_with_constraints() {
        let mut prop = PropertyDef::simple("friend", PropertyType::Link);
        prop.linked_class = Some("Person".into());
        prop.mandatory = Some(true);
        prop.regexp = Some("[a-z\"]+".into());
        assert_eq!(
            create_property("Person", &prop).sql,
            r#"CREATE PROPERTY `Person`.`friend` LINK `Person` (MANDATORY TRUE, REGEXP "[a-z\"]+")"#
        );

        let mut prop = PropertyDef::simple("age", PropertyType::Integer);
        prop.min = Some(json!(0));
        prop.default = Some(json!("18"));
        assert_eq!(
            create_property("Person", &prop).sql,
            r#"CREATE PROPERTY `Person`.`age` INTEGER (MIN 0, DEFAULT "18")"#
        );
    }

    #[test]
    fn test_create_cluster() {
        let c = ClusterDef {
            name: "archive".into(),
            id: Some(30),
        };
        assert_eq!(create_cluster(&c).sql, "CREATE CLUSTER `archive` ID 30");
    }

    #[test]
    fn test_create_function_binds_code() {
        let f = FunctionDef {
            name: "sum".into(),
            code: "return a + b".into(),
            parameters: vec!["a".into(), "b".into()],
            idempotent: Some(true),
            language: Some(FunctionLanguage::Scripting),
        };
        let stmt = create_function(&f);
        assert_eq!(
            stmt.sql,
            "CREATE FUNCTION `sum` :code PARAMETERS [`a`,`b`] IDEMPOTENT true LANGUAGE JAVASCRIPT"
        );
        assert_eq!(stmt.params["code"], json!("return a + b"));
    }

    #[test]
    fn test_create_sequence() {
        let s = SequenceDef {
            name: "idseq".into(),
            sequence_type: SequenceType::Cached,
            start: Some(100),
            increment: None,
            cache: Some(20),
        };
        assert_eq!(
            create_sequence(&s).sql,
            "CREATE SEQUENCE `idseq` TYPE CACHED START 100 CACHE 20"
        );
    }

    #[test]
    fn test_create_index() {
        let idx = IndexDef {
            name: "Person.name".into(),
            class: "Person".into(),
            properties: vec!["name".into()],
            index_type: IndexType::Unique,
            engine: None,
            metadata: None,
        };
        assert_eq!(
            create_index(&idx).sql,
            "CREATE INDEX `Person.name` ON `Person` (`name`) UNIQUE"
        );
    }

    #[test]
    fn test_insert_schedule_uses_function_subquery() {
        let s = ScheduleDef {
            name: "nightly".into(),
            function: "cleanup".into(),
            rule: "0 0 3 * * ?".into(),
            arguments: None,
            start_time: Some(StartTime::At(chrono::DateTime::UNIX_EPOCH)),
        };
        let stmt = insert_schedule(&s);
        assert_eq!(
            stmt.sql,
            "INSERT INTO OSchedule SET name = :name, rule = :rule, starttime = :starttime, \
             function = (SELECT FROM OFunction WHERE name = :function)"
        );
        assert_eq!(stmt.params["function"], json!("cleanup"));
        assert_eq!(stmt.params["starttime"], json!("1970-01-01 00:00:00"));
    }

    #[test]
    fn test_alter_database_custom() {
        assert_eq!(
            alter_database_custom("useLightweightEdges", true).sql,
            "ALTER DATABASE CUSTOM useLightweightEdges = true"
        );
    }
}
