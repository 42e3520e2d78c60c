//! End-to-end reconciliation against the in-process server.

use strata_core::{ObjectKind, SchemaDocument};
use strata_graph::MemoryServer;

use strata_migrate::batch;
use strata_migrate::{ConcurrencyConfig, Diagnostics, MigrateError, Severity};

fn document(yaml: &str) -> SchemaDocument {
    serde_yaml::from_str::<SchemaDocument>(yaml)
        .unwrap()
        .with_source("schema/app.yml")
}

async fn apply(
    server: &MemoryServer,
    documents: &[SchemaDocument],
    targets: &[&str],
) -> (Result<strata_migrate::BatchReport, MigrateError>, Diagnostics) {
    let diagnostics = Diagnostics::new();
    let targets: Vec<String> = targets.iter().map(|t| t.to_string()).collect();
    let result = batch::apply(
        server,
        documents,
        &targets,
        &ConcurrencyConfig::default(),
        &diagnostics,
    )
    .await;
    (result, diagnostics)
}

fn messages(diagnostics: &Diagnostics, severity: Severity) -> Vec<String> {
    diagnostics
        .with_severity(severity)
        .into_iter()
        .map(|d| d.message)
        .collect()
}

#[tokio::test]
async fn test_second_run_creates_nothing() {
    let doc = document("db:\n  name: demo\nclass:\n  Person:\n    props:\n      name: string\n");

    let server = MemoryServer::new();
    let (first, _) = apply(&server, &[doc.clone()], &[]).await;
    let first = first.unwrap();
    assert_eq!(first.created(ObjectKind::Class), vec!["Person"]);
    assert_eq!(first.created(ObjectKind::Property), vec!["Person.name"]);

    let journal = server.journal("demo");
    let create_class = journal.iter().position(|s| s == "CREATE CLASS `Person`").unwrap();
    let create_property = journal
        .iter()
        .position(|s| s.starts_with("CREATE PROPERTY `Person`.`name` STRING"))
        .unwrap();
    assert!(create_class < create_property);

    // A new connection for the second run; the first one was closed.
    assert!(server.is_closed());
    let again = server.reopen();
    let (second, diagnostics) = apply(&again, &[doc], &[]).await;
    let second = second.unwrap();

    assert_eq!(second.created_total(), 0);
    assert!(messages(&diagnostics, Severity::Success).is_empty());
    let warnings = messages(&diagnostics, Severity::Warning);
    assert!(warnings.iter().any(|w| w.contains("\"Person\" already exists")));
    assert!(warnings.iter().any(|w| w.contains("\"Person.name\" already exists")));
}

#[tokio::test]
async fn test_full_document_rerun_only_warns() {
    let doc = document(
        r#"
db:
  name: demo
cluster:
  archive: 40
sequence:
  idseq: ordered
function:
  cleanup: "DELETE VERTEX Session WHERE expired = true"
schedule:
  nightly:
    function: cleanup
    rule: "0 0 3 * * ?"
    startTime: 0
class:
  Person:
    superClass: V
    props:
      name: string
      email: string
    index:
      email: unique
  Employee:
    superClass: Person
edge:
  Knows:
    props:
      since: date
index:
  Person.name: notunique
"#,
    );
    let kinds = [
        ObjectKind::Cluster,
        ObjectKind::Sequence,
        ObjectKind::Function,
        ObjectKind::Schedule,
        ObjectKind::Class,
        ObjectKind::SuperClass,
        ObjectKind::Property,
        ObjectKind::Edge,
        ObjectKind::EdgeProperty,
        ObjectKind::Index,
    ];

    let server = MemoryServer::new();
    let (first, _) = apply(&server, &[doc.clone()], &[]).await;
    let first = first.unwrap();
    for kind in kinds {
        assert!(!first.created(kind).is_empty(), "nothing created for {kind}");
    }
    let mut indexes = first.created(ObjectKind::Index);
    indexes.sort();
    assert_eq!(indexes, vec!["Person.email", "Person.name"]);

    let again = server.reopen();
    let (second, diagnostics) = apply(&again, &[doc], &[]).await;
    let second = second.unwrap();

    assert_eq!(second.created_total(), 0);
    assert!(messages(&diagnostics, Severity::Success).is_empty());
    let warnings = messages(&diagnostics, Severity::Warning);
    for kind in kinds {
        let tag = format!("[{}Ignored]", kind.tag());
        assert!(
            warnings.iter().any(|w| w.starts_with(&tag)),
            "no {tag} warning in {warnings:?}"
        );
    }
    let mut indexes = second.skipped(ObjectKind::Index);
    indexes.sort();
    assert_eq!(indexes, vec!["Person.email", "Person.name"]);
}

#[tokio::test]
async fn test_edge_shorthand_links_to_base_edge() {
    let server = MemoryServer::new().with_database("demo");
    let (report, _) = apply(&server, &[document("edge:\n  Knows: E\n")], &["demo"]).await;
    let report = report.unwrap();

    assert_eq!(report.created(ObjectKind::Edge), vec!["Knows"]);
    assert_eq!(report.created(ObjectKind::SuperClass), vec!["Knows"]);
    assert_eq!(
        server.journal("demo"),
        vec!["CREATE CLASS `Knows`", "ALTER CLASS `Knows` SUPERCLASS `E`"]
    );
}

#[tokio::test]
async fn test_global_index_on_existing_class() {
    let server = MemoryServer::new().with_database("demo");
    let setup = document("class:\n  Person:\n    props:\n      name: string\n");
    apply(&server, &[setup], &["demo"]).await.0.unwrap();

    let again = server.reopen();
    let doc = document("class:\n  Person:\nindex:\n  Person.name: unique\n");
    let (report, _) = apply(&again, &[doc], &["demo"]).await;

    assert_eq!(report.unwrap().created(ObjectKind::Index), vec!["Person.name"]);
    let journal = again.journal("demo");
    assert_eq!(
        journal.last().unwrap(),
        "CREATE INDEX `Person.name` ON `Person` (`name`) UNIQUE"
    );
}

#[tokio::test]
async fn test_superclass_across_documents() {
    let server = MemoryServer::new().with_database("demo");
    let employees = document("class:\n  Employee:\n    superClass: Person\n");
    let people = document("class:\n  Person:\n    superClass: V\n");

    let (report, _) = apply(&server, &[employees, people], &["demo"]).await;
    report.unwrap();

    let db = server.database("demo").unwrap();
    assert!(db.classes["Employee"].extends("Person"));
    assert!(db.classes["Person"].extends("V"));
}

#[tokio::test]
async fn test_schedule_runs_after_its_function() {
    let server = MemoryServer::new().with_database("demo");
    let doc = document(
        "function:\n  cleanup: \"DELETE VERTEX Session WHERE expired = true\"\n\
         schedule:\n  nightly:\n    function: cleanup\n    rule: \"0 0 3 * * ?\"\n    startTime: 0\n",
    );

    let (report, diagnostics) = apply(&server, &[doc], &["demo"]).await;
    let report = report.unwrap();

    assert_eq!(report.created(ObjectKind::Function), vec!["cleanup"]);
    assert_eq!(report.created(ObjectKind::Schedule), vec!["nightly"]);
    let successes = messages(&diagnostics, Severity::Success);
    assert!(successes.contains(&"Creating \"demo\" functions".to_string()));
    assert!(successes.contains(&"Creating \"demo\" schedules".to_string()));
}

#[tokio::test]
async fn test_validation_error_aborts_and_closes() {
    let server = MemoryServer::new().with_database("demo");
    let bad = document("cluster:\n  \"bad name!\": 12\n");
    let later = document("class:\n  Person:\n");

    let (result, _) = apply(&server, &[bad, later], &["demo"]).await;
    let err = result.unwrap_err();

    assert!(err.is_validation());
    assert!(err.to_string().starts_with("[ClusterError]"));
    assert!(err.to_string().ends_with("at schema/app.yml"));
    assert!(server.is_closed());
    assert!(!server.database("demo").unwrap().classes.contains_key("Person"));
}

#[tokio::test]
async fn test_server_error_is_tagged() {
    let server = MemoryServer::new()
        .with_database("demo")
        .fail_when("CREATE CLASS `Broken`");
    let doc = document("class:\n  Broken:\n  Fine:\n");

    let (result, _) = apply(&server, &[doc], &["demo"]).await;
    let err = result.unwrap_err();

    assert!(matches!(err, MigrateError::Server { kind: ObjectKind::Class, .. }));
    assert!(err.to_string().starts_with("[ClassError]"));
    // Siblings are not cancelled and nothing is rolled back.
    assert!(server.database("demo").unwrap().classes.contains_key("Fine"));
}

#[tokio::test]
async fn test_every_document_applied_to_every_target() {
    let server = MemoryServer::new().with_database("one");
    let docs = [
        document("class:\n  Person:\n"),
        document("cluster:\n  archive: 40\n"),
    ];

    let (report, diagnostics) = apply(&server, &docs, &["one", "two"]).await;
    let report = report.unwrap();

    assert_eq!(report.documents.len(), 4);
    assert_eq!(report.created(ObjectKind::Database), vec!["two"]);
    for name in ["one", "two"] {
        let db = server.database(name).unwrap();
        assert!(db.classes.contains_key("Person"));
        assert!(db.clusters.iter().any(|c| c == "archive"));
    }
    assert!(!messages(&diagnostics, Severity::Warning)
        .iter()
        .any(|w| w.contains("[DatabaseIgnored]")));
}

#[tokio::test]
async fn test_drop_existing_and_warn_missing() {
    let server = MemoryServer::new().with_database("old");
    let diagnostics = Diagnostics::new();
    let names = vec!["old".to_string(), "ghost".to_string()];

    let dropped = batch::drop_databases(&server, &names, &ConcurrencyConfig::default(), &diagnostics)
        .await
        .unwrap();

    assert_eq!(dropped, vec!["old"]);
    assert!(server.database("old").is_none());
    assert!(server.is_closed());
    assert_eq!(
        messages(&diagnostics, Severity::Warning),
        vec!["\"ghost\" doesn't exist"]
    );
    assert_eq!(
        messages(&diagnostics, Severity::Success),
        vec!["Dropping \"old\""]
    );
}

