// ABOUTME: Integration tests for backup and restore against real databases
// ABOUTME: Require TEST_SOURCE_URL and TEST_TARGET_URL; run with --ignored

use pgvault::migration::{
    create_backup, execute_statements, restore_backup, BackupStore, DumpOptions, RestoreOptions,
};
use pgvault::postgres::connect;
use pgvault::progress::{EventKind, ProgressReporter, RecordingSink};
use std::env;

/// Helper to get test database URLs from environment
fn get_test_urls() -> Option<(String, String)> {
    let source = env::var("TEST_SOURCE_URL").ok()?;
    let target = env::var("TEST_TARGET_URL").ok()?;
    Some((source, target))
}

fn scoped(schema: &str) -> Vec<String> {
    vec![schema.to_string()]
}

#[tokio::test]
#[ignore]
async fn test_backup_and_clean_restore_round_trip() {
    let (source_url, target_url) =
        get_test_urls().expect("TEST_SOURCE_URL and TEST_TARGET_URL must be set");
    let schema = "pgvault_e2e";

    let source = connect(&source_url).await.unwrap();
    source
        .batch_execute(
            "DROP SCHEMA IF EXISTS pgvault_e2e CASCADE;
             CREATE SCHEMA pgvault_e2e;
             CREATE TYPE pgvault_e2e.mood AS ENUM ('happy', 'sad');
             CREATE TABLE pgvault_e2e.t (id int, m pgvault_e2e.mood);
             INSERT INTO pgvault_e2e.t VALUES (1, 'happy'), (2, NULL);",
        )
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = BackupStore::new(dir.path());
    let dump_options = DumpOptions {
        compress: true,
        schemas: scoped(schema),
        ..DumpOptions::default()
    };

    let sink = RecordingSink::new();
    let dump = create_backup(&source_url, "e2e", &store, &dump_options, &sink)
        .await
        .unwrap();
    assert_eq!(dump.metadata.object_counts.tables, 1);
    assert_eq!(dump.metadata.object_counts.enums, 1);
    assert_eq!(dump.metadata.schemas, scoped(schema));
    assert_eq!(sink.events().last().unwrap().kind, EventKind::Complete);

    let restore_options = RestoreOptions {
        clean: true,
        schemas: scoped(schema),
        ..RestoreOptions::default()
    };

    // Twice: the second run has to clean up what the first one created
    for _ in 0..2 {
        let sink = RecordingSink::new();
        let report = restore_backup(&target_url, &dump.filepath, &restore_options, &sink)
            .await
            .unwrap();
        assert_eq!(report.error_count, 0, "errors: {:?}", report.errors);
        assert_eq!(sink.events().last().unwrap().kind, EventKind::Complete);
    }

    let target = connect(&target_url).await.unwrap();
    let count: i64 = target
        .query_one("SELECT count(*) FROM pgvault_e2e.t", &[])
        .await
        .unwrap()
        .get(0);
    assert_eq!(count, 2);

    let labels: i64 = target
        .query_one(
            "SELECT count(*) FROM pg_catalog.pg_enum e
             JOIN pg_catalog.pg_type t ON t.oid = e.enumtypid
             JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
             WHERE n.nspname = 'pgvault_e2e' AND t.typname = 'mood'",
            &[],
        )
        .await
        .unwrap()
        .get(0);
    assert_eq!(labels, 2);

    source
        .batch_execute("DROP SCHEMA pgvault_e2e CASCADE")
        .await
        .unwrap();
    target
        .batch_execute("DROP SCHEMA pgvault_e2e CASCADE")
        .await
        .unwrap();
}

#[tokio::test]
#[ignore]
async fn test_backup_of_empty_schema_has_zero_counts() {
    let (source_url, _) = get_test_urls().expect("TEST_SOURCE_URL must be set");

    let source = connect(&source_url).await.unwrap();
    source
        .batch_execute(
            "DROP SCHEMA IF EXISTS pgvault_empty CASCADE;
             CREATE SCHEMA pgvault_empty;",
        )
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = BackupStore::new(dir.path());
    let options = DumpOptions {
        schemas: scoped("pgvault_empty"),
        ..DumpOptions::default()
    };

    let dump = create_backup(&source_url, "empty", &store, &options, &RecordingSink::new())
        .await
        .unwrap();
    assert_eq!(dump.metadata.object_counts.total(), 0);

    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].metadata, dump.metadata);

    source
        .batch_execute("DROP SCHEMA pgvault_empty CASCADE")
        .await
        .unwrap();
}

#[tokio::test]
#[ignore]
async fn test_one_invalid_statement_among_valid_ones() {
    let (_, target_url) = get_test_urls().expect("TEST_TARGET_URL must be set");

    let target = connect(&target_url).await.unwrap();
    target
        .batch_execute("DROP SCHEMA IF EXISTS pgvault_tolerance CASCADE; CREATE SCHEMA pgvault_tolerance;")
        .await
        .unwrap();

    let mut statements = vec!["CREATE TABLE pgvault_tolerance.t (id int);".to_string()];
    statements.extend((0..98).map(|i| format!("INSERT INTO pgvault_tolerance.t VALUES ({});", i)));
    statements.insert(50, "INSERT INTO pgvault_tolerance.missing VALUES (1);".to_string());
    assert_eq!(statements.len(), 100);

    let sink = RecordingSink::new();
    let mut reporter = ProgressReporter::new(&sink);
    let report = execute_statements(&target, &statements, 50, &mut reporter).await;

    assert_eq!(report.success_count, 99);
    assert_eq!(report.error_count, 1);
    assert!(report.errors[0].error.contains("does not exist"));

    let rows: i64 = target
        .query_one("SELECT count(*) FROM pgvault_tolerance.t", &[])
        .await
        .unwrap()
        .get(0);
    assert_eq!(rows, 98);

    // Same script through the full restore path ends with a complete event
    target
        .batch_execute("DROP TABLE pgvault_tolerance.t")
        .await
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("tolerance.sql");
    std::fs::write(&script, statements.join("\n")).unwrap();

    let sink = RecordingSink::new();
    let report = restore_backup(&target_url, &script, &RestoreOptions::default(), &sink)
        .await
        .unwrap();
    assert_eq!(report.success_count, 99);
    assert_eq!(report.error_count, 1);

    let events = sink.events();
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert_eq!(events.last().unwrap().kind, EventKind::Complete);

    target
        .batch_execute("DROP SCHEMA pgvault_tolerance CASCADE")
        .await
        .unwrap();
}
