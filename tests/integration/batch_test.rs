//! End-to-end batch tests against a seeded in-memory SQLite database.

use super::common::seeded_memory_client;
use pretty_assertions::assert_eq;
use tickit_report::catalog::{QueryCatalog, QuerySpec};
use tickit_report::db::Value;
use tickit_report::export::CsvExporter;
use tickit_report::runner::{QueryRunner, QueryStatus, RunnerState, Stage};

async fn seeded_runner(output_dir: &std::path::Path) -> QueryRunner {
    let mut runner =
        QueryRunner::new(CsvExporter::new(output_dir), 10).with_output(std::io::sink());
    runner
        .attach(Box::new(seeded_memory_client().await))
        .unwrap();
    runner
}

fn csv_count(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

fn builtin(label: &str) -> QuerySpec {
    QueryCatalog::builtin()
        .unwrap()
        .find(label)
        .cloned()
        .unwrap_or_else(|| panic!("missing built-in query '{label}'"))
}

#[tokio::test]
async fn test_top_cities_returns_rows_and_csv() {
    let dir = tempfile::tempdir().unwrap();
    let runner = seeded_runner(dir.path()).await;
    let spec = builtin("Top 10 cities by user count");

    let result = runner.execute_query(&spec).await.unwrap();

    assert!(result.row_count() <= 3);
    assert_eq!(result.column_names(), vec!["city", "state", "user_count"]);
    assert_eq!(
        result.rows[0],
        vec![Value::from("Kent"), Value::from("WA"), Value::Int(2)]
    );

    let path = runner
        .export_result(&result, spec.label.as_deref().unwrap_or_default())
        .unwrap()
        .expect("non-empty result should be exported");
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("city,state,user_count\n"));
    assert_eq!(content.lines().count(), result.row_count() + 1);
}

#[tokio::test]
async fn test_sales_aggregation_on_empty_sales_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("results");
    let runner = seeded_runner(&out).await;
    let spec = builtin("Category revenue ranking");

    let result = runner.execute_query(&spec).await.unwrap();

    assert!(result.is_empty());
    assert_eq!(runner.export_result(&result, "Category revenue ranking").unwrap(), None);
    assert!(!out.exists());
}

#[tokio::test]
async fn test_good_bad_good() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = seeded_runner(dir.path()).await;

    let specs = vec![
        builtin("Top 10 cities by user count"),
        QuerySpec::new("SELECT * FROM no_such_table", Some("broken")),
        builtin("First 10 users"),
    ];
    let summary = runner.run_batch(&specs).await.unwrap();

    assert_eq!(summary.succeeded(), 2);
    assert_eq!(summary.failed(), 1);

    // Both exports may land in the same second and share a name.
    let files = summary.files();
    assert!((1..=2).contains(&files.len()));
    assert_eq!(files.len(), csv_count(dir.path()));
    assert!(files.iter().all(|p| p.exists()));

    match &summary.outcomes[1].status {
        QueryStatus::Failed { stage, message } => {
            assert_eq!(*stage, Stage::Execute);
            assert!(message.contains("no_such_table"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(
        summary.outcomes[2].status,
        QueryStatus::Succeeded {
            rows: 3,
            file: Some(files[files.len() - 1].clone()),
        }
    );
}

#[tokio::test]
async fn test_full_builtin_catalog_survives_dialect_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = seeded_runner(dir.path()).await;
    let catalog = QueryCatalog::builtin().unwrap();

    let summary = runner.run_batch(catalog.queries()).await.unwrap();

    // SQLite has no EXTRACT, so the two time-bucketed queries fail.
    let failed: Vec<&str> = summary
        .outcomes
        .iter()
        .filter(|o| !o.is_success())
        .map(|o| o.label.as_str())
        .collect();
    assert_eq!(failed, vec!["Monthly sales trend", "Sales by hour of day"]);
    assert_eq!(summary.outcomes.len(), 10);
    assert_eq!(summary.succeeded(), 8);
    // Only the users-based queries have rows.
    let exporting = summary
        .outcomes
        .iter()
        .filter(|o| matches!(o.status, QueryStatus::Succeeded { file: Some(_), .. }))
        .count();
    assert_eq!(exporting, 2);
    assert_eq!(summary.files().len(), csv_count(dir.path()));

    runner.close().await.unwrap();
    assert_eq!(runner.state(), RunnerState::Closed);
}

#[tokio::test]
async fn test_close_twice_after_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = seeded_runner(dir.path()).await;

    runner
        .run_batch(&[builtin("First 10 users")])
        .await
        .unwrap();

    runner.close().await.unwrap();
    runner.close().await.unwrap();
    assert!(runner
        .execute_query(&builtin("First 10 users"))
        .await
        .is_err());
}
