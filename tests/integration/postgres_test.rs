//! PostgreSQL tests.
//!
//! These need a database with the TICKIT tables loaded and are skipped
//! unless DATABASE_URL is set.

use tickit_report::catalog::QueryCatalog;
use tickit_report::config::ConnectionConfig;
use tickit_report::export::CsvExporter;
use tickit_report::runner::{QueryRunner, RunnerState};

fn test_config() -> Option<ConnectionConfig> {
    let url = std::env::var("DATABASE_URL").ok()?;
    ConnectionConfig::from_connection_string(&url).ok()
}

#[tokio::test]
async fn test_builtin_catalog_against_postgres() {
    let Some(config) = test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let dir = tempfile::tempdir().unwrap();

    let mut runner = QueryRunner::new(CsvExporter::new(dir.path()), 10).with_output(std::io::sink());
    runner.connect(&config).await.unwrap();
    assert_eq!(runner.state(), RunnerState::Connected);

    let catalog = QueryCatalog::builtin().unwrap();
    let summary = runner.run_batch(catalog.queries()).await.unwrap();
    assert_eq!(summary.outcomes.len(), catalog.queries().len());

    runner.close().await.unwrap();
    runner.close().await.unwrap();
}

#[tokio::test]
async fn test_bad_credentials_are_fatal() {
    let Some(mut config) = test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    config.password = Some("definitely-not-the-password".to_string());
    config.user = Some("no_such_user_xyz".to_string());

    let mut runner = QueryRunner::new(CsvExporter::new("unused"), 10);
    let err = runner.connect(&config).await.unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(runner.state(), RunnerState::Disconnected);
    runner.close().await.unwrap();
}
