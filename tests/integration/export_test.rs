//! CSV export tests: read-back and file naming.

use super::common::seeded_memory_client;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use tickit_report::db::DatabaseClient;
use tickit_report::export::CsvExporter;

#[tokio::test]
async fn test_csv_read_back_preserves_columns_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let client = seeded_memory_client().await;
    let result = client
        .execute_query("SELECT userid, username, email, city FROM users ORDER BY userid")
        .await
        .unwrap();

    let path = CsvExporter::new(dir.path())
        .export(&result)
        .unwrap()
        .unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers: Vec<String> = reader
        .headers()
        .unwrap()
        .iter()
        .map(String::from)
        .collect();
    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

    assert_eq!(headers, vec!["userid", "username", "email", "city"]);
    assert_eq!(records.len(), result.row_count());
    // NULL email is written as an empty field.
    assert_eq!(&records[1][2], "");
    assert_eq!(&records[0][1], "JSG99FHE");
}

#[test]
fn test_file_names_differ_across_seconds_and_collide_within_one() {
    let exporter = CsvExporter::new("results");
    let day = NaiveDate::from_ymd_opt(2008, 6, 1).unwrap();

    let first = exporter.path_for(day.and_hms_opt(19, 30, 0).unwrap());
    let next_second = exporter.path_for(day.and_hms_opt(19, 30, 1).unwrap());
    let same_second = exporter.path_for(
        day.and_hms_milli_opt(19, 30, 0, 999).unwrap(),
    );

    assert_ne!(first, next_second);
    // Known limitation: names have one-second granularity.
    assert_eq!(first, same_second);
    assert_eq!(
        first.file_name().unwrap().to_str().unwrap(),
        "query_result_20080601193000.csv"
    );
}
