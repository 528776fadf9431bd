//! CSV export of query results.
//!
//! Each non-empty result is written to
//! `<output_dir>/query_result_<YYYYMMDDHHMMSS>.csv`. The name has one-second
//! granularity, so two exports within the same second share a path and the
//! later one overwrites the earlier.

use crate::db::{QueryResult, Value};
use crate::error::{ReportError, Result};
use chrono::{Local, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name prefix for exported results.
pub const FILE_PREFIX: &str = "query_result_";

/// Timestamp layout used in file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Writes query results to timestamped CSV files.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    output_dir: PathBuf,
}

impl CsvExporter {
    /// Creates an exporter writing into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Returns the file path for an export made at the given local time.
    pub fn path_for(&self, at: NaiveDateTime) -> PathBuf {
        self.output_dir.join(format!(
            "{FILE_PREFIX}{}.csv",
            at.format(TIMESTAMP_FORMAT)
        ))
    }

    /// Exports the result using the current local time.
    pub fn export(&self, result: &QueryResult) -> Result<Option<PathBuf>> {
        self.export_at(result, Local::now().naive_local())
    }

    /// Exports the result as of `at`.
    ///
    /// Returns `Ok(None)` without touching the filesystem when the result has
    /// no rows.
    pub fn export_at(&self, result: &QueryResult, at: NaiveDateTime) -> Result<Option<PathBuf>> {
        if result.is_empty() {
            debug!("Empty result, skipping export");
            return Ok(None);
        }

        fs::create_dir_all(&self.output_dir).map_err(|e| {
            ReportError::io(format!(
                "Cannot create output directory {}: {e}",
                self.output_dir.display()
            ))
        })?;

        let path = self.path_for(at);
        if path.exists() {
            warn!("Overwriting {} written earlier in the same second", path.display());
        }
        write_csv(result, &path)
            .map_err(|e| ReportError::io(format!("Cannot write {}: {e}", path.display())))?;

        debug!("Wrote {} rows to {}", result.row_count(), path.display());
        Ok(Some(path))
    }
}

fn write_csv(result: &QueryResult, path: &Path) -> std::result::Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record(result.column_names())?;
    for row in &result.rows {
        writer.write_record(row.iter().map(Value::to_csv_field))?;
    }

    writer.flush()?;
    Ok(())
}
