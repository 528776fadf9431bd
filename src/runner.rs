//! The query runner: one connection, a batch of queries, one CSV per result.
//!
//! Lifecycle is `Disconnected -> Connected -> Closed`. Query and export
//! failures are reported and recorded in the `BatchSummary`; they never stop
//! the batch.

use crate::catalog::QuerySpec;
use crate::config::ConnectionConfig;
use crate::db::{self, DatabaseClient, QueryResult};
use crate::error::{ReportError, Result};
use crate::export::CsvExporter;
use crate::preview::render_preview;
use chrono::Local;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const RULE_WIDTH: usize = 60;

/// Connection lifecycle of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// No connection has been opened yet.
    Disconnected,
    /// A connection is open and queries may run.
    Connected,
    /// The connection was released; no further operations are valid.
    Closed,
}

/// The step of a query that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Execute,
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Execute => write!(f, "execute"),
            Stage::Export => write!(f, "export"),
        }
    }
}

/// What happened to one query of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
    /// The query ran; `file` is `None` when the result was empty.
    Succeeded { rows: usize, file: Option<PathBuf> },
    /// The query or its export failed.
    Failed { stage: Stage, message: String },
}

/// Outcome of one query, in batch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    /// 1-based position in the batch.
    pub index: usize,
    pub label: String,
    pub status: QueryStatus,
}

impl QueryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, QueryStatus::Succeeded { .. })
    }
}

/// Per-query outcomes of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub outcomes: Vec<QueryOutcome>,
}

impl BatchSummary {
    /// Number of queries that ran and exported cleanly.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of queries that failed at either stage.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Distinct CSV paths written, in batch order.
    ///
    /// Exports within the same second share a path, so this can be shorter
    /// than the number of exporting queries.
    pub fn files(&self) -> Vec<&PathBuf> {
        let mut files: Vec<&PathBuf> = Vec::new();
        for outcome in &self.outcomes {
            if let QueryStatus::Succeeded {
                file: Some(path), ..
            } = &outcome.status
            {
                if !files.contains(&path) {
                    files.push(path);
                }
            }
        }
        files
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} queries succeeded, {} failed, {} file(s) written",
            self.succeeded(),
            self.outcomes.len(),
            self.failed(),
            self.files().len()
        )
    }
}

/// Runs queries sequentially over a single exclusively-owned connection.
pub struct QueryRunner {
    client: Option<Box<dyn DatabaseClient>>,
    state: RunnerState,
    exporter: CsvExporter,
    preview_rows: usize,
    out: Box<dyn Write + Send>,
}

impl QueryRunner {
    /// Creates a disconnected runner that reports to stdout.
    pub fn new(exporter: CsvExporter, preview_rows: usize) -> Self {
        Self {
            client: None,
            state: RunnerState::Disconnected,
            exporter,
            preview_rows,
            out: Box::new(std::io::stdout()),
        }
    }

    /// Redirects the console report.
    pub fn with_output(mut self, out: impl Write + Send + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Opens the connection. Failure is fatal for the run.
    pub async fn connect(&mut self, config: &ConnectionConfig) -> Result<()> {
        self.ensure_disconnected()?;
        info!("Connecting to {}", config.display_string());
        let client = db::connect(config).await?;
        self.attach(client)?;
        self.say(format_args!("✓ Connected to {}", config.display_string()));
        Ok(())
    }

    /// Adopts an already-open client.
    pub fn attach(&mut self, client: Box<dyn DatabaseClient>) -> Result<()> {
        self.ensure_disconnected()?;
        self.client = Some(client);
        self.state = RunnerState::Connected;
        Ok(())
    }

    fn ensure_disconnected(&self) -> Result<()> {
        match self.state {
            RunnerState::Disconnected => Ok(()),
            RunnerState::Connected => Err(ReportError::internal("runner is already connected")),
            RunnerState::Closed => Err(ReportError::internal("runner is closed")),
        }
    }

    fn client(&self) -> Result<&dyn DatabaseClient> {
        match (&self.client, self.state) {
            (Some(client), RunnerState::Connected) => Ok(client.as_ref()),
            (_, RunnerState::Closed) => Err(ReportError::internal("runner is closed")),
            _ => Err(ReportError::internal("runner is not connected")),
        }
    }

    /// Runs one query and materializes all of its rows.
    pub async fn execute_query(&self, spec: &QuerySpec) -> Result<QueryResult> {
        if spec.sql.trim().is_empty() {
            return Err(ReportError::query("query text is empty"));
        }
        let client = self.client()?;
        debug!("Executing: {}", spec.sql.trim());
        client.execute_query(&spec.sql).await
    }

    /// Writes a non-empty result to CSV; `label` is only used for logging.
    pub fn export_result(&self, result: &QueryResult, label: &str) -> Result<Option<PathBuf>> {
        let path = self.exporter.export(result)?;
        match &path {
            Some(p) => info!("Exported '{label}' to {}", p.display()),
            None => debug!("'{label}' returned no rows, nothing exported"),
        }
        Ok(path)
    }

    /// Runs every query in order and prints a summary.
    ///
    /// Only state errors (not connected, closed) are returned; per-query
    /// failures are recorded in the summary.
    pub async fn run_batch(&mut self, specs: &[QuerySpec]) -> Result<BatchSummary> {
        self.client()?;

        let total = specs.len();
        self.say("Starting database analysis...");
        self.say(format_args!(
            "Run started: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        self.say(format_args!("Total queries: {total}"));
        self.say("-".repeat(RULE_WIDTH));

        let mut summary = BatchSummary::default();
        for (i, spec) in specs.iter().enumerate() {
            let outcome = self.run_one(i + 1, total, spec).await;
            summary.outcomes.push(outcome);
        }

        self.say("");
        self.say("=".repeat(RULE_WIDTH));
        self.say(format_args!("Summary: {summary}"));
        for outcome in summary.outcomes.iter().filter(|o| !o.is_success()) {
            if let QueryStatus::Failed { stage, message } = &outcome.status {
                self.say(format_args!(
                    "  ✗ #{} {} ({stage}): {}",
                    outcome.index,
                    outcome.label,
                    first_line(message)
                ));
            }
        }
        info!("Batch finished: {summary}");

        Ok(summary)
    }

    async fn run_one(&mut self, index: usize, total: usize, spec: &QuerySpec) -> QueryOutcome {
        let label = spec.display_label();

        self.say("");
        self.say(format_args!("Query {index}/{total}"));
        self.say("=".repeat(RULE_WIDTH));
        self.say(&label);
        self.say("=".repeat(RULE_WIDTH));

        let status = match self.execute_query(spec).await {
            Err(e) => {
                warn!("Query {index} '{label}' failed: {e}");
                self.say(format_args!("✗ Query failed: {e}"));
                QueryStatus::Failed {
                    stage: Stage::Execute,
                    message: e.to_string(),
                }
            }
            Ok(result) => {
                self.say(format_args!(
                    "Rows: {} ({:.1?})",
                    result.row_count(),
                    result.execution_time
                ));
                self.say(render_preview(&result, self.preview_rows));

                match self.export_result(&result, &label) {
                    Ok(file) => {
                        if let Some(path) = &file {
                            self.say(format_args!("✓ Saved to: {}", path.display()));
                        }
                        QueryStatus::Succeeded {
                            rows: result.row_count(),
                            file,
                        }
                    }
                    Err(e) => {
                        warn!("Export of query {index} '{label}' failed: {e}");
                        self.say(format_args!("✗ Export failed: {e}"));
                        QueryStatus::Failed {
                            stage: Stage::Export,
                            message: e.to_string(),
                        }
                    }
                }
            }
        };

        QueryOutcome {
            index,
            label,
            status,
        }
    }

    /// Releases the connection. Further calls, and calls on a runner that
    /// never connected, do nothing.
    pub async fn close(&mut self) -> Result<()> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };
        self.state = RunnerState::Closed;
        client.close().await?;
        info!("Database connection closed");
        self.say("✓ Database connection closed");
        Ok(())
    }

    fn say(&mut self, line: impl fmt::Display) {
        if let Err(e) = writeln!(self.out, "{line}") {
            debug!("Console write failed: {e}");
        }
    }
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or_default()
}
