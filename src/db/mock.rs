//! Mock database clients for testing.
//!
//! `MockDatabaseClient` returns scripted results and records every statement
//! it receives, so tests can assert on execution order.

use super::{ColumnInfo, DatabaseClient, QueryResult, Value};
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Scripted = std::result::Result<QueryResult, String>;

/// A mock database client that returns predefined results.
#[derive(Default)]
pub struct MockDatabaseClient {
    responses: HashMap<String, Scripted>,
    executed: Mutex<Vec<String>>,
    closed: AtomicUsize,
}

impl MockDatabaseClient {
    /// Creates a new mock client with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a successful result for the given SQL text.
    pub fn with_result(mut self, sql: &str, result: QueryResult) -> Self {
        self.responses.insert(sql.trim().to_string(), Ok(result));
        self
    }

    /// Scripts a failure for the given SQL text.
    pub fn with_error(mut self, sql: &str, message: impl Into<String>) -> Self {
        self.responses
            .insert(sql.trim().to_string(), Err(message.into()));
        self
    }

    /// Returns the statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Returns how many times `close` was called.
    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let key = sql.trim();
        if let Ok(mut log) = self.executed.lock() {
            log.push(key.to_string());
        }

        if let Some(scripted) = self.responses.get(key) {
            return scripted.clone().map_err(ReportError::query);
        }

        if key.to_uppercase().starts_with("SELECT") {
            let columns = vec![ColumnInfo::new("result", "text")];
            let rows = vec![vec![Value::String(format!("Mock result for: {key}"))]];
            Ok(QueryResult::with_data(columns, rows).with_execution_time(Duration::from_millis(1)))
        } else {
            Ok(QueryResult::new().with_execution_time(Duration::from_millis(1)))
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
