//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using sqlx.

use crate::config::ConnectionConfig;
use crate::db::{ColumnInfo, DatabaseClient, QueryResult, Row, Value};
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::BigDecimal;
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, Statement, TypeInfo};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Seconds to wait for the server before giving up on a connection.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL database client holding exactly one connection.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Opens a single connection using the given configuration.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let options = connect_options(config)?;

        debug!("Connecting to {}", config.display_string());

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .connect_with(options)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Successfully connected to database");
        Ok(Self { pool })
    }

    /// Reads column metadata from the prepared statement.
    ///
    /// Used when a query returns no rows and so carries no row metadata.
    async fn describe_columns(&self, sql: &str) -> Vec<ColumnInfo> {
        match (&self.pool).prepare(sql).await {
            Ok(statement) => statement
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            Err(e) => {
                debug!("Could not describe empty result: {e}");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let result = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ReportError::query(format_query_error(e)))?;

        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = match result.first() {
            Some(first_row) => first_row
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            None => self.describe_columns(sql).await,
        };

        let rows: Vec<Row> = result.iter().map(convert_row).collect();

        Ok(QueryResult {
            columns,
            rows,
            execution_time,
        })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Builds connect options field by field from the layered settings.
///
/// Values are taken verbatim, so a `%` in a password is never decoded.
/// Settings left unset (such as `PGSSLMODE`) come from the environment.
fn connect_options(config: &ConnectionConfig) -> Result<PgConnectOptions> {
    config.validate()?;

    let mut options = PgConnectOptions::new()
        .host(config.host())
        .port(config.port())
        .database(config.database.as_deref().unwrap_or_default());
    if let Some(user) = &config.user {
        options = options.username(user);
    }
    if let Some(password) = &config.password {
        options = options.password(password);
    }
    Ok(options)
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.name(), col.type_info().name()))
        .collect()
}

/// Position and metadata of the cell being decoded.
#[derive(Clone, Copy)]
struct Cell<'a> {
    index: usize,
    column: &'a str,
    type_name: &'a str,
}

/// Decodes an optional column value, mapping NULL and decode failures to `Value::Null`.
fn decode<'r, T, F>(row: &'r PgRow, cell: Cell<'_>, map: F) -> Value
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    F: FnOnce(T) -> Value,
{
    match row.try_get::<Option<T>, _>(cell.index) {
        Ok(Some(v)) => map(v),
        Ok(None) => Value::Null,
        Err(e) => {
            warn!(
                "Column '{}' of type {} could not be decoded, written as NULL: {e}",
                cell.column, cell.type_name
            );
            Value::Null
        }
    }
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, column: &str, type_name: &str) -> Value {
    let cell = Cell {
        index,
        column,
        type_name,
    };
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => decode::<bool, _>(row, cell, Value::Bool),
        "INT2" | "SMALLINT" => decode::<i16, _>(row, cell, |v| Value::Int(v as i64)),
        "INT4" | "INT" | "INTEGER" => decode::<i32, _>(row, cell, |v| Value::Int(v as i64)),
        "INT8" | "BIGINT" => decode::<i64, _>(row, cell, Value::Int),
        "FLOAT4" | "REAL" => decode::<f32, _>(row, cell, |v| Value::Float(v as f64)),
        "FLOAT8" | "DOUBLE PRECISION" => decode::<f64, _>(row, cell, Value::Float),
        "NUMERIC" | "DECIMAL" => {
            decode::<BigDecimal, _>(row, cell, |v| Value::Numeric(v.to_string()))
        }
        "TIMESTAMP" => {
            decode::<NaiveDateTime, _>(row, cell, |v| Value::Timestamp(v.to_string()))
        }
        "TIMESTAMPTZ" => {
            decode::<DateTime<Utc>, _>(row, cell, |v| Value::Timestamp(v.to_rfc3339()))
        }
        "DATE" => decode::<NaiveDate, _>(row, cell, |v| Value::Timestamp(v.to_string())),
        "TIME" => decode::<NaiveTime, _>(row, cell, |v| Value::Timestamp(v.to_string())),
        "BYTEA" => decode::<Vec<u8>, _>(row, cell, Value::Bytes),
        // Text-like types (TEXT, VARCHAR, BPCHAR, NAME, ...)
        _ => decode::<String, _>(row, cell, Value::String),
    }
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> ReportError {
    let host = config.host();
    let port = config.port();
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        ReportError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        ReportError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        ReportError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        ReportError::connection(
            "Server requires SSL. Set PGSSLMODE=require.".to_string(),
        )
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        ReportError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        ReportError::connection(error.to_string())
    }
}

/// Formats a query error with DETAIL and HINT fields when the server sent them.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
        if let Some(table) = pg_error.table() {
            result.push_str("\n  TABLE: ");
            result.push_str(table);
        }
        if let Some(column) = pg_error.column() {
            result.push_str("\n  COLUMN: ");
            result.push_str(column);
        }
    }

    result
}
