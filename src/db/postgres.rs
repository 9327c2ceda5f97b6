//! PostgreSQL query executor.
//!
//! Provides `PostgresExecutor`, which implements `QueryExecutor` using sqlx.
//! Each call opens its own `PgConnection` to the requested database; nothing
//! is pooled or shared between calls or jobs.

use crate::config::Config;
use crate::db::{ExecutionOutcome, QueryExecutor, Row, Value};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{Decimal, JsonValue, Uuid};
use sqlx::{Column as SqlxColumn, Connection, Row as SqlxRow, TypeInfo, ValueRef};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// PostgreSQL executor that connects per call.
#[derive(Debug, Clone)]
pub struct PostgresExecutor {
    config: Arc<Config>,
}

impl PostgresExecutor {
    /// Creates an executor bound to the base connection string in `config`.
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Connects, runs the statement and closes the connection.
    async fn run(url: &str, sql: &str) -> ExecutionOutcome {
        let mut conn = match PgConnection::connect(url).await {
            Ok(conn) => conn,
            Err(e) => return ExecutionOutcome::failure(e.to_string()),
        };

        let result = sqlx::query(sql).fetch_all(&mut conn).await;

        if let Err(e) = conn.close().await {
            debug!("Error while closing benchmark connection: {e}");
        }

        match result {
            Ok(rows) => ExecutionOutcome::Rows(rows.iter().map(convert_row).collect()),
            Err(e) => ExecutionOutcome::failure(e.to_string()),
        }
    }
}

#[async_trait]
impl QueryExecutor for PostgresExecutor {
    async fn execute(&self, database_name: &str, sql: &str) -> Result<ExecutionOutcome> {
        let url = self.config.database_url(database_name)?;
        let start = Instant::now();

        // A timed-out future is dropped together with its connection.
        let outcome = match self.config.query_timeout() {
            Some(limit) => match tokio::time::timeout(limit, Self::run(&url, sql)).await {
                Ok(outcome) => outcome,
                Err(_) => ExecutionOutcome::failure(format!(
                    "Query timed out after {} seconds",
                    limit.as_secs()
                )),
            },
            None => Self::run(&url, sql).await,
        };

        match &outcome {
            ExecutionOutcome::Rows(rows) => debug!(
                database = database_name,
                rows = rows.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Query succeeded"
            ),
            ExecutionOutcome::Failure(msg) => {
                debug!(database = database_name, error = %msg, "Query failed")
            }
        }

        Ok(outcome)
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Decodes an optional column value, turning SQL NULL into `Value::Null`.
macro_rules! decode {
    ($row:expr, $index:expr, $ty:ty, $map:expr) => {
        $row.try_get::<Option<$ty>, _>($index)
            .ok()
            .map(|v| v.map($map).unwrap_or(Value::Null))
    };
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    let raw = match row.try_get_raw(index) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Could not read column {index}: {e}");
            return Value::Null;
        }
    };
    if raw.is_null() {
        return Value::Null;
    }

    let type_upper = type_name.to_uppercase();
    let decoded = match type_upper.as_str() {
        "BOOL" | "BOOLEAN" => decode!(row, index, bool, Value::Bool),
        "INT2" | "SMALLINT" => decode!(row, index, i16, |v| Value::Int(v as i64)),
        "INT4" | "INT" | "INTEGER" => decode!(row, index, i32, |v| Value::Int(v as i64)),
        "INT8" | "BIGINT" => decode!(row, index, i64, Value::Int),
        "FLOAT4" | "REAL" => decode!(row, index, f32, |v| Value::Float(v as f64)),
        "FLOAT8" | "DOUBLE PRECISION" => decode!(row, index, f64, Value::Float),
        "NUMERIC" => decode!(row, index, Decimal, |d| Value::Numeric(d.to_string())),
        "BYTEA" => decode!(row, index, Vec<u8>, Value::Bytes),
        "DATE" => decode!(row, index, NaiveDate, |v| Value::String(v.to_string())),
        "TIME" => decode!(row, index, NaiveTime, |v| Value::String(v.to_string())),
        "TIMESTAMP" => decode!(row, index, NaiveDateTime, |v| Value::String(v.to_string())),
        "TIMESTAMPTZ" => decode!(row, index, DateTime<Utc>, |v| Value::String(v.to_string())),
        "JSON" | "JSONB" => decode!(row, index, JsonValue, |v| Value::String(v.to_string())),
        "UUID" => decode!(row, index, Uuid, |u| Value::String(u.to_string())),
        "BOOL[]" => decode!(row, index, Vec<Option<bool>>, Value::from),
        "INT2[]" => decode!(row, index, Vec<Option<i16>>, |v| {
            Value::from(v.into_iter().map(|x| x.map(i32::from)).collect::<Vec<_>>())
        }),
        "INT4[]" => decode!(row, index, Vec<Option<i32>>, Value::from),
        "INT8[]" => decode!(row, index, Vec<Option<i64>>, Value::from),
        "FLOAT8[]" => decode!(row, index, Vec<Option<f64>>, Value::from),
        "NUMERIC[]" => decode!(row, index, Vec<Option<Decimal>>, |v| {
            Value::from(
                v.into_iter()
                    .map(|d| d.map(|d| Value::Numeric(d.to_string())))
                    .collect::<Vec<_>>(),
            )
        }),
        "UUID[]" => decode!(row, index, Vec<Option<Uuid>>, |v| {
            Value::from(
                v.into_iter()
                    .map(|u| u.map(|u| u.to_string()))
                    .collect::<Vec<_>>(),
            )
        }),
        "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => {
            decode!(row, index, Vec<Option<String>>, Value::from)
        }
        _ => decode!(row, index, String, Value::String),
    };

    decoded.unwrap_or_else(|| Value::Opaque {
        type_name: type_upper,
        raw: raw.as_bytes().map(<[u8]>::to_vec).unwrap_or_default(),
    })
}
