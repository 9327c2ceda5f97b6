//! Per-instance result persistence.

use crate::error::{BenchError, Result};
use crate::eval::{EvaluationResult, Outcome};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;

/// Raw database row for a result.
#[derive(Debug, Clone, FromRow)]
struct ResultRow {
    instance_id: String,
    database_name: String,
    question: String,
    generated_sql: Option<String>,
    expected_sql: Option<String>,
    is_correct: Option<bool>,
    outcome: String,
    error: Option<String>,
    latency_ms: Option<f64>,
}

impl From<ResultRow> for EvaluationResult {
    fn from(row: ResultRow) -> Self {
        Self {
            instance_id: row.instance_id,
            database_name: row.database_name,
            question: row.question,
            generated_sql: row.generated_sql,
            expected_sql: row.expected_sql,
            is_correct: row.is_correct,
            outcome: Outcome::parse(&row.outcome),
            error: row.error,
            latency_ms: row.latency_ms,
        }
    }
}

/// Appends one result to a job. Returns the new row id.
pub async fn record_result(
    pool: &SqlitePool,
    job_id: i64,
    result: &EvaluationResult,
) -> Result<i64> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO benchmark_results
        (job_id, instance_id, database_name, question, generated_sql, expected_sql,
         is_correct, outcome, error, latency_ms)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(job_id)
    .bind(&result.instance_id)
    .bind(&result.database_name)
    .bind(&result.question)
    .bind(&result.generated_sql)
    .bind(&result.expected_sql)
    .bind(result.is_correct)
    .bind(result.outcome.as_str())
    .bind(&result.error)
    .bind(result.latency_ms)
    .execute(pool)
    .await
    .map_err(|e| BenchError::persistence(format!("Failed to record result: {e}")))?;

    Ok(inserted.last_insert_rowid())
}

/// Lists a job's results in the order they were recorded.
pub async fn list_results(pool: &SqlitePool, job_id: i64) -> Result<Vec<EvaluationResult>> {
    let rows: Vec<ResultRow> = sqlx::query_as(
        r#"
        SELECT instance_id, database_name, question, generated_sql, expected_sql,
               is_correct, outcome, error, latency_ms
        FROM benchmark_results
        WHERE job_id = ?
        ORDER BY id
        "#,
    )
    .bind(job_id)
    .fetch_all(pool)
    .await
    .map_err(|e| BenchError::persistence(format!("Failed to list results: {e}")))?;

    Ok(rows.into_iter().map(EvaluationResult::from).collect())
}
