//! Benchmark job persistence.
//!
//! Jobs move strictly forward: `pending -> running -> completed | failed`.

use crate::error::{BenchError, Result};
use crate::eval::{aggregate, JobSummaryStats};
use crate::persistence::results;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;

/// Lifecycle state of a benchmark job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "running" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }

    /// Returns true if a job in this state may move to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }

    /// Returns true once the job can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A benchmark job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkJob {
    pub id: i64,
    pub endpoint_url: String,
    pub status: JobStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Raw database row for a job.
#[derive(Debug, Clone, FromRow)]
struct BenchmarkJobRow {
    id: i64,
    endpoint_url: String,
    status: String,
    created_at: String,
    updated_at: String,
}

impl From<BenchmarkJobRow> for BenchmarkJob {
    fn from(row: BenchmarkJobRow) -> Self {
        Self {
            id: row.id,
            endpoint_url: row.endpoint_url,
            status: JobStatus::from_str(&row.status),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A job together with statistics computed from its results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: BenchmarkJob,
    pub stats: JobSummaryStats,
}

/// Creates a new pending job.
pub async fn create_job(pool: &SqlitePool, endpoint_url: &str) -> Result<BenchmarkJob> {
    let result = sqlx::query("INSERT INTO benchmark_jobs (endpoint_url) VALUES (?)")
        .bind(endpoint_url)
        .execute(pool)
        .await
        .map_err(|e| BenchError::persistence(format!("Failed to create job: {e}")))?;

    let id = result.last_insert_rowid();
    get_job(pool, id)
        .await?
        .ok_or_else(|| BenchError::internal(format!("Job {id} vanished after insert")))
}

/// Gets a job by id.
pub async fn get_job(pool: &SqlitePool, id: i64) -> Result<Option<BenchmarkJob>> {
    let row: Option<BenchmarkJobRow> = sqlx::query_as(
        r#"
        SELECT id, endpoint_url, status, created_at, updated_at
        FROM benchmark_jobs
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| BenchError::persistence(format!("Failed to get job: {e}")))?;

    Ok(row.map(BenchmarkJob::from))
}

/// Lists all jobs, newest first.
pub async fn list_jobs(pool: &SqlitePool) -> Result<Vec<BenchmarkJob>> {
    let rows: Vec<BenchmarkJobRow> = sqlx::query_as(
        r#"
        SELECT id, endpoint_url, status, created_at, updated_at
        FROM benchmark_jobs
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| BenchError::persistence(format!("Failed to list jobs: {e}")))?;

    Ok(rows.into_iter().map(BenchmarkJob::from).collect())
}

/// Moves a job to `status`, refreshing its `updated_at`.
///
/// Backward or repeated transitions are rejected.
pub async fn set_job_status(pool: &SqlitePool, id: i64, status: JobStatus) -> Result<()> {
    let job = get_job(pool, id)
        .await?
        .ok_or_else(|| BenchError::persistence(format!("Job {id} not found")))?;

    if !job.status.can_transition_to(status) {
        return Err(BenchError::internal(format!(
            "Job {id} cannot move from {} to {}",
            job.status, status
        )));
    }

    sqlx::query(
        r#"
        UPDATE benchmark_jobs
        SET status = ?, updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
        WHERE id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| BenchError::persistence(format!("Failed to update job status: {e}")))?;

    Ok(())
}

/// Moves a job to `failed` along the regular lifecycle, passing through
/// `running` when it never started. Terminal jobs are left alone.
pub async fn mark_failed(pool: &SqlitePool, id: i64) -> Result<()> {
    let job = get_job(pool, id)
        .await?
        .ok_or_else(|| BenchError::persistence(format!("Job {id} not found")))?;
    if job.status.is_terminal() {
        return Ok(());
    }

    if job.status == JobStatus::Pending {
        set_job_status(pool, id, JobStatus::Running).await?;
    }
    set_job_status(pool, id, JobStatus::Failed).await
}

/// Deletes a job and all of its results. Returns false if it did not exist.
pub async fn delete_job(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM benchmark_jobs WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| BenchError::persistence(format!("Failed to delete job: {e}")))?;

    Ok(result.rows_affected() > 0)
}

/// Loads a job and aggregates its results.
pub async fn job_detail(pool: &SqlitePool, id: i64) -> Result<Option<JobDetail>> {
    let Some(job) = get_job(pool, id).await? else {
        return Ok(None);
    };

    let results = results::list_results(pool, id).await?;
    Ok(Some(JobDetail {
        job,
        stats: aggregate(&results),
    }))
}
