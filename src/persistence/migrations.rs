//! Schema versioning and migrations for the job store.
//!
//! Manages database schema evolution with forward-only migrations.

use crate::error::{BenchError, Result};
use sqlx::sqlite::SqlitePool;
use tracing::info;

const CURRENT_VERSION: i32 = 1;

/// Runs all pending migrations on the database.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    ensure_schema_versions_table(pool).await?;

    let current = get_current_version(pool).await?;

    if current > CURRENT_VERSION {
        return Err(BenchError::persistence(format!(
            "Database schema version ({}) is newer than supported version ({}). \
             Please upgrade t2sql-bench to the latest version.",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        info!(
            "Migrating job store from version {} to {}",
            current, CURRENT_VERSION
        );
        for version in (current + 1)..=CURRENT_VERSION {
            run_migration(pool, version).await?;
            record_version(pool, version).await?;
            info!("Applied migration v{}", version);
        }
    }

    Ok(())
}

/// Ensures the schema_versions table exists.
async fn ensure_schema_versions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_versions (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        BenchError::persistence(format!("Failed to create schema_versions table: {e}"))
    })?;

    Ok(())
}

/// Gets the current schema version.
async fn get_current_version(pool: &SqlitePool) -> Result<i32> {
    let row: Option<(Option<i32>,)> = sqlx::query_as("SELECT MAX(version) FROM schema_versions")
        .fetch_optional(pool)
        .await
        .map_err(|e| BenchError::persistence(format!("Failed to get schema version: {e}")))?;

    Ok(row.and_then(|(v,)| v).unwrap_or(0))
}

/// Records a completed migration version.
async fn record_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_versions (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await
        .map_err(|e| BenchError::persistence(format!("Failed to record migration: {e}")))?;
    Ok(())
}

/// Runs a specific migration version.
async fn run_migration(pool: &SqlitePool, version: i32) -> Result<()> {
    match version {
        1 => migration_v1(pool).await,
        _ => Err(BenchError::persistence(format!(
            "Unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: jobs and per-instance results.
async fn migration_v1(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS benchmark_jobs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            endpoint_url TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'running', 'completed', 'failed')),
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| BenchError::persistence(format!("Failed to create benchmark_jobs table: {e}")))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS benchmark_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id INTEGER NOT NULL,
            instance_id TEXT NOT NULL,
            database_name TEXT NOT NULL,
            question TEXT NOT NULL,
            generated_sql TEXT,
            expected_sql TEXT,
            is_correct INTEGER,
            outcome TEXT NOT NULL
                CHECK (outcome IN ('correct', 'execution_error', 'wrong_result')),
            error TEXT,
            latency_ms REAL,
            FOREIGN KEY (job_id) REFERENCES benchmark_jobs(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        BenchError::persistence(format!("Failed to create benchmark_results table: {e}"))
    })?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_benchmark_results_job
        ON benchmark_results(job_id)
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| BenchError::persistence(format!("Failed to create results index: {e}")))?;

    Ok(())
}
