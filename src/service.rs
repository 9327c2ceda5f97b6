//! Benchmark job service.
//!
//! Ties the job store, dataset, executor and generators together. Each job
//! runs as its own background task; jobs share nothing but the job store.

use crate::config::Config;
use crate::dataset::{DatasetProvider, JsonlDataset};
use crate::db::{PostgresExecutor, QueryExecutor};
use crate::error::{BenchError, Result};
use crate::eval::{self, BatchDriver, EvaluationResult, JobRecorder, ManualEvaluation};
use crate::generator::{HttpGenerator, SqlGenerator};
use crate::persistence::{jobs, results, BenchmarkJob, JobDetail, JobStatus, StateDb};
use futures::FutureExt;
use sqlx::sqlite::SqlitePool;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Handle to a job started in the background.
pub type JobHandle = JoinHandle<Result<JobStatus>>;

/// Entry point for running and inspecting benchmark jobs.
#[derive(Clone)]
pub struct BenchmarkService {
    config: Arc<Config>,
    state: StateDb,
    executor: Arc<dyn QueryExecutor>,
    dataset: Arc<dyn DatasetProvider>,
}

impl BenchmarkService {
    pub fn new(
        config: Arc<Config>,
        state: StateDb,
        executor: Arc<dyn QueryExecutor>,
        dataset: Arc<dyn DatasetProvider>,
    ) -> Self {
        Self {
            config,
            state,
            executor,
            dataset,
        }
    }

    /// Builds a service backed by PostgreSQL and the configured JSONL files.
    pub fn from_config(config: Arc<Config>, state: StateDb) -> Self {
        let executor = Arc::new(PostgresExecutor::new(config.clone()));
        let dataset = Arc::new(JsonlDataset::new(
            &config.input_file,
            &config.ground_truth_file,
        ));
        Self::new(config, state, executor, dataset)
    }

    pub fn state(&self) -> &StateDb {
        &self.state
    }

    /// Creates a job for `endpoint_url` and starts it in the background.
    ///
    /// The HTTP client is built inside the job, so a client that cannot be
    /// constructed fails the job rather than this call.
    pub async fn start_job(&self, endpoint_url: &str) -> Result<(i64, JobHandle)> {
        let endpoint = endpoint_url.to_string();
        let timeout = self.config.generator_timeout();
        self.spawn_job(endpoint_url, move || {
            let generator: Arc<dyn SqlGenerator> = Arc::new(HttpGenerator::new(endpoint, timeout)?);
            Ok(generator)
        })
        .await
    }

    /// Like [`start_job`](Self::start_job) with a caller-supplied generator.
    pub async fn start_job_with_generator(
        &self,
        endpoint_url: &str,
        generator: Arc<dyn SqlGenerator>,
    ) -> Result<(i64, JobHandle)> {
        self.spawn_job(endpoint_url, move || Ok(generator)).await
    }

    async fn spawn_job<F>(&self, endpoint_url: &str, make_generator: F) -> Result<(i64, JobHandle)>
    where
        F: FnOnce() -> Result<Arc<dyn SqlGenerator>> + Send + 'static,
    {
        let job = jobs::create_job(self.state.pool(), endpoint_url).await?;
        info!(job = job.id, endpoint = %endpoint_url, "Benchmark job created");

        let job_id = job.id;
        let pool = self.state.pool().clone();
        let executor = self.executor.clone();
        let dataset = self.dataset.clone();

        let recorder = JobRecorder::new(pool.clone(), job_id);
        let body = async move {
            let generator = make_generator()?;
            let instances = dataset.load()?;
            BatchDriver::new(executor, generator)
                .run(&instances, &recorder)
                .await
        };
        let handle = tokio::spawn(async move { run_job(&pool, job_id, body).await });

        Ok((job_id, handle))
    }

    pub async fn list_jobs(&self) -> Result<Vec<BenchmarkJob>> {
        jobs::list_jobs(self.state.pool()).await
    }

    pub async fn job_detail(&self, job_id: i64) -> Result<Option<JobDetail>> {
        jobs::job_detail(self.state.pool(), job_id).await
    }

    pub async fn job_results(&self, job_id: i64) -> Result<Vec<EvaluationResult>> {
        results::list_results(self.state.pool(), job_id).await
    }

    pub async fn delete_job(&self, job_id: i64) -> Result<bool> {
        let deleted = jobs::delete_job(self.state.pool(), job_id).await?;
        if !deleted {
            warn!(job = job_id, "Delete requested for unknown job");
        }
        Ok(deleted)
    }

    /// Evaluates caller-supplied SQL against one instance's ground truth.
    pub async fn manual_evaluate(
        &self,
        instance_id: &str,
        generated_sql: &str,
    ) -> Result<ManualEvaluation> {
        let instances = self.dataset.load()?;
        eval::manual_evaluate(self.executor.as_ref(), &instances, instance_id, generated_sql).await
    }
}

/// Drives one job through its lifecycle around `body`.
///
/// Any status update that cannot be written leaves the job `failed` when
/// the store still accepts writes.
async fn run_job<F>(pool: &SqlitePool, job_id: i64, body: F) -> Result<JobStatus>
where
    F: Future<Output = Result<usize>>,
{
    if let Err(e) = jobs::set_job_status(pool, job_id, JobStatus::Running).await {
        error!(job = job_id, "Could not start benchmark job: {e}");
        abandon(pool, job_id).await;
        return Err(e);
    }

    let outcome = match AssertUnwindSafe(body).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(_) => Err(BenchError::internal("benchmark task panicked")),
    };

    let status = match outcome {
        Ok(count) => {
            info!(job = job_id, "Benchmark job completed ({count} instances)");
            JobStatus::Completed
        }
        Err(e) => {
            error!(job = job_id, "Benchmark job failed: {e}");
            JobStatus::Failed
        }
    };

    if let Err(e) = jobs::set_job_status(pool, job_id, status).await {
        error!(job = job_id, "Could not record final status {status}: {e}");
        abandon(pool, job_id).await;
        return Err(e);
    }
    Ok(status)
}

async fn abandon(pool: &SqlitePool, job_id: i64) {
    if let Err(e) = jobs::mark_failed(pool, job_id).await {
        warn!(job = job_id, "Could not mark job failed: {e}");
    }
}
