//! Batch evaluation driver.
//!
//! Evaluates instances strictly in dataset order, one at a time. Each result
//! is handed to a [`ResultSink`] before the next instance starts, so a run
//! that dies partway leaves every finished instance recorded.

use crate::dataset::BenchmarkInstance;
use crate::db::QueryExecutor;
use crate::error::{BenchError, Result};
use crate::eval::classify::{classify, render_error, ExecutionFailure, Outcome, Side};
use crate::eval::result::EvaluationResult;
use crate::generator::{GenerateRequest, SqlGenerator};
use crate::persistence::results;
use async_trait::async_trait;
use futures::FutureExt;
use sqlx::sqlite::SqlitePool;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Destination for results as they are produced.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn record(&self, result: &EvaluationResult) -> Result<()>;
}

/// Sink appending results to a job in the job store.
#[derive(Debug, Clone)]
pub struct JobRecorder {
    pool: SqlitePool,
    job_id: i64,
}

impl JobRecorder {
    pub fn new(pool: SqlitePool, job_id: i64) -> Self {
        Self { pool, job_id }
    }
}

#[async_trait]
impl ResultSink for JobRecorder {
    async fn record(&self, result: &EvaluationResult) -> Result<()> {
        results::record_result(&self.pool, self.job_id, result).await?;
        Ok(())
    }
}

/// In-memory sink, mostly useful for tests and dry runs.
#[async_trait]
impl ResultSink for Mutex<Vec<EvaluationResult>> {
    async fn record(&self, result: &EvaluationResult) -> Result<()> {
        self.lock()
            .map_err(|_| BenchError::internal("Result buffer lock poisoned"))?
            .push(result.clone());
        Ok(())
    }
}

/// Runs benchmark instances through a generator and an executor.
#[derive(Clone)]
pub struct BatchDriver {
    executor: Arc<dyn QueryExecutor>,
    generator: Arc<dyn SqlGenerator>,
}

impl BatchDriver {
    pub fn new(executor: Arc<dyn QueryExecutor>, generator: Arc<dyn SqlGenerator>) -> Self {
        Self {
            executor,
            generator,
        }
    }

    /// Evaluates every instance in order and records each result.
    ///
    /// Failures confined to one instance are recorded on that instance and
    /// the run continues. Configuration errors and sink failures abort the
    /// run; results recorded before that point stay recorded.
    pub async fn run(&self, instances: &[BenchmarkInstance], sink: &dyn ResultSink) -> Result<usize> {
        let total = instances.len();
        info!("Evaluating {} instances", total);

        for (index, instance) in instances.iter().enumerate() {
            let result = self.evaluate_guarded(instance).await?;

            debug!(
                instance = %result.instance_id,
                outcome = %result.outcome,
                "[{}/{}] evaluated",
                index + 1,
                total
            );
            sink.record(&result).await?;
        }

        Ok(total)
    }

    /// Evaluates a single instance.
    ///
    /// Generator and execution failures end up on the result. Only
    /// configuration errors from the executor are returned as `Err`.
    pub async fn evaluate_instance(&self, instance: &BenchmarkInstance) -> Result<EvaluationResult> {
        let generation = self.generate(instance).await;
        let (outcome, failures) = self.check(instance, generation.sql.as_deref()).await?;
        Ok(finish(instance, generation, outcome, failures))
    }

    /// Like [`evaluate_instance`](Self::evaluate_instance), but a panic or a
    /// non-configuration error still yields a result carrying whatever the
    /// generator produced.
    async fn evaluate_guarded(&self, instance: &BenchmarkInstance) -> Result<EvaluationResult> {
        let generation = match AssertUnwindSafe(self.generate(instance)).catch_unwind().await {
            Ok(generation) => generation,
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                warn!(instance = %instance.instance_id, "Generation panicked: {msg}");
                return Ok(degraded_result(
                    instance,
                    Generation::default(),
                    format!("Internal error: {msg}"),
                ));
            }
        };

        let checked = AssertUnwindSafe(self.check(instance, generation.sql.as_deref()))
            .catch_unwind()
            .await;

        match checked {
            Ok(Ok((outcome, failures))) => Ok(finish(instance, generation, outcome, failures)),
            Ok(Err(e @ BenchError::Config(_))) => Err(e),
            Ok(Err(e)) => {
                warn!(instance = %instance.instance_id, "Instance evaluation failed: {e}");
                Ok(degraded_result(instance, generation, e.to_string()))
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                warn!(instance = %instance.instance_id, "Instance evaluation panicked: {msg}");
                Ok(degraded_result(
                    instance,
                    generation,
                    format!("Internal error: {msg}"),
                ))
            }
        }
    }

    /// Asks the generator for SQL, timing only the generator call.
    async fn generate(&self, instance: &BenchmarkInstance) -> Generation {
        let request = GenerateRequest::new(&instance.database_name, &instance.question);

        let started = Instant::now();
        let generated = self.generator.generate(&request).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        match generated {
            Ok(sql) => Generation {
                sql: Some(sql),
                error: None,
                latency_ms: Some(latency_ms),
            },
            Err(e) => {
                warn!(instance = %instance.instance_id, "Generator call failed: {e}");
                Generation {
                    sql: None,
                    error: Some(e.to_string()),
                    latency_ms: Some(latency_ms),
                }
            }
        }
    }

    /// Runs ground truth then generated SQL and classifies the pair.
    ///
    /// Nothing runs unless both statements are present and non-empty.
    async fn check(
        &self,
        instance: &BenchmarkInstance,
        generated_sql: Option<&str>,
    ) -> Result<(Outcome, Vec<ExecutionFailure>)> {
        let runnable = generated_sql.filter(|sql| !sql.is_empty());
        let expected = instance
            .ground_truth_sql
            .as_deref()
            .filter(|sql| !sql.is_empty());

        let (Some(generated), Some(expected)) = (runnable, expected) else {
            return Ok((Outcome::WrongResult, Vec::new()));
        };

        let expected_outcome = self
            .executor
            .execute(&instance.database_name, expected)
            .await?;
        let generated_outcome = self
            .executor
            .execute(&instance.database_name, generated)
            .await?;

        let failures: Vec<ExecutionFailure> = [
            ExecutionFailure::from_outcome(Side::GroundTruth, &expected_outcome),
            ExecutionFailure::from_outcome(Side::Generated, &generated_outcome),
        ]
        .into_iter()
        .flatten()
        .collect();

        Ok((
            classify(Some(&generated_outcome), Some(&expected_outcome)),
            failures,
        ))
    }
}

/// What the generator returned for one instance.
#[derive(Debug, Default)]
struct Generation {
    sql: Option<String>,
    error: Option<String>,
    latency_ms: Option<f64>,
}

fn finish(
    instance: &BenchmarkInstance,
    generation: Generation,
    outcome: Outcome,
    failures: Vec<ExecutionFailure>,
) -> EvaluationResult {
    EvaluationResult {
        instance_id: instance.instance_id.clone(),
        database_name: instance.database_name.clone(),
        question: instance.question.clone(),
        generated_sql: generation.sql,
        expected_sql: instance.ground_truth_sql.clone(),
        is_correct: Some(outcome.is_correct()),
        outcome,
        error: render_error(generation.error, &failures),
        latency_ms: generation.latency_ms,
    }
}

/// Result recorded for an instance whose evaluation did not finish.
fn degraded_result(
    instance: &BenchmarkInstance,
    generation: Generation,
    error: String,
) -> EvaluationResult {
    let error = match generation.error {
        Some(generator_error) => format!("{generator_error}\n{error}"),
        None => error,
    };

    EvaluationResult {
        instance_id: instance.instance_id.clone(),
        database_name: instance.database_name.clone(),
        question: instance.question.clone(),
        generated_sql: generation.sql,
        expected_sql: instance.ground_truth_sql.clone(),
        is_correct: Some(false),
        outcome: Outcome::WrongResult,
        error: Some(error),
        latency_ms: generation.latency_ms,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "evaluation panicked".to_string()
    }
}
