//! Single-instance evaluation of caller-supplied SQL.

use crate::dataset::{find_instance, BenchmarkInstance};
use crate::db::{ExecutionOutcome, QueryExecutor};
use crate::error::{BenchError, Result};
use crate::eval::classify::{classify, render_error, ExecutionFailure, Side};
use crate::eval::result::EvaluationResult;
use crate::eval::stats::aggregate;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Stats for one manually evaluated statement. `total` is always 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualEvaluation {
    pub total: usize,
    pub correct: usize,
    pub execution_error: usize,
    pub wrong_result: usize,
    pub accuracy_score: f64,
    pub valid_sql_rate: f64,
    pub is_correct: bool,
    pub error: Option<String>,
}

/// Evaluates `generated_sql` against the ground truth of `instance_id`.
///
/// Unlike the batch path, a ground truth that cannot run is returned as
/// `GroundTruthQuery` instead of being folded into the verdict.
pub async fn manual_evaluate(
    executor: &dyn QueryExecutor,
    instances: &[BenchmarkInstance],
    instance_id: &str,
    generated_sql: &str,
) -> Result<ManualEvaluation> {
    let instance = find_instance(instances, instance_id).ok_or_else(|| {
        BenchError::instance_not_found(format!("Instance {instance_id} not found in dataset"))
    })?;

    if !instance.is_evaluable() {
        return Err(BenchError::instance_not_found(format!(
            "Instance {instance_id} has no target database or ground truth SQL"
        )));
    }
    let expected_sql = instance.ground_truth_sql.as_deref().unwrap_or_default();

    let expected = executor
        .execute(&instance.database_name, expected_sql)
        .await?;
    if let ExecutionOutcome::Failure(msg) = &expected {
        return Err(BenchError::ground_truth(msg.clone()));
    }

    let generated = executor
        .execute(&instance.database_name, generated_sql)
        .await?;
    let outcome = classify(Some(&generated), Some(&expected));
    let failures: Vec<ExecutionFailure> =
        ExecutionFailure::from_outcome(Side::Generated, &generated)
            .into_iter()
            .collect();

    info!(instance = %instance_id, outcome = %outcome, "Manual evaluation finished");

    let result = EvaluationResult {
        instance_id: instance.instance_id.clone(),
        database_name: instance.database_name.clone(),
        question: instance.question.clone(),
        generated_sql: Some(generated_sql.to_string()),
        expected_sql: Some(expected_sql.to_string()),
        is_correct: Some(outcome.is_correct()),
        outcome,
        error: render_error(None, &failures),
        latency_ms: None,
    };
    let stats = aggregate(std::slice::from_ref(&result));

    Ok(ManualEvaluation {
        total: stats.total,
        correct: stats.correct,
        execution_error: stats.execution_error,
        wrong_result: stats.wrong_result,
        accuracy_score: stats.accuracy_score,
        valid_sql_rate: stats.valid_sql_rate,
        is_correct: result.correct(),
        error: result.error,
    })
}
