//! Summary statistics over evaluation results.

use crate::eval::classify::Outcome;
use crate::eval::result::EvaluationResult;
use serde::{Deserialize, Serialize};

/// Summary metrics for a job, recomputed from its results on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSummaryStats {
    pub total: usize,
    pub correct: usize,
    pub execution_error: usize,
    pub wrong_result: usize,
    pub accuracy_score: f64,
    pub valid_sql_rate: f64,
    pub avg_latency_ms: f64,
}

/// Reduces evaluation results to summary metrics.
///
/// Anything neither correct nor an execution error counts as a wrong result,
/// including instances where no SQL was generated. Average latency divides
/// the sum of recorded latencies by `total`, not by the number recorded.
pub fn aggregate(results: &[EvaluationResult]) -> JobSummaryStats {
    let total = results.len();
    let correct = results.iter().filter(|r| r.correct()).count();
    let execution_error = results
        .iter()
        .filter(|r| r.outcome == Outcome::ExecutionError)
        .count();
    let wrong_result = results
        .iter()
        .filter(|r| !r.correct() && r.outcome != Outcome::ExecutionError)
        .count();
    let total_latency: f64 = results.iter().filter_map(|r| r.latency_ms).sum();

    let ratio = |n: f64| if total > 0 { n / total as f64 } else { 0.0 };

    JobSummaryStats {
        total,
        correct,
        execution_error,
        wrong_result,
        accuracy_score: ratio(correct as f64),
        valid_sql_rate: ratio((total - execution_error) as f64),
        avg_latency_ms: ratio(total_latency),
    }
}
