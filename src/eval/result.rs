//! Per-instance evaluation records.

use crate::eval::classify::Outcome;
use serde::{Deserialize, Serialize};

/// Result of evaluating one benchmark instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub instance_id: String,
    pub database_name: String,
    pub question: String,
    /// SQL returned by the generator; absent when generation failed.
    pub generated_sql: Option<String>,
    pub expected_sql: Option<String>,
    pub is_correct: Option<bool>,
    /// Classification label; the source of truth for summary counts.
    pub outcome: Outcome,
    /// Newline-separated failure causes, each tagged with its side.
    pub error: Option<String>,
    /// Time spent in the remote generator call only.
    pub latency_ms: Option<f64>,
}

impl EvaluationResult {
    /// Returns true if the instance was judged correct.
    pub fn correct(&self) -> bool {
        self.is_correct == Some(true)
    }
}
