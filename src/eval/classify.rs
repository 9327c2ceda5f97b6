//! Outcome classification.
//!
//! Labels an evaluated instance from structured execution outcomes. Failures
//! carry the side that produced them, so the label never depends on the
//! wording of an error message.

use crate::db::ExecutionOutcome;
use crate::eval::compare::compare;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which statement an execution failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Generated,
    GroundTruth,
}

impl Side {
    /// Marker prefixed to the failure message in the stored error text.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Generated => "Generated SQL Error",
            Self::GroundTruth => "Ground Truth Error",
        }
    }
}

/// An execution failure tagged with its side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFailure {
    pub side: Side,
    pub message: String,
}

impl ExecutionFailure {
    /// Tags the failure of `outcome`, if any, with `side`.
    pub fn from_outcome(side: Side, outcome: &ExecutionOutcome) -> Option<Self> {
        outcome.error().map(|message| Self {
            side,
            message: message.to_string(),
        })
    }
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.side.marker(), self.message)
    }
}

/// Classification label of one evaluated instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Both statements ran and the result sets are equivalent.
    Correct,
    /// The generated statement failed to run.
    ExecutionError,
    /// Anything else, including instances where no SQL was generated and
    /// instances whose ground truth failed while the generated SQL ran.
    WrongResult,
}

impl Outcome {
    /// Returns the label as stored in the job store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::ExecutionError => "execution_error",
            Self::WrongResult => "wrong_result",
        }
    }

    /// Parses a stored label; unknown labels count as wrong results.
    pub fn parse(s: &str) -> Self {
        match s {
            "correct" => Self::Correct,
            "execution_error" => Self::ExecutionError,
            _ => Self::WrongResult,
        }
    }

    /// Returns true for the `Correct` label.
    pub fn is_correct(&self) -> bool {
        matches!(self, Self::Correct)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels an instance from its execution outcomes.
///
/// `generated` is `None` when no SQL was produced or nothing was executed.
/// A failing ground truth alone never yields `ExecutionError`.
pub fn classify(
    generated: Option<&ExecutionOutcome>,
    expected: Option<&ExecutionOutcome>,
) -> Outcome {
    match (generated, expected) {
        (Some(ExecutionOutcome::Failure(_)), _) => Outcome::ExecutionError,
        (Some(ExecutionOutcome::Rows(actual)), Some(ExecutionOutcome::Rows(expected)))
            if compare(Some(expected.as_slice()), Some(actual.as_slice())) =>
        {
            Outcome::Correct
        }
        _ => Outcome::WrongResult,
    }
}

/// Joins a prior error and tagged failures into the stored error text.
///
/// Each cause goes on its own line so a reader can tell which side failed.
pub fn render_error(prior: Option<String>, failures: &[ExecutionFailure]) -> Option<String> {
    let lines: Vec<String> = prior
        .into_iter()
        .chain(failures.iter().map(ToString::to_string))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
