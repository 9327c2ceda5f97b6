//! Evaluation engine: result comparison, outcome classification, the batch
//! driver and summary statistics.

pub mod classify;
pub mod compare;
mod driver;
mod manual;
mod result;
mod stats;

pub use classify::{classify, render_error, ExecutionFailure, Outcome, Side};
pub use compare::{compare, compare_detailed, CompareStrategy, Comparison};
pub use driver::{BatchDriver, JobRecorder, ResultSink};
pub use manual::{manual_evaluate, ManualEvaluation};
pub use result::EvaluationResult;
pub use stats::{aggregate, JobSummaryStats};
