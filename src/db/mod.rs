//! Query execution against benchmark databases.
//!
//! Provides a trait-based interface so the batch driver can run against the
//! real PostgreSQL executor or a scripted one in tests.

mod mock;
mod postgres;
mod types;

pub use mock::MockExecutor;
pub use postgres::PostgresExecutor;
pub use types::{ExecutionOutcome, Row, Value, ValueKey};

use crate::error::Result;
use async_trait::async_trait;

/// Executes single SQL statements against named benchmark databases.
///
/// Every call is independent: implementations open a fresh connection,
/// run exactly one statement, fetch all rows and release the connection
/// before returning.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Runs `sql` against `database_name`.
    ///
    /// Statement and connectivity failures are reported as
    /// `ExecutionOutcome::Failure`. Only a malformed base connection
    /// string is returned as an `Err`, since it affects every call.
    async fn execute(&self, database_name: &str, sql: &str) -> Result<ExecutionOutcome>;
}
