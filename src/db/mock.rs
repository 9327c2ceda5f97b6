//! Scripted query executor for testing.
//!
//! Returns predefined outcomes keyed by SQL text, and records every call.

use super::{ExecutionOutcome, QueryExecutor, Row};
use crate::error::{BenchError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// A mock executor that returns canned outcomes.
#[derive(Debug, Default)]
pub struct MockExecutor {
    outcomes: HashMap<String, ExecutionOutcome>,
    config_error: Option<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockExecutor {
    /// Creates a mock executor with no scripted statements.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts `sql` to return the given rows.
    pub fn with_rows(mut self, sql: impl Into<String>, rows: Vec<Row>) -> Self {
        self.outcomes.insert(sql.into(), ExecutionOutcome::Rows(rows));
        self
    }

    /// Scripts `sql` to fail with the given message.
    pub fn with_failure(mut self, sql: impl Into<String>, message: impl Into<String>) -> Self {
        self.outcomes
            .insert(sql.into(), ExecutionOutcome::failure(message));
        self
    }

    /// Makes every call fail with a configuration error.
    pub fn with_config_error(mut self, message: impl Into<String>) -> Self {
        self.config_error = Some(message.into());
        self
    }

    /// Returns the `(database, sql)` pairs executed so far, in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueryExecutor for MockExecutor {
    async fn execute(&self, database_name: &str, sql: &str) -> Result<ExecutionOutcome> {
        if let Some(msg) = &self.config_error {
            return Err(BenchError::config(msg.clone()));
        }

        if let Ok(mut calls) = self.calls.lock() {
            calls.push((database_name.to_string(), sql.to_string()));
        }

        // Unscripted statements behave like a reference to a missing relation.
        Ok(self.outcomes.get(sql).cloned().unwrap_or_else(|| {
            ExecutionOutcome::failure(format!(
                "error returned from database: syntax error or unknown relation in: {sql}"
            ))
        }))
    }
}
