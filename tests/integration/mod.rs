//! Integration tests for t2sql-bench.

pub mod benchmark_test;
pub mod dataset_test;
pub mod executor_test;
pub mod job_store_test;
