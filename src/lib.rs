//! t2sql-bench - benchmark text-to-SQL generation endpoints.
//!
//! This library exposes the core modules for use in integration tests.

pub mod config;
pub mod dataset;
pub mod db;
pub mod error;
pub mod eval;
pub mod generator;
pub mod logging;
pub mod metadata;
pub mod persistence;
pub mod service;
