//! Command-line argument parsing for t2sql-bench.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use t2sql_bench::config::Config;

/// Benchmark text-to-SQL generation endpoints against ground-truth queries.
#[derive(Parser, Debug)]
#[command(name = "t2sql-bench")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", env = "T2SQL_BENCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run a benchmark job against one or more generator endpoints and wait for it
    Run {
        /// Generator endpoint URL (repeat to benchmark several endpoints concurrently)
        #[arg(long = "endpoint", value_name = "URL", required = true)]
        endpoints: Vec<String>,
    },

    /// List benchmark jobs, newest first
    Jobs,

    /// Show a job's status and summary statistics
    Show {
        #[arg(value_name = "JOB_ID")]
        job_id: i64,

        /// Also list per-instance results
        #[arg(long)]
        results: bool,
    },

    /// Delete a job and its results
    Delete {
        #[arg(value_name = "JOB_ID")]
        job_id: i64,
    },

    /// Evaluate a SQL statement against one instance's ground truth
    Evaluate {
        /// Benchmark instance id
        #[arg(long = "instance", value_name = "ID")]
        instance_id: String,

        /// SQL to evaluate
        #[arg(long, value_name = "SQL")]
        sql: String,
    },

    /// List benchmark databases with metadata
    Databases,

    /// Show schema, column meanings and knowledge base of a database
    Metadata {
        #[arg(value_name = "NAME")]
        database: String,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path, using the default if not specified.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }
}
