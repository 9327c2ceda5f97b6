//! Error types for t2sql-bench.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for benchmark operations.
#[derive(Error, Debug)]
pub enum BenchError {
    /// Configuration errors (malformed base connection string, bad config file, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote generator errors (client construction, transport failures, etc.)
    #[error("Generator error: {0}")]
    Generator(String),

    /// Dataset loading errors (unreadable file, malformed JSONL, etc.)
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Database metadata loading errors.
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Job store errors.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The requested benchmark instance does not exist or is incomplete.
    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    /// The ground-truth SQL of an instance could not be executed.
    #[error("Ground truth execution error: {0}")]
    GroundTruthQuery(String),

    /// Internal application errors (unexpected states, task panics, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BenchError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a generator error with the given message.
    pub fn generator(msg: impl Into<String>) -> Self {
        Self::Generator(msg.into())
    }

    /// Creates a dataset error with the given message.
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    /// Creates a metadata error with the given message.
    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    /// Creates a persistence error with the given message.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Creates an instance-not-found error with the given message.
    pub fn instance_not_found(msg: impl Into<String>) -> Self {
        Self::InstanceNotFound(msg.into())
    }

    /// Creates a ground-truth execution error with the given message.
    pub fn ground_truth(msg: impl Into<String>) -> Self {
        Self::GroundTruthQuery(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Generator(_) => "Generator Error",
            Self::Dataset(_) => "Dataset Error",
            Self::Metadata(_) => "Metadata Error",
            Self::Persistence(_) => "Persistence Error",
            Self::InstanceNotFound(_) => "Not Found",
            Self::GroundTruthQuery(_) => "Ground Truth Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using BenchError.
pub type Result<T> = std::result::Result<T, BenchError>;
