//! Error types for Songlake
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use crate::model::Table;
use thiserror::Error;

/// The main error type for Songlake
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // ============================================================================
    // Storage Errors
    // ============================================================================
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Engine Errors
    // ============================================================================
    #[error("Query engine error: {0}")]
    Engine(#[from] datafusion::error::DataFusionError),

    // ============================================================================
    // Pipeline Errors
    // ============================================================================
    #[error("{stage} stage failed on '{target}': {source}")]
    Stage {
        stage: &'static str,
        target: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Attach stage/dataset context to a failure inside a pipeline stage
    pub fn stage(stage: &'static str, target: &'static str, source: Error) -> Self {
        Self::Stage {
            stage,
            target,
            source: Box::new(source),
        }
    }

    /// Attach stage context for a failure while persisting an output table
    pub fn table(table: Table, source: Error) -> Self {
        Self::stage(table.stage(), table.name(), source)
    }
}

/// Result type alias for Songlake
pub type Result<T> = std::result::Result<T, Error>;
