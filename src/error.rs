//! Error handling for the visflow engine.
//!
//! This module defines the engine-wide error taxonomy and a Result alias.
//! Recoverable conditions (incompatible requests, mismatched domain trees,
//! databases with nothing to offer, cooperative aborts) are `Result` values;
//! graph-construction bugs (wiring a node to itself, out-of-range ids) are
//! programmer-contract violations and panic instead.

use thiserror::Error;

/// Main error type for engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Two data requests reference different meshes, timesteps, or lattices
    /// and cannot be merged.
    #[error("Incompatible request: {0}")]
    IncompatibleRequest(String),

    /// Multi-input streaming found domain trees whose shapes disagree.
    #[error("Structure mismatch: expected domains {expected}, found {found}")]
    StructureMismatch { expected: String, found: String },

    /// A database could not produce any data at all.
    #[error("No data: {0}")]
    NoData(String),

    /// Cooperative cancellation was requested mid-execution.
    #[error("Execution aborted")]
    Aborted,

    /// Errors surfaced by a fragment database.
    #[error("Database error: {0}")]
    Database(String),

    /// A filter needed a variable a fragment does not carry.
    #[error("Variable {variable:?} not available in domain {domain}")]
    UnknownVariable { variable: String, domain: usize },

    /// Errors related to configuration loading/saving.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EngineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
