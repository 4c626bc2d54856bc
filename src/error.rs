//! Error types for the benchmarking harness
//!
//! One crate-wide error enum with structured context:
//! - `UnsupportedTask` — dispatch on a task type with no registered strategy
//! - `InvalidConfiguration` — rejected eagerly, before expensive work starts
//! - `IterationFailure` — a single iteration failed; the run is aborted
//! - `InsufficientData` — aggregation over an empty or degenerate sample set
//!
//! Nothing is recovered locally: a benchmark run either completes with a
//! full, internally consistent sample set or fails entirely.

use thiserror::Error;

/// Result type alias using [`MedirError`]
pub type Result<T> = std::result::Result<T, MedirError>;

/// Errors produced by the benchmarking harness
#[derive(Debug, Error)]
pub enum MedirError {
    /// Task type not recognized at a dispatch point
    #[error("unsupported task '{task}' at {stage} dispatch")]
    UnsupportedTask {
        /// Canonical task string
        task: String,
        /// Dispatch stage that rejected the task
        stage: &'static str,
    },

    /// Model entry point not implemented by the active backend
    #[error("unsupported operation '{operation}': {reason}")]
    UnsupportedOperation {
        /// Entry point name
        operation: String,
        /// Why the operation is unavailable
        reason: String,
    },

    /// Configuration rejected before the run starts
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A single benchmark iteration failed
    ///
    /// Never retried; a failing iteration would bias throughput statistics
    /// if silently dropped, so the whole run is aborted with the original
    /// cause preserved.
    #[error("iteration {iteration} failed")]
    IterationFailure {
        /// Zero-based iteration index
        iteration: usize,
        /// Original cause
        #[source]
        source: Box<MedirError>,
    },

    /// Aggregation attempted on an empty or degenerate sample sequence
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Tensor shape rejected at construction
    #[error("invalid shape: {reason}")]
    InvalidShape {
        /// Why the shape is invalid
        reason: String,
    },

    /// Data length does not match the declared shape
    #[error("data size {data_size} does not match shape {shape:?} (expected {expected})")]
    DataShapeMismatch {
        /// Number of elements provided
        data_size: usize,
        /// Declared shape
        shape: Vec<usize>,
        /// Expected element count
        expected: usize,
    },

    /// Report serialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Report file could not be written
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
