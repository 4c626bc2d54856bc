//! # Medir
//!
//! Task-polymorphic inference benchmarking harness.
//!
//! Medir (Spanish: "to measure") drives machine-learning inference across
//! heterogeneous task types — classification, text generation, speech
//! recognition, translation, entity recognition, image synthesis — behind a
//! single measurement loop with consistent timing semantics. A dozen
//! structurally different model-calling conventions are reconciled behind
//! one strategy table, so every task reduces to the same stream of
//! per-iteration samples.
//!
//! ## Architecture
//!
//! - **Strategy table**: one [`engine::InvocationStrategy`] per task type,
//!   registered in an [`engine::StrategyRegistry`] — a single dispatch
//!   point for input construction, invocation and decoding.
//! - **Invocation plan**: per-run bound state (model handle, device,
//!   tokenizer/processor, prompt length) so only input data varies per
//!   iteration.
//! - **Sample iterator**: lazy measurement loop bounded by iteration count
//!   and/or a wall-clock deadline, checked strictly between iterations.
//! - **Aggregation**: latency, token-rate and audio real-time-factor
//!   metrics, failing loudly on degenerate input.
//!
//! ## Example
//!
//! ```
//! use medir::engine::{run, RunOptions};
//! use medir::mock_model::{DemoSource, MockModel};
//! use medir::TaskType;
//!
//! let model = MockModel::new();
//! let mut source = DemoSource::new(TaskType::Classification, 1, vec!["input".to_string()]);
//! let options = RunOptions::new(TaskType::Classification)
//!     .with_iterations(3)
//!     .with_input_names(vec!["input".to_string()]);
//!
//! let outcome = run(&model, &mut source, &options).unwrap();
//! assert_eq!(outcome.latencies.len(), 3);
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)] // usize -> f64 for metrics is acceptable
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::float_cmp)] // exact comparisons are deliberate in tests

pub mod device;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod mock_model;
pub mod model;
pub mod output;
pub mod report;
pub mod task;
pub mod tensor;

// Re-exports for convenience
pub use device::Device;
pub use error::{MedirError, Result};
pub use task::TaskType;
pub use tensor::Tensor;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
