//! Benchmark execution engine
//!
//! Given a model handle and a declared task type, the engine selects the
//! matching invocation strategy from a single registry lookup, runs it once
//! or repeatedly under an iteration and/or wall-clock budget, and reduces
//! every task type to the same stream of per-iteration samples.
//!
//! Execution is single-threaded and synchronous: one inference call at a
//! time, no overlap between iterations, no cancellation mid-iteration.

mod batch;
mod looping;
mod plan;
mod strategy;
mod timer;
mod tokens;

pub use batch::{AudioClip, InputBatch, SliceSource};
pub use looping::{Sample, SampleIterator};
pub use plan::InvocationPlan;
pub use strategy::{
    Decoded, InvocationStrategy, PreparedInput, RawOutput, StrategyRegistry, FILLER_TOKEN,
    MAX_TEXT_LEN,
};
pub use timer::time_invocation;
pub use tokens::generated_token_counts;

use std::time::{Duration, Instant};

use log::info;
use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::error::{MedirError, Result};
use crate::model::ModelBackend;
use crate::task::TaskType;

/// Per-run execution options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Active task type
    pub task: TaskType,
    /// Iteration budget; 1 = single shot, 0 = bounded by duration only
    pub iterations: usize,
    /// Wall-clock budget; zero means unbounded by time
    pub duration: Duration,
    /// Inference-only execution hint passed to the backend
    pub inference_mode: bool,
    /// Target device
    pub device: Device,
    /// Declared input tensor names, in call order
    pub input_names: Vec<String>,
}

impl RunOptions {
    /// Options for a single-shot run of `task` on the CPU
    #[must_use]
    pub fn new(task: TaskType) -> Self {
        Self {
            task,
            iterations: 1,
            duration: Duration::ZERO,
            inference_mode: true,
            device: Device::Cpu,
            input_names: Vec::new(),
        }
    }

    /// Set the iteration budget
    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the wall-clock budget
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the target device
    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Set the declared input tensor names
    #[must_use]
    pub fn with_input_names(mut self, input_names: Vec<String>) -> Self {
        self.input_names = input_names;
        self
    }

    /// Set the inference-mode hint
    #[must_use]
    pub fn with_inference_mode(mut self, inference_mode: bool) -> Self {
        self.inference_mode = inference_mode;
        self
    }

    /// Validate the options before any expensive work starts
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if both the iteration count and the
    /// duration are zero (the run would never terminate).
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 && self.duration.is_zero() {
            return Err(MedirError::InvalidConfiguration(
                "an iteration count of 0 requires a nonzero duration".to_string(),
            ));
        }
        Ok(())
    }
}

/// Aggregate result of one benchmark run
///
/// Constructed fresh per run, consumed once by metric computation and/or
/// display, then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchOutcome {
    /// Raw model output of the last iteration, retained for display only
    pub output: Option<RawOutput>,
    /// Per-iteration latencies in seconds, in iteration order
    pub latencies: Vec<f64>,
    /// Flattened generated-token counts
    pub token_counts: Vec<usize>,
    /// Flattened audio lengths in waveform samples
    pub audio_lengths: Vec<f64>,
    /// Shared audio sample rate, if the task consumed audio
    pub sample_rate: Option<u32>,
}

/// Execute a benchmark run with the built-in strategy table
///
/// # Errors
///
/// Fails with `UnsupportedTask` for a task with no strategy,
/// `InvalidConfiguration` for rejected options, or `IterationFailure`
/// wrapping the first error raised inside the measurement loop.
pub fn run(
    model: &dyn ModelBackend,
    source: &mut dyn SliceSource,
    options: &RunOptions,
) -> Result<BenchOutcome> {
    let registry = StrategyRegistry::new();
    run_with_registry(model, source, options, &registry)
}

/// Execute a benchmark run against a caller-supplied strategy table
///
/// # Errors
///
/// Same failure modes as [`run`].
pub fn run_with_registry(
    model: &dyn ModelBackend,
    source: &mut dyn SliceSource,
    options: &RunOptions,
    registry: &StrategyRegistry,
) -> Result<BenchOutcome> {
    options.validate()?;
    // Single dispatch point: an unrecognized task fails here, before any
    // input is drawn or any model call is attempted.
    let strategy = registry.get(options.task)?;
    let mut plan = plan::build_plan(model, source, options)?;

    info!(
        "starting inference on {} (max {} iterations, {:.1}s budget)",
        options.device,
        options.iterations,
        options.duration.as_secs_f64()
    );

    if options.iterations == 1 {
        single_shot(&mut plan, strategy, source)
    } else {
        looped(&plan, strategy, source, options)
    }
}

/// Acquire the next input: the input prepared at planning time if one is
/// pending, otherwise a fresh slice from the source
fn acquire_input(
    plan: &mut InvocationPlan<'_>,
    strategy: &dyn InvocationStrategy,
    source: &mut dyn SliceSource,
) -> Result<PreparedInput> {
    if let Some(input) = plan.planned_input.take() {
        return Ok(input);
    }
    let batch = source.next_slice()?;
    strategy.build_input(plan, batch)
}

/// Single-shot path: build once, invoke exactly once with plain start/end
/// timestamps around the call, decode inside the timed region
fn single_shot(
    plan: &mut InvocationPlan<'_>,
    strategy: &dyn InvocationStrategy,
    source: &mut dyn SliceSource,
) -> Result<BenchOutcome> {
    // Prompt-driven tasks draw their slice adjacent to the call, inside the
    // timed region; every other task has its input ready before the clock
    // starts.
    let mut pending = None;
    if !strategy.builds_inside_timer() {
        pending = Some(acquire_input(plan, strategy, source)?);
    }

    let start = Instant::now();
    let input = match pending {
        Some(input) => input,
        None => acquire_input(plan, strategy, source)?,
    };
    let raw = strategy.invoke(plan, &input)?;
    if plan.device.is_accelerator() {
        plan.model.synchronize();
    }
    let decoded = strategy.decode(plan, &input, raw)?;
    let latency = start.elapsed();

    let mut token_counts = plan.planned_tokens.clone();
    token_counts.extend(decoded.token_counts);

    Ok(BenchOutcome {
        output: Some(decoded.output),
        latencies: vec![latency.as_secs_f64()],
        token_counts,
        audio_lengths: plan.planned_audio.clone(),
        sample_rate: plan.sample_rate,
    })
}

/// Looped path: repeated timed iterations bounded by count and/or deadline
fn looped(
    plan: &InvocationPlan<'_>,
    strategy: &dyn InvocationStrategy,
    source: &mut dyn SliceSource,
    options: &RunOptions,
) -> Result<BenchOutcome> {
    let mut samples: Vec<Sample> = Vec::new();
    let mut iter = SampleIterator::new(plan, strategy, source, options.iterations, options.duration);
    for sample in iter.by_ref() {
        samples.push(sample?);
    }
    let output = iter.into_last_output();

    let mut latencies = Vec::with_capacity(samples.len());
    let mut token_counts = Vec::new();
    let mut audio_lengths = Vec::new();
    for sample in &samples {
        latencies.push(sample.latency.as_secs_f64());
        token_counts.extend_from_slice(&sample.token_counts);
        if let Some(len) = sample.audio_len {
            audio_lengths.push(len);
        }
    }

    Ok(BenchOutcome {
        output,
        latencies,
        token_counts,
        audio_lengths,
        sample_rate: plan.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_unbounded_run() {
        let options = RunOptions::new(TaskType::Feedforward).with_iterations(0);
        let err = options.validate().unwrap_err();
        assert!(matches!(err, MedirError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_validate_accepts_duration_bounded_run() {
        let options = RunOptions::new(TaskType::Feedforward)
            .with_iterations(0)
            .with_duration(Duration::from_secs(5));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_run_options_builder() {
        let options = RunOptions::new(TaskType::Classification)
            .with_iterations(10)
            .with_device(Device::Gpu)
            .with_input_names(vec!["input".to_string()])
            .with_inference_mode(false);
        assert_eq!(options.iterations, 10);
        assert_eq!(options.device, Device::Gpu);
        assert_eq!(options.input_names, vec!["input".to_string()]);
        assert!(!options.inference_mode);
    }
}
