//! Lazy benchmark iteration
//!
//! Replaces nested wrapper composition with a plain iterator that yields
//! samples until a stop predicate — iteration count reached or deadline
//! passed — trips. The deadline is only consulted between iterations, never
//! during one, so a slow iteration may overrun the configured duration; the
//! first iteration always runs even when the deadline is already elapsed.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::engine::batch::SliceSource;
use crate::engine::plan::InvocationPlan;
use crate::engine::strategy::{Decoded, InvocationStrategy, RawOutput};
use crate::engine::timer::time_invocation;
use crate::error::{MedirError, Result};

/// One iteration's measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Wall-clock latency of the timed call
    pub latency: Duration,
    /// Generated-token counts recovered from this iteration (may be empty)
    pub token_counts: Vec<usize>,
    /// Audio length consumed by this iteration, in waveform samples
    pub audio_len: Option<f64>,
}

/// Iterator yielding one [`Sample`] per benchmark iteration
///
/// `max_iterations == 0` means unbounded by count; a zero duration means
/// unbounded by time. Any error inside an iteration is wrapped as
/// `IterationFailure` with the iteration index and ends the iterator — no
/// retry, no partial-result suppression.
pub struct SampleIterator<'a, 'm> {
    plan: &'a InvocationPlan<'m>,
    strategy: &'a dyn InvocationStrategy,
    source: &'a mut dyn SliceSource,
    max_iterations: usize,
    deadline: Option<Instant>,
    produced: usize,
    finished: bool,
    last_output: Option<RawOutput>,
}

impl<'a, 'm> SampleIterator<'a, 'm> {
    /// Create an iterator over benchmark iterations
    #[must_use]
    pub fn new(
        plan: &'a InvocationPlan<'m>,
        strategy: &'a dyn InvocationStrategy,
        source: &'a mut dyn SliceSource,
        max_iterations: usize,
        duration: Duration,
    ) -> Self {
        let deadline = if duration.is_zero() {
            None
        } else {
            Some(Instant::now() + duration)
        };
        Self {
            plan,
            strategy,
            source,
            max_iterations,
            deadline,
            produced: 0,
            finished: false,
            last_output: None,
        }
    }

    /// Raw output of the last completed iteration
    #[must_use]
    pub fn into_last_output(self) -> Option<RawOutput> {
        self.last_output
    }

    fn step(&mut self) -> Result<Sample> {
        // Slice acquisition and input construction stay outside the timed
        // region; only the model call is measured.
        let batch = self.source.next_slice()?;
        let input = self.strategy.build_input(self.plan, batch)?;
        let (raw, latency) = time_invocation(self.plan, self.strategy, &input)?;
        let Decoded {
            output,
            token_counts,
        } = self.strategy.decode(self.plan, &input, raw)?;

        let sample = Sample {
            latency,
            token_counts,
            audio_len: input.audio_len(),
        };
        self.last_output = Some(output);
        Ok(sample)
    }
}

impl Iterator for SampleIterator<'_, '_> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if self.max_iterations != 0 && self.produced >= self.max_iterations {
            self.finished = true;
            return None;
        }

        // Deadline check happens strictly between iterations; the first
        // iteration runs regardless, guaranteeing at least one measurement.
        if self.produced > 0 {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    self.finished = true;
                    return None;
                }
            }
        }

        match self.step() {
            Ok(sample) => {
                self.produced += 1;
                Some(Ok(sample))
            }
            Err(cause) => {
                self.finished = true;
                Some(Err(MedirError::IterationFailure {
                    iteration: self.produced,
                    source: Box::new(cause),
                }))
            }
        }
    }
}
