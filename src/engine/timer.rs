//! Iteration timing with device-synchronization barriers

use std::time::{Duration, Instant};

use crate::engine::plan::InvocationPlan;
use crate::engine::strategy::{InvocationStrategy, PreparedInput, RawOutput};
use crate::error::Result;

/// Time a single invocation
///
/// When the target device is an accelerator, the device is synchronized
/// before the clock starts and again inside the timed region after the call
/// returns, so the measured latency reflects completed computation rather
/// than kernel submission.
///
/// # Errors
///
/// Propagates any failure of the underlying model call.
pub fn time_invocation(
    plan: &InvocationPlan<'_>,
    strategy: &dyn InvocationStrategy,
    input: &PreparedInput,
) -> Result<(RawOutput, Duration)> {
    if plan.device.is_accelerator() {
        plan.model.synchronize();
    }

    let start = Instant::now();
    let raw = strategy.invoke(plan, input)?;
    if plan.device.is_accelerator() {
        plan.model.synchronize();
    }
    let latency = start.elapsed();

    Ok((raw, latency))
}
