//! Performance metric aggregation
//!
//! Reduces the per-iteration sample stream into throughput and latency
//! metrics. Three orthogonal metric families are handled without assuming
//! all are present: plain latency-based throughput, token generation rate,
//! and audio real-time factor. Degenerate input fails with an explicit
//! error rather than producing misleading zero/NaN figures.

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{MedirError, Result};

/// Final metrics for one benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Number of measured iterations
    pub iterations: usize,
    /// Batch size the throughput figures are normalized to
    pub batch_size: usize,
    /// Mean latency (seconds)
    pub latency_avg_s: f64,
    /// Median latency (seconds)
    pub latency_median_s: f64,
    /// Minimum latency (seconds)
    pub latency_min_s: f64,
    /// Maximum latency (seconds)
    pub latency_max_s: f64,
    /// Sample standard deviation of latency (seconds)
    pub latency_std_s: f64,
    /// Throughput in frames per second (batch size / median latency)
    pub throughput_fps: f64,
    /// Token generation rate, present when token counts were collected
    pub tokens_per_second: Option<f64>,
    /// Audio real-time factor (audio seconds processed per wall-clock
    /// second), present for audio tasks
    pub audio_real_time_factor: Option<f64>,
}

/// Reduce raw measurements into final metrics
///
/// `audio_lengths` are waveform sample counts; together with the shared
/// `sample_rate` they yield the seconds of audio processed.
///
/// # Errors
///
/// - `InvalidConfiguration` for a zero batch size
/// - `InsufficientData` for empty latencies, zero total or median latency,
///   audio lengths without a sample rate, or a zero sample rate
pub fn aggregate(
    batch_size: usize,
    latencies: &[f64],
    token_counts: &[usize],
    audio_lengths: &[f64],
    sample_rate: Option<u32>,
) -> Result<PerformanceMetrics> {
    if batch_size == 0 {
        return Err(MedirError::InvalidConfiguration(
            "batch size must be positive".to_string(),
        ));
    }
    if latencies.is_empty() {
        return Err(MedirError::InsufficientData(
            "no latency samples collected".to_string(),
        ));
    }

    let n = latencies.len();
    let total: f64 = latencies.iter().sum();
    if total <= 0.0 {
        return Err(MedirError::InsufficientData(
            "total inference time is zero".to_string(),
        ));
    }

    let mut sorted = latencies.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = if n.is_multiple_of(2) {
        f64::midpoint(sorted[n / 2 - 1], sorted[n / 2])
    } else {
        sorted[n / 2]
    };
    if median <= 0.0 {
        return Err(MedirError::InsufficientData(
            "median latency is zero".to_string(),
        ));
    }

    let avg = total / n as f64;
    let variance = if n > 1 {
        latencies.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / (n as f64 - 1.0)
    } else {
        0.0
    };

    let tokens_per_second = if token_counts.is_empty() {
        None
    } else {
        let tokens: usize = token_counts.iter().sum();
        Some(tokens as f64 / total)
    };

    let audio_real_time_factor = if audio_lengths.is_empty() {
        None
    } else {
        let rate = sample_rate.ok_or_else(|| {
            MedirError::InsufficientData(
                "audio lengths collected without a sample rate".to_string(),
            )
        })?;
        if rate == 0 {
            return Err(MedirError::InsufficientData(
                "audio sample rate is zero".to_string(),
            ));
        }
        let audio_secs = audio_lengths.iter().sum::<f64>() / f64::from(rate);
        Some(audio_secs / total)
    };

    info!("computed performance metrics over {n} iterations");

    Ok(PerformanceMetrics {
        iterations: n,
        batch_size,
        latency_avg_s: avg,
        latency_median_s: median,
        latency_min_s: sorted[0],
        latency_max_s: sorted[n - 1],
        latency_std_s: variance.sqrt(),
        throughput_fps: batch_size as f64 / median,
        tokens_per_second,
        audio_real_time_factor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_only_aggregation() {
        let metrics = aggregate(2, &[0.1, 0.3, 0.2], &[], &[], None).unwrap();
        assert_eq!(metrics.iterations, 3);
        assert!((metrics.latency_median_s - 0.2).abs() < 1e-9);
        assert!((metrics.latency_avg_s - 0.2).abs() < 1e-9);
        assert!((metrics.latency_min_s - 0.1).abs() < 1e-9);
        assert!((metrics.latency_max_s - 0.3).abs() < 1e-9);
        assert!((metrics.throughput_fps - 10.0).abs() < 1e-9);
        assert!(metrics.tokens_per_second.is_none());
        assert!(metrics.audio_real_time_factor.is_none());
    }

    #[test]
    fn test_even_sample_count_uses_midpoint_median() {
        let metrics = aggregate(1, &[0.1, 0.2, 0.3, 0.4], &[], &[], None).unwrap();
        assert!((metrics.latency_median_s - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_token_rate() {
        let metrics = aggregate(1, &[0.25, 0.25], &[10, 15], &[], None).unwrap();
        // 25 tokens over 0.5 seconds
        assert!((metrics.tokens_per_second.unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_audio_real_time_factor() {
        // 32000 samples at 16 kHz = 2 seconds of audio, processed in 0.5s
        let metrics = aggregate(1, &[0.5], &[], &[32_000.0], Some(16_000)).unwrap();
        assert!((metrics.audio_real_time_factor.unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_latencies_fail() {
        let err = aggregate(1, &[], &[], &[], None).unwrap_err();
        assert!(matches!(err, MedirError::InsufficientData(_)));
    }

    #[test]
    fn test_zero_batch_size_fails() {
        let err = aggregate(0, &[0.1], &[], &[], None).unwrap_err();
        assert!(matches!(err, MedirError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_zero_total_latency_fails() {
        let err = aggregate(1, &[0.0, 0.0], &[], &[], None).unwrap_err();
        assert!(matches!(err, MedirError::InsufficientData(_)));
    }

    #[test]
    fn test_audio_without_sample_rate_fails() {
        let err = aggregate(1, &[0.5], &[], &[16_000.0], None).unwrap_err();
        assert!(matches!(err, MedirError::InsufficientData(_)));
    }

    #[test]
    fn test_single_sample_has_zero_std_dev() {
        let metrics = aggregate(1, &[0.2], &[], &[], None).unwrap();
        assert!(metrics.latency_std_s.abs() < f64::EPSILON);
    }
}
