//! Task-dependent input payloads and the slice source collaborator
//!
//! The engine never assumes a single input shape; it dispatches on the task
//! type to know how to consume a batch. Slices are produced by an external,
//! stateful pull-based source that may itself perform I/O.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tensor::Tensor;

/// One audio slice: raw waveform plus its sampling metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClip {
    /// Raw mono waveform samples
    pub waveform: Vec<f32>,
    /// Source sample rate in Hz
    pub sample_rate: u32,
    /// Length of the clip in waveform samples
    pub length: f64,
}

impl AudioClip {
    /// Build a clip; the length is derived from the waveform
    #[must_use]
    pub fn new(waveform: Vec<f32>, sample_rate: u32) -> Self {
        let length = waveform.len() as f64;
        Self {
            waveform,
            sample_rate,
            length,
        }
    }

    /// Clip duration in seconds
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.length / f64::from(self.sample_rate)
        }
    }
}

/// Opaque, task-dependent input payload produced by a slice source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputBatch {
    /// Mapping from input name to tensor data (tensor tasks)
    Named(HashMap<String, Tensor>),
    /// Single prompt string (image synthesis)
    Prompt(String),
    /// Batch of texts (generation, translation, entity recognition)
    Texts(Vec<String>),
    /// Audio clip (speech recognition)
    Audio(AudioClip),
}

impl InputBatch {
    /// Short payload tag used in error messages
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Named(_) => "named-tensors",
            Self::Prompt(_) => "prompt",
            Self::Texts(_) => "texts",
            Self::Audio(_) => "audio",
        }
    }
}

/// Pull-based input provider, invoked once per iteration
///
/// A source is stateful and may perform I/O (disk reads, decoding). Input
/// acquisition is never timed as part of inference latency, except at the
/// single-shot boundary for prompt-driven tasks where construction and call
/// are adjacent.
pub trait SliceSource {
    /// Produce the next input batch
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying data source fails.
    fn next_slice(&mut self) -> Result<InputBatch>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_clip_length_and_duration() {
        let clip = AudioClip::new(vec![0.0; 32_000], 16_000);
        assert!((clip.length - 32_000.0).abs() < f64::EPSILON);
        assert!((clip.duration_secs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_audio_clip_zero_rate_has_zero_duration() {
        let clip = AudioClip::new(vec![0.0; 100], 0);
        assert!(clip.duration_secs().abs() < f64::EPSILON);
    }

    #[test]
    fn test_input_batch_kind() {
        assert_eq!(InputBatch::Prompt(String::new()).kind(), "prompt");
        assert_eq!(InputBatch::Texts(vec![]).kind(), "texts");
        assert_eq!(InputBatch::Named(HashMap::new()).kind(), "named-tensors");
        assert_eq!(InputBatch::Audio(AudioClip::new(vec![], 1)).kind(), "audio");
    }
}
