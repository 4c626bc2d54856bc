//! Model abstraction consumed by the benchmark engine
//!
//! The engine never knows how a model was loaded, compiled or placed on a
//! device; it talks to an opaque [`ModelBackend`] handle with one entry
//! point per calling convention. Entry points a concrete backend does not
//! support fail with `UnsupportedOperation` rather than being silently
//! skipped.
//!
//! Tokenizer and audio-processor collaborators are obtained from the model
//! handle at planning time and referenced by the strategies per task type.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{MedirError, Result};
use crate::tensor::Tensor;

/// Tokenized text ready for a model call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Encoding {
    /// Token-id rows, one per batch entry, padded to equal length
    pub input_ids: Vec<Vec<u32>>,
    /// Attention mask rows parallel to `input_ids` (1 = real token)
    pub attention_mask: Vec<Vec<u8>>,
}

impl Encoding {
    /// Number of batch entries
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.input_ids.len()
    }

    /// Padded sequence length
    #[must_use]
    pub fn seq_len(&self) -> usize {
        self.input_ids.first().map_or(0, Vec::len)
    }
}

/// Fixed-width grid of generated token ids, shape `[batch, max_length]`
///
/// Rows shorter than the grid width are extended with a filler token past
/// their natural end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenGrid {
    rows: usize,
    cols: usize,
    tokens: Vec<u32>,
}

impl TokenGrid {
    /// Build a grid from equal-length rows
    ///
    /// # Errors
    ///
    /// Returns `InvalidShape` if there are no rows, a row is empty, or the
    /// rows have unequal lengths.
    pub fn from_rows(rows: Vec<Vec<u32>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.is_empty() || cols == 0 {
            return Err(MedirError::InvalidShape {
                reason: "token grid requires at least one non-empty row".to_string(),
            });
        }
        if rows.iter().any(|r| r.len() != cols) {
            return Err(MedirError::InvalidShape {
                reason: "token grid rows must have equal length".to_string(),
            });
        }

        let count = rows.len();
        let tokens = rows.into_iter().flatten().collect();
        Ok(Self {
            rows: count,
            cols,
            tokens,
        })
    }

    /// Number of rows (batch size)
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Grid width (maximum generation length)
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// One row of token ids
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn row(&self, index: usize) -> &[u32] {
        &self.tokens[index * self.cols..(index + 1) * self.cols]
    }

    /// Iterate over rows in order
    pub fn iter_rows(&self) -> impl Iterator<Item = &[u32]> {
        self.tokens.chunks(self.cols)
    }
}

/// Processed audio features ready for a transcription call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    /// Flattened feature values
    pub features: Vec<f32>,
    /// Number of feature frames
    pub frames: usize,
}

/// One synthesized image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Packed RGB pixel data
    pub pixels: Vec<u8>,
}

/// Collection of generated images
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageSet {
    /// Generated images in batch order
    pub images: Vec<Image>,
}

impl ImageSet {
    /// Number of images
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether the collection is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Decoded entity-recognition result: tokens plus predicted label indices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDecode {
    /// Surface tokens in sequence order
    pub tokens: Vec<String>,
    /// Predicted label index per token
    pub label_indices: Vec<usize>,
}

fn unsupported<T>(operation: &str, model: &str) -> Result<T> {
    Err(MedirError::UnsupportedOperation {
        operation: operation.to_string(),
        reason: format!("model '{model}' does not provide this entry point"),
    })
}

/// Opaque model handle with one entry point per calling convention
///
/// Default implementations fail with `UnsupportedOperation`, so a backend
/// only implements the entry points its task types actually use and any
/// other call fails loudly.
pub trait ModelBackend: Send + Sync {
    /// Model identifier used in logs and reports
    fn name(&self) -> &str;

    /// Positional tensor call: `model(input_0, input_1, ...)`
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` if the backend has no tensor entry
    /// point, or any backend-specific failure.
    fn forward(&self, _inputs: &[Tensor]) -> Result<Tensor> {
        unsupported("forward", self.name())
    }

    /// Tuple-returning tensor call; detection models return several outputs
    ///
    /// # Errors
    ///
    /// Propagates the same failures as [`ModelBackend::forward`].
    fn forward_multi(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        self.forward(inputs).map(|t| vec![t])
    }

    /// Token-id call used by entity recognition
    ///
    /// Only the input ids are consumed; the attention mask is not forwarded
    /// to the call itself.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` unless implemented.
    fn forward_ids(&self, _encoding: &Encoding) -> Result<Tensor> {
        unsupported("forward_ids", self.name())
    }

    /// Autoregressive generation entry point
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` unless implemented.
    fn generate(&self, _encoding: &Encoding) -> Result<TokenGrid> {
        unsupported("generate", self.name())
    }

    /// Fixed-width batch generation entry point
    ///
    /// # Errors
    ///
    /// Propagates the same failures as [`ModelBackend::generate`].
    fn generate_batch(&self, encoding: &Encoding) -> Result<TokenGrid> {
        self.generate(encoding)
    }

    /// Audio transcription entry point
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` unless implemented.
    fn transcribe(&self, _features: &AudioFeatures) -> Result<TokenGrid> {
        unsupported("transcribe", self.name())
    }

    /// Image synthesis entry point, called with a single prompt
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` unless implemented.
    fn render_images(&self, _prompt: &str) -> Result<ImageSet> {
        unsupported("render_images", self.name())
    }

    /// Dedicated translation entry point (not the model's default call)
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` unless implemented.
    fn translate_batch(&self, _texts: &[String]) -> Result<Vec<String>> {
        unsupported("translate_batch", self.name())
    }

    /// Tokenizer bound to this model
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` if the model carries no tokenizer.
    fn tokenizer(&self) -> Result<Arc<dyn TextCodec>> {
        unsupported("tokenizer", self.name())
    }

    /// Audio processor bound to this model
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` if the model carries no processor.
    fn audio_processor(&self) -> Result<Arc<dyn AudioFrontend>> {
        unsupported("audio_processor", self.name())
    }

    /// Block until all device work issued so far has completed
    ///
    /// No-op for host-only backends.
    fn synchronize(&self) {}
}

/// Tokenizer collaborator for text tasks
pub trait TextCodec: Send + Sync {
    /// Encode a batch of texts into padded token-id rows
    ///
    /// # Errors
    ///
    /// Returns an error for input the codec cannot encode.
    fn tokenize(&self, texts: &[String]) -> Result<Encoding>;

    /// Decode a generated grid back into one string per row
    ///
    /// # Errors
    ///
    /// Returns an error for ids outside the codec's vocabulary.
    fn decode(&self, grid: &TokenGrid) -> Result<Vec<String>>;

    /// Decode token-classification logits into tokens plus label indices
    ///
    /// # Errors
    ///
    /// Returns an error if the logits do not cover the encoded sequence.
    fn decode_entities(&self, encoding: &Encoding, logits: &Tensor) -> Result<EntityDecode>;
}

/// Audio feature-extraction collaborator for speech tasks
pub trait AudioFrontend: Send + Sync {
    /// Convert a raw waveform into model features
    ///
    /// # Errors
    ///
    /// Returns an error for waveforms the frontend cannot process.
    fn process(&self, waveform: &[f32], sample_rate: u32) -> Result<AudioFeatures>;

    /// Sample rate the feature extractor operates at
    fn sampling_rate(&self) -> u32;

    /// Decode a transcription grid into text
    ///
    /// # Errors
    ///
    /// Returns an error for ids outside the frontend's vocabulary.
    fn decode(&self, grid: &TokenGrid) -> Result<Vec<String>>;
}
