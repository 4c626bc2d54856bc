//! Deterministic mock backend for tests and the CLI demo mode
//!
//! Implements every model entry point with fixed, input-derived outputs and
//! an optional artificial latency, plus a matching tokenizer, audio
//! processor and a cycling per-task slice source. Real model loading is an
//! external collaborator; this module is what the harness exercises when no
//! real backend is wired in.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::engine::{AudioClip, InputBatch, SliceSource, FILLER_TOKEN};
use crate::error::{MedirError, Result};
use crate::model::{
    AudioFeatures, AudioFrontend, Encoding, EntityDecode, Image, ImageSet, ModelBackend,
    TextCodec, TokenGrid,
};
use crate::tensor::Tensor;
use crate::task::TaskType;

/// Deterministic model implementing every entry point
#[derive(Debug, Clone)]
pub struct MockModel {
    name: String,
    classes: usize,
    grid_width: usize,
    generated_len: usize,
    latency: Duration,
}

impl MockModel {
    /// Model with default dimensions and no artificial latency
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            classes: 4,
            grid_width: 16,
            generated_len: 4,
            latency: Duration::ZERO,
        }
    }

    /// Set the artificial latency added to every call
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Set the number of classification classes
    #[must_use]
    pub fn with_classes(mut self, classes: usize) -> Self {
        self.classes = classes;
        self
    }

    /// Set the generation grid width
    #[must_use]
    pub fn with_grid_width(mut self, grid_width: usize) -> Self {
        self.grid_width = grid_width;
        self
    }

    /// Set the number of non-filler tokens generated per row
    #[must_use]
    pub fn with_generated_len(mut self, generated_len: usize) -> Self {
        self.generated_len = generated_len;
        self
    }

    fn delay(&self) {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
    }

    /// Generated ids start well clear of the filler id
    fn generated_ids(&self, row: usize) -> impl Iterator<Item = u32> + '_ {
        (0..self.generated_len).map(move |j| 100 + (row as u32) * 10 + j as u32)
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBackend for MockModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Tensor> {
        self.delay();
        let first = inputs.first().ok_or_else(|| {
            MedirError::InvalidConfiguration(
                "forward requires at least one input tensor".to_string(),
            )
        })?;
        let batch = first.shape()[0];
        let mean = first.data().iter().sum::<f32>() / first.size() as f32;

        let mut data = Vec::with_capacity(batch * self.classes);
        for row in 0..batch {
            for class in 0..self.classes {
                data.push(mean + (row + class) as f32);
            }
        }
        Tensor::from_vec(vec![batch, self.classes], data)
    }

    fn forward_multi(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        let primary = self.forward(inputs)?;
        let auxiliary = Tensor::from_vec(vec![1, 1], vec![0.0])?;
        Ok(vec![primary, auxiliary])
    }

    fn forward_ids(&self, encoding: &Encoding) -> Result<Tensor> {
        self.delay();
        let seq = encoding.seq_len().max(1);
        let classes = 3;
        let data = (0..seq * classes)
            .map(|i| ((i % 5) as f32) * 0.5)
            .collect();
        Tensor::from_vec(vec![seq, classes], data)
    }

    fn generate(&self, encoding: &Encoding) -> Result<TokenGrid> {
        self.delay();
        if encoding.batch_size() == 0 {
            return Err(MedirError::InvalidConfiguration(
                "generate requires a non-empty encoding".to_string(),
            ));
        }

        let needed = encoding.seq_len() + self.generated_len;
        let width = self.grid_width.max(needed);
        let rows = encoding
            .input_ids
            .iter()
            .enumerate()
            .map(|(i, prompt)| {
                let mut row = prompt.clone();
                row.extend(self.generated_ids(i));
                row.resize(width, FILLER_TOKEN);
                row
            })
            .collect();
        TokenGrid::from_rows(rows)
    }

    fn transcribe(&self, features: &AudioFeatures) -> Result<TokenGrid> {
        self.delay();
        if features.frames == 0 {
            return Err(MedirError::InvalidConfiguration(
                "transcribe requires at least one feature frame".to_string(),
            ));
        }

        let mut row: Vec<u32> = self.generated_ids(0).collect();
        row.resize(self.grid_width.max(row.len()), FILLER_TOKEN);
        TokenGrid::from_rows(vec![row])
    }

    fn render_images(&self, prompt: &str) -> Result<ImageSet> {
        self.delay();
        if prompt.is_empty() {
            return Err(MedirError::InvalidConfiguration(
                "render_images requires a non-empty prompt".to_string(),
            ));
        }

        let seed = prompt.bytes().fold(0u8, u8::wrapping_add);
        let pixels = (0..12).map(|i| seed.wrapping_add(i)).collect();
        Ok(ImageSet {
            images: vec![Image {
                width: 2,
                height: 2,
                pixels,
            }],
        })
    }

    fn translate_batch(&self, texts: &[String]) -> Result<Vec<String>> {
        self.delay();
        if texts.is_empty() {
            return Err(MedirError::InvalidConfiguration(
                "translate_batch requires a non-empty text batch".to_string(),
            ));
        }

        // Word-order reversal stands in for a real translation
        Ok(texts
            .iter()
            .map(|text| {
                text.split_whitespace()
                    .rev()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect())
    }

    fn tokenizer(&self) -> Result<Arc<dyn TextCodec>> {
        Ok(Arc::new(MockTokenizer))
    }

    fn audio_processor(&self) -> Result<Arc<dyn AudioFrontend>> {
        Ok(Arc::new(MockAudioFrontend { rate: 16_000 }))
    }
}

/// Whitespace tokenizer with a tiny id scheme
///
/// Word ids are `3 + word length`, keeping clear of the filler id; rows are
/// padded to the longest row in the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockTokenizer;

impl TextCodec for MockTokenizer {
    fn tokenize(&self, texts: &[String]) -> Result<Encoding> {
        if texts.is_empty() {
            return Err(MedirError::InvalidConfiguration(
                "cannot tokenize an empty text batch".to_string(),
            ));
        }

        let rows: Vec<Vec<u32>> = texts
            .iter()
            .map(|text| {
                text.split_whitespace()
                    .map(|word| 3 + word.len() as u32)
                    .collect()
            })
            .collect();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if width == 0 {
            return Err(MedirError::InvalidConfiguration(
                "cannot tokenize blank text".to_string(),
            ));
        }

        let mut input_ids = Vec::with_capacity(rows.len());
        let mut attention_mask = Vec::with_capacity(rows.len());
        for mut row in rows {
            let mut mask = vec![1u8; row.len()];
            row.resize(width, FILLER_TOKEN);
            mask.resize(width, 0);
            input_ids.push(row);
            attention_mask.push(mask);
        }

        Ok(Encoding {
            input_ids,
            attention_mask,
        })
    }

    fn decode(&self, grid: &TokenGrid) -> Result<Vec<String>> {
        Ok(grid
            .iter_rows()
            .map(|row| {
                row.iter()
                    .filter(|&&t| t != FILLER_TOKEN)
                    .map(|t| format!("tok{t}"))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect())
    }

    fn decode_entities(&self, encoding: &Encoding, logits: &Tensor) -> Result<EntityDecode> {
        let row = encoding.input_ids.first().ok_or_else(|| {
            MedirError::InvalidConfiguration("cannot decode an empty encoding".to_string())
        })?;
        let classes = logits.shape().last().copied().unwrap_or(1).max(1);

        let mut tokens = Vec::new();
        let mut label_indices = Vec::new();
        for (i, &id) in row.iter().enumerate() {
            if id == FILLER_TOKEN {
                continue;
            }
            tokens.push(format!("tok{id}"));
            let scores = logits
                .data()
                .get(i * classes..(i + 1) * classes)
                .unwrap_or(&[]);
            let label = scores
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map_or(0, |(idx, _)| idx);
            label_indices.push(label);
        }

        Ok(EntityDecode {
            tokens,
            label_indices,
        })
    }
}

/// Frame-based audio feature extractor (one frame per 10 ms hop)
#[derive(Debug, Clone, Copy)]
pub struct MockAudioFrontend {
    rate: u32,
}

impl MockAudioFrontend {
    /// Frontend operating at the given sample rate
    #[must_use]
    pub fn new(rate: u32) -> Self {
        Self { rate }
    }
}

impl Default for MockAudioFrontend {
    fn default() -> Self {
        Self { rate: 16_000 }
    }
}

impl AudioFrontend for MockAudioFrontend {
    fn process(&self, waveform: &[f32], _sample_rate: u32) -> Result<AudioFeatures> {
        if waveform.is_empty() {
            return Err(MedirError::InvalidConfiguration(
                "cannot process an empty waveform".to_string(),
            ));
        }

        let features: Vec<f32> = waveform
            .chunks(160)
            .map(|frame| frame.iter().map(|s| s.abs()).sum::<f32>() / frame.len() as f32)
            .collect();
        let frames = features.len();
        Ok(AudioFeatures { features, frames })
    }

    fn sampling_rate(&self) -> u32 {
        self.rate
    }

    fn decode(&self, grid: &TokenGrid) -> Result<Vec<String>> {
        MockTokenizer.decode(grid)
    }
}

/// Cycling demo input source covering every task type
pub struct DemoSource {
    task: TaskType,
    batch_size: usize,
    input_names: Vec<String>,
    cursor: usize,
}

impl DemoSource {
    /// Source producing deterministic slices for `task`
    #[must_use]
    pub fn new(task: TaskType, batch_size: usize, input_names: Vec<String>) -> Self {
        Self {
            task,
            batch_size: batch_size.max(1),
            input_names,
            cursor: 0,
        }
    }
}

impl SliceSource for DemoSource {
    fn next_slice(&mut self) -> Result<InputBatch> {
        self.cursor += 1;
        match self.task {
            TaskType::Feedforward | TaskType::Classification | TaskType::Detection => {
                let mut named = HashMap::new();
                for (index, name) in self.input_names.iter().enumerate() {
                    let data = (0..self.batch_size * 4)
                        .map(|i| ((i + index + self.cursor) % 7) as f32 * 0.25)
                        .collect();
                    named.insert(
                        name.clone(),
                        Tensor::from_vec(vec![self.batch_size, 4], data)?,
                    );
                }
                Ok(InputBatch::Named(named))
            }
            TaskType::TextToImage => {
                Ok(InputBatch::Prompt(format!("a painting of scene {}", self.cursor)))
            }
            TaskType::TextGeneration
            | TaskType::BatchTextGeneration
            | TaskType::TextTranslation
            | TaskType::NamedEntityRecognition => {
                let texts = (0..self.batch_size)
                    .map(|i| format!("sample sentence number {} item {i}", self.cursor))
                    .collect();
                Ok(InputBatch::Texts(texts))
            }
            TaskType::SpeechToText => {
                let waveform = (0..1600)
                    .map(|i| ((i + self.cursor) as f32 * 0.01).sin() * 0.1)
                    .collect();
                Ok(InputBatch::Audio(AudioClip::new(waveform, 16_000)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_is_deterministic() {
        let model = MockModel::new();
        let input = Tensor::from_vec(vec![2, 4], vec![0.5; 8]).unwrap();
        let a = model.forward(std::slice::from_ref(&input)).unwrap();
        let b = model.forward(std::slice::from_ref(&input)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.shape(), &[2, 4]);
    }

    #[test]
    fn test_forward_multi_returns_tuple_with_primary_first() {
        let model = MockModel::new();
        let input = Tensor::from_vec(vec![1, 4], vec![0.0; 4]).unwrap();
        let outputs = model.forward_multi(std::slice::from_ref(&input)).unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].shape(), &[1, 4]);
    }

    #[test]
    fn test_generate_pads_rows_with_filler() {
        let model = MockModel::new().with_generated_len(3).with_grid_width(12);
        let tokenizer = MockTokenizer;
        let encoding = tokenizer
            .tokenize(&["one two".to_string(), "three four".to_string()])
            .unwrap();
        let grid = model.generate(&encoding).unwrap();

        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.cols(), 12);
        // 2 prompt ids + 3 generated ids, rest filler
        let trailing = &grid.row(0)[5..];
        assert!(trailing.iter().all(|&t| t == FILLER_TOKEN));
    }

    #[test]
    fn test_tokenizer_pads_to_longest_row() {
        let encoding = MockTokenizer
            .tokenize(&["a b c".to_string(), "d".to_string()])
            .unwrap();
        assert_eq!(encoding.seq_len(), 3);
        assert_eq!(encoding.input_ids[1][1], FILLER_TOKEN);
        assert_eq!(encoding.attention_mask[1], vec![1, 0, 0]);
    }

    #[test]
    fn test_audio_frontend_frame_count() {
        let frontend = MockAudioFrontend::default();
        let features = frontend.process(&[0.1; 1600], 16_000).unwrap();
        assert_eq!(features.frames, 10);
        assert_eq!(frontend.sampling_rate(), 16_000);
    }

    #[test]
    fn test_decode_entities_skips_padding() {
        let tokenizer = MockTokenizer;
        let encoding = tokenizer
            .tokenize(&["ab cd".to_string(), "e".to_string()])
            .unwrap();
        let model = MockModel::new();
        let logits = model.forward_ids(&encoding).unwrap();
        let entities = tokenizer.decode_entities(&encoding, &logits).unwrap();
        assert_eq!(entities.tokens.len(), 2);
        assert_eq!(entities.tokens.len(), entities.label_indices.len());
    }

    #[test]
    fn test_demo_source_matches_task_payload() {
        let mut source = DemoSource::new(TaskType::SpeechToText, 1, vec![]);
        assert!(matches!(
            source.next_slice().unwrap(),
            InputBatch::Audio(_)
        ));

        let mut source = DemoSource::new(TaskType::Classification, 2, vec!["input".to_string()]);
        match source.next_slice().unwrap() {
            InputBatch::Named(named) => {
                assert_eq!(named["input"].shape(), &[2, 4]);
            }
            other => panic!("unexpected batch: {other:?}"),
        }
    }

    #[test]
    fn test_translate_reverses_word_order() {
        let model = MockModel::new();
        let out = model
            .translate_batch(&["hello wide world".to_string()])
            .unwrap();
        assert_eq!(out, vec!["world wide hello".to_string()]);
    }
}
