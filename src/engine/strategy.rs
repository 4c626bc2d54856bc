//! Task-polymorphic invocation strategies
//!
//! One strategy per task type, each describing how to turn a raw input
//! batch into a model call and how to interpret its return value. The
//! [`StrategyRegistry`] collapses input-construction, invocation and decode
//! dispatch into a single lookup, so the three stages cannot drift out of
//! sync and adding a task type is a one-entry change.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::engine::batch::InputBatch;
use crate::engine::plan::InvocationPlan;
use crate::engine::tokens::generated_token_counts;
use crate::error::{MedirError, Result};
use crate::model::{
    AudioFeatures, AudioFrontend, Encoding, EntityDecode, ImageSet, TextCodec, TokenGrid,
};
use crate::tensor::Tensor;
use crate::task::TaskType;

/// Output width of the fixed-width batch generation entry point
pub const MAX_TEXT_LEN: usize = 128;

/// Padding id marking the end of a generated row
pub const FILLER_TOKEN: u32 = 2;

// ============================================================================
// Payload types
// ============================================================================

/// Per-iteration call payload, derived from a raw input batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PreparedInput {
    /// Device-resident tensors ordered by declared input name
    Tensors(Vec<Tensor>),
    /// Prompt string for image synthesis
    Prompt(String),
    /// Text batch for translation
    Texts(Vec<String>),
    /// Token ids for entity recognition (mask is not forwarded to the call)
    Ids(Encoding),
    /// Tokenized encodings for generation
    Encodings(Encoding),
    /// Processed audio features plus the source clip length in samples
    Features {
        /// Model-ready features
        features: AudioFeatures,
        /// Source clip length in waveform samples
        audio_len: f64,
    },
}

impl PreparedInput {
    /// Short payload tag used in error messages
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tensors(_) => "tensors",
            Self::Prompt(_) => "prompt",
            Self::Texts(_) => "texts",
            Self::Ids(_) => "ids",
            Self::Encodings(_) => "encodings",
            Self::Features { .. } => "features",
        }
    }

    /// Audio length consumed by this input, if any
    #[must_use]
    pub fn audio_len(&self) -> Option<f64> {
        match self {
            Self::Features { audio_len, .. } => Some(*audio_len),
            _ => None,
        }
    }
}

/// Raw model result, shape depending on the task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawOutput {
    /// Plain tensor (feedforward, classification, detection)
    Tensor(Tensor),
    /// Generated token grid before text decoding
    Grid(TokenGrid),
    /// Decoded text rows (generation, transcription)
    Text(Vec<String>),
    /// Translated batch
    Translations(Vec<String>),
    /// Synthesized image collection
    Images(ImageSet),
    /// Decoded entity predictions
    Entities(EntityDecode),
}

impl RawOutput {
    /// Short result tag used in error messages
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tensor(_) => "tensor",
            Self::Grid(_) => "grid",
            Self::Text(_) => "text",
            Self::Translations(_) => "translations",
            Self::Images(_) => "images",
            Self::Entities(_) => "entities",
        }
    }
}

/// Decoded result of one iteration
#[derive(Debug, Clone)]
pub struct Decoded {
    /// Presentation-ready output, retained for the last iteration only
    pub output: RawOutput,
    /// Generated-token counts recovered from this iteration, row order
    pub token_counts: Vec<usize>,
}

// ============================================================================
// Strategy trait and registry
// ============================================================================

/// Per-task-type description of how to build, invoke and decode one call
pub trait InvocationStrategy: Send + Sync {
    /// Turn a raw input batch into a call-ready payload
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a payload shape the task cannot
    /// consume, or any collaborator failure.
    fn build_input(&self, plan: &InvocationPlan<'_>, batch: InputBatch) -> Result<PreparedInput>;

    /// Issue the model call
    ///
    /// # Errors
    ///
    /// Propagates model failures; returns `InvalidConfiguration` for a
    /// mismatched payload.
    fn invoke(&self, plan: &InvocationPlan<'_>, input: &PreparedInput) -> Result<RawOutput>;

    /// Interpret the model's return value
    ///
    /// # Errors
    ///
    /// Propagates collaborator failures; returns `InvalidConfiguration` for
    /// a mismatched result shape.
    fn decode(
        &self,
        plan: &InvocationPlan<'_>,
        input: &PreparedInput,
        raw: RawOutput,
    ) -> Result<Decoded>;

    /// Whether the single-shot path acquires input inside the timed region
    ///
    /// True for tasks whose slice is drawn adjacent to the call itself.
    fn builds_inside_timer(&self) -> bool {
        false
    }
}

/// Mapping from task type to its invocation strategy
///
/// The single dispatch point of the engine: a task type with no entry here
/// fails with `UnsupportedTask` before any input is drawn or any model call
/// is issued.
pub struct StrategyRegistry {
    strategies: HashMap<TaskType, Box<dyn InvocationStrategy>>,
}

impl StrategyRegistry {
    /// Registry preloaded with every built-in task strategy
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(TaskType::Feedforward, Box::new(FeedforwardStrategy));
        registry.register(TaskType::Classification, Box::new(ClassificationStrategy));
        registry.register(TaskType::Detection, Box::new(DetectionStrategy));
        registry.register(TaskType::TextToImage, Box::new(TextToImageStrategy));
        registry.register(TaskType::TextTranslation, Box::new(TextTranslationStrategy));
        registry.register(
            TaskType::NamedEntityRecognition,
            Box::new(EntityRecognitionStrategy),
        );
        registry.register(TaskType::TextGeneration, Box::new(TextGenerationStrategy));
        registry.register(
            TaskType::BatchTextGeneration,
            Box::new(BatchTextGenerationStrategy),
        );
        registry.register(TaskType::SpeechToText, Box::new(SpeechToTextStrategy));
        registry
    }

    /// Registry with no strategies registered
    #[must_use]
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Register (or replace) the strategy for a task type
    pub fn register(&mut self, task: TaskType, strategy: Box<dyn InvocationStrategy>) {
        self.strategies.insert(task, strategy);
    }

    /// Look up the strategy for a task type
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedTask` if no strategy is registered. The lookup
    /// happens before input construction, so an unrecognized task fails
    /// before any model call would be attempted.
    pub fn get(&self, task: TaskType) -> Result<&dyn InvocationStrategy> {
        self.strategies
            .get(&task)
            .map(AsRef::as_ref)
            .ok_or_else(|| MedirError::UnsupportedTask {
                task: task.as_str().to_string(),
                stage: "input-construction",
            })
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Batch/payload accessors
// ============================================================================

pub(crate) fn expect_named(
    task: TaskType,
    batch: InputBatch,
) -> Result<HashMap<String, Tensor>> {
    match batch {
        InputBatch::Named(named) => Ok(named),
        other => Err(batch_mismatch(task, "named-tensors", &other)),
    }
}

pub(crate) fn expect_prompt(task: TaskType, batch: InputBatch) -> Result<String> {
    match batch {
        InputBatch::Prompt(prompt) => Ok(prompt),
        other => Err(batch_mismatch(task, "prompt", &other)),
    }
}

pub(crate) fn expect_texts(task: TaskType, batch: InputBatch) -> Result<Vec<String>> {
    match batch {
        InputBatch::Texts(texts) => Ok(texts),
        other => Err(batch_mismatch(task, "texts", &other)),
    }
}

pub(crate) fn expect_audio(
    task: TaskType,
    batch: InputBatch,
) -> Result<crate::engine::batch::AudioClip> {
    match batch {
        InputBatch::Audio(clip) => Ok(clip),
        other => Err(batch_mismatch(task, "audio", &other)),
    }
}

fn batch_mismatch(task: TaskType, expected: &str, got: &InputBatch) -> MedirError {
    MedirError::InvalidConfiguration(format!(
        "task '{task}' expects a {expected} batch, got {}",
        got.kind()
    ))
}

fn input_mismatch(task: TaskType, expected: &str, got: &PreparedInput) -> MedirError {
    MedirError::InvalidConfiguration(format!(
        "task '{task}' cannot invoke a {} payload (expected {expected})",
        got.kind()
    ))
}

fn output_mismatch(task: TaskType, expected: &str, got: &RawOutput) -> MedirError {
    MedirError::InvalidConfiguration(format!(
        "task '{task}' cannot decode a {} result (expected {expected})",
        got.kind()
    ))
}

fn expect_tensor_input<'a>(task: TaskType, input: &'a PreparedInput) -> Result<&'a [Tensor]> {
    match input {
        PreparedInput::Tensors(tensors) => Ok(tensors),
        other => Err(input_mismatch(task, "tensors", other)),
    }
}

fn expect_tensor_output(task: TaskType, raw: RawOutput) -> Result<Tensor> {
    match raw {
        RawOutput::Tensor(tensor) => Ok(tensor),
        other => Err(output_mismatch(task, "tensor", &other)),
    }
}

fn expect_grid_output(task: TaskType, raw: RawOutput) -> Result<TokenGrid> {
    match raw {
        RawOutput::Grid(grid) => Ok(grid),
        other => Err(output_mismatch(task, "grid", &other)),
    }
}

fn require_tokenizer<'a>(plan: &'a InvocationPlan<'_>) -> Result<&'a dyn TextCodec> {
    plan.tokenizer.as_deref().ok_or_else(|| {
        MedirError::InvalidConfiguration(format!(
            "no tokenizer bound for task '{}'",
            plan.task
        ))
    })
}

fn require_processor<'a>(plan: &'a InvocationPlan<'_>) -> Result<&'a dyn AudioFrontend> {
    plan.processor.as_deref().ok_or_else(|| {
        MedirError::InvalidConfiguration(format!(
            "no audio processor bound for task '{}'",
            plan.task
        ))
    })
}

/// Collect named tensors in declared-input order, placed on the target device
fn device_tensors(plan: &InvocationPlan<'_>, batch: InputBatch) -> Result<PreparedInput> {
    let mut named = expect_named(plan.task, batch)?;
    let mut tensors = Vec::with_capacity(plan.input_names.len());
    for name in &plan.input_names {
        let tensor = named.remove(name).ok_or_else(|| {
            MedirError::InvalidConfiguration(format!(
                "input batch is missing declared input '{name}'"
            ))
        })?;
        tensors.push(tensor.to(plan.device));
    }
    Ok(PreparedInput::Tensors(tensors))
}

// ============================================================================
// Tensor tasks
// ============================================================================

/// Plain tensor inference; the result is returned raw
struct FeedforwardStrategy;

impl InvocationStrategy for FeedforwardStrategy {
    fn build_input(&self, plan: &InvocationPlan<'_>, batch: InputBatch) -> Result<PreparedInput> {
        device_tensors(plan, batch)
    }

    fn invoke(&self, plan: &InvocationPlan<'_>, input: &PreparedInput) -> Result<RawOutput> {
        let tensors = expect_tensor_input(plan.task, input)?;
        plan.model.forward(tensors).map(RawOutput::Tensor)
    }

    fn decode(
        &self,
        plan: &InvocationPlan<'_>,
        _input: &PreparedInput,
        raw: RawOutput,
    ) -> Result<Decoded> {
        let tensor = expect_tensor_output(plan.task, raw)?;
        Ok(Decoded {
            output: RawOutput::Tensor(tensor.to(Device::Cpu)),
            token_counts: Vec::new(),
        })
    }
}

/// Tensor inference followed by a softmax over the class dimension
struct ClassificationStrategy;

impl InvocationStrategy for ClassificationStrategy {
    fn build_input(&self, plan: &InvocationPlan<'_>, batch: InputBatch) -> Result<PreparedInput> {
        device_tensors(plan, batch)
    }

    fn invoke(&self, plan: &InvocationPlan<'_>, input: &PreparedInput) -> Result<RawOutput> {
        let tensors = expect_tensor_input(plan.task, input)?;
        plan.model.forward(tensors).map(RawOutput::Tensor)
    }

    fn decode(
        &self,
        plan: &InvocationPlan<'_>,
        _input: &PreparedInput,
        raw: RawOutput,
    ) -> Result<Decoded> {
        let logits = expect_tensor_output(plan.task, raw)?;
        let probabilities = logits.softmax(1)?.to(Device::Cpu);
        Ok(Decoded {
            output: RawOutput::Tensor(probabilities),
            token_counts: Vec::new(),
        })
    }
}

/// Tuple-returning detection call; only the first output is kept
struct DetectionStrategy;

impl InvocationStrategy for DetectionStrategy {
    fn build_input(&self, plan: &InvocationPlan<'_>, batch: InputBatch) -> Result<PreparedInput> {
        device_tensors(plan, batch)
    }

    fn invoke(&self, plan: &InvocationPlan<'_>, input: &PreparedInput) -> Result<RawOutput> {
        let tensors = expect_tensor_input(plan.task, input)?;
        let mut outputs = plan.model.forward_multi(tensors)?;
        if outputs.is_empty() {
            return Err(MedirError::InvalidConfiguration(
                "detection model returned no outputs".to_string(),
            ));
        }
        Ok(RawOutput::Tensor(outputs.remove(0)))
    }

    fn decode(
        &self,
        plan: &InvocationPlan<'_>,
        _input: &PreparedInput,
        raw: RawOutput,
    ) -> Result<Decoded> {
        let tensor = expect_tensor_output(plan.task, raw)?;
        Ok(Decoded {
            output: RawOutput::Tensor(tensor.to(Device::Cpu)),
            token_counts: Vec::new(),
        })
    }
}

// ============================================================================
// Prompt-driven tasks
// ============================================================================

/// Image synthesis from a single prompt
struct TextToImageStrategy;

impl InvocationStrategy for TextToImageStrategy {
    fn build_input(&self, plan: &InvocationPlan<'_>, batch: InputBatch) -> Result<PreparedInput> {
        expect_prompt(plan.task, batch).map(PreparedInput::Prompt)
    }

    fn invoke(&self, plan: &InvocationPlan<'_>, input: &PreparedInput) -> Result<RawOutput> {
        match input {
            PreparedInput::Prompt(prompt) => {
                plan.model.render_images(prompt).map(RawOutput::Images)
            }
            other => Err(input_mismatch(plan.task, "prompt", other)),
        }
    }

    fn decode(
        &self,
        plan: &InvocationPlan<'_>,
        _input: &PreparedInput,
        raw: RawOutput,
    ) -> Result<Decoded> {
        match raw {
            RawOutput::Images(images) => Ok(Decoded {
                output: RawOutput::Images(images),
                token_counts: Vec::new(),
            }),
            other => Err(output_mismatch(plan.task, "images", &other)),
        }
    }

    fn builds_inside_timer(&self) -> bool {
        true
    }
}

/// Batch translation through the model's dedicated entry point
struct TextTranslationStrategy;

impl InvocationStrategy for TextTranslationStrategy {
    fn build_input(&self, plan: &InvocationPlan<'_>, batch: InputBatch) -> Result<PreparedInput> {
        expect_texts(plan.task, batch).map(PreparedInput::Texts)
    }

    fn invoke(&self, plan: &InvocationPlan<'_>, input: &PreparedInput) -> Result<RawOutput> {
        match input {
            PreparedInput::Texts(texts) => plan
                .model
                .translate_batch(texts)
                .map(RawOutput::Translations),
            other => Err(input_mismatch(plan.task, "texts", other)),
        }
    }

    fn decode(
        &self,
        plan: &InvocationPlan<'_>,
        _input: &PreparedInput,
        raw: RawOutput,
    ) -> Result<Decoded> {
        match raw {
            RawOutput::Translations(rows) => Ok(Decoded {
                output: RawOutput::Translations(rows),
                token_counts: Vec::new(),
            }),
            other => Err(output_mismatch(plan.task, "translations", &other)),
        }
    }

    fn builds_inside_timer(&self) -> bool {
        true
    }
}

// ============================================================================
// Token-classification task
// ============================================================================

/// Token classification decoded into (tokens, label indices)
struct EntityRecognitionStrategy;

impl InvocationStrategy for EntityRecognitionStrategy {
    fn build_input(&self, plan: &InvocationPlan<'_>, batch: InputBatch) -> Result<PreparedInput> {
        let texts = expect_texts(plan.task, batch)?;
        let encoding = require_tokenizer(plan)?.tokenize(&texts)?;
        // Ids move to the device; the mask stays behind and is never passed
        // to the call itself.
        Ok(PreparedInput::Ids(encoding))
    }

    fn invoke(&self, plan: &InvocationPlan<'_>, input: &PreparedInput) -> Result<RawOutput> {
        match input {
            PreparedInput::Ids(encoding) => {
                plan.model.forward_ids(encoding).map(RawOutput::Tensor)
            }
            other => Err(input_mismatch(plan.task, "ids", other)),
        }
    }

    fn decode(
        &self,
        plan: &InvocationPlan<'_>,
        input: &PreparedInput,
        raw: RawOutput,
    ) -> Result<Decoded> {
        let logits = expect_tensor_output(plan.task, raw)?;
        let encoding = match input {
            PreparedInput::Ids(encoding) => encoding,
            other => return Err(input_mismatch(plan.task, "ids", other)),
        };
        let entities = require_tokenizer(plan)?.decode_entities(encoding, &logits)?;
        let token_counts = vec![entities.tokens.len()];
        Ok(Decoded {
            output: RawOutput::Entities(entities),
            token_counts,
        })
    }

    fn builds_inside_timer(&self) -> bool {
        true
    }
}

// ============================================================================
// Generative tasks
// ============================================================================

/// Autoregressive text generation
struct TextGenerationStrategy;

impl InvocationStrategy for TextGenerationStrategy {
    fn build_input(&self, plan: &InvocationPlan<'_>, batch: InputBatch) -> Result<PreparedInput> {
        let texts = expect_texts(plan.task, batch)?;
        let encoding = require_tokenizer(plan)?.tokenize(&texts)?;
        Ok(PreparedInput::Encodings(encoding))
    }

    fn invoke(&self, plan: &InvocationPlan<'_>, input: &PreparedInput) -> Result<RawOutput> {
        match input {
            PreparedInput::Encodings(encoding) => {
                plan.model.generate(encoding).map(RawOutput::Grid)
            }
            other => Err(input_mismatch(plan.task, "encodings", other)),
        }
    }

    fn decode(
        &self,
        plan: &InvocationPlan<'_>,
        _input: &PreparedInput,
        raw: RawOutput,
    ) -> Result<Decoded> {
        let grid = expect_grid_output(plan.task, raw)?;
        let token_counts = generated_token_counts(&grid, plan.prompt_len, FILLER_TOKEN);
        debug!("generated tokens: {token_counts:?}");
        let rows = require_tokenizer(plan)?.decode(&grid)?;
        Ok(Decoded {
            output: RawOutput::Text(rows),
            token_counts,
        })
    }
}

/// Fixed-width batch text generation
///
/// Every output row occupies the full grid width, so the token count is
/// seeded once at planning time rather than recovered per iteration.
struct BatchTextGenerationStrategy;

impl InvocationStrategy for BatchTextGenerationStrategy {
    fn build_input(&self, plan: &InvocationPlan<'_>, batch: InputBatch) -> Result<PreparedInput> {
        let texts = expect_texts(plan.task, batch)?;
        let encoding = require_tokenizer(plan)?.tokenize(&texts)?;
        Ok(PreparedInput::Encodings(encoding))
    }

    fn invoke(&self, plan: &InvocationPlan<'_>, input: &PreparedInput) -> Result<RawOutput> {
        match input {
            PreparedInput::Encodings(encoding) => {
                plan.model.generate_batch(encoding).map(RawOutput::Grid)
            }
            other => Err(input_mismatch(plan.task, "encodings", other)),
        }
    }

    fn decode(
        &self,
        plan: &InvocationPlan<'_>,
        _input: &PreparedInput,
        raw: RawOutput,
    ) -> Result<Decoded> {
        let grid = expect_grid_output(plan.task, raw)?;
        let rows = require_tokenizer(plan)?.decode(&grid)?;
        Ok(Decoded {
            output: RawOutput::Text(rows),
            token_counts: Vec::new(),
        })
    }
}

/// Audio transcription
struct SpeechToTextStrategy;

impl InvocationStrategy for SpeechToTextStrategy {
    fn build_input(&self, plan: &InvocationPlan<'_>, batch: InputBatch) -> Result<PreparedInput> {
        let clip = expect_audio(plan.task, batch)?;
        let processor = require_processor(plan)?;
        let features = processor.process(&clip.waveform, clip.sample_rate)?;
        Ok(PreparedInput::Features {
            features,
            audio_len: clip.length,
        })
    }

    fn invoke(&self, plan: &InvocationPlan<'_>, input: &PreparedInput) -> Result<RawOutput> {
        match input {
            PreparedInput::Features { features, .. } => {
                plan.model.transcribe(features).map(RawOutput::Grid)
            }
            other => Err(input_mismatch(plan.task, "features", other)),
        }
    }

    fn decode(
        &self,
        plan: &InvocationPlan<'_>,
        _input: &PreparedInput,
        raw: RawOutput,
    ) -> Result<Decoded> {
        let grid = expect_grid_output(plan.task, raw)?;
        let token_counts = generated_token_counts(&grid, plan.prompt_len, FILLER_TOKEN);
        debug!("generated tokens: {token_counts:?}");
        let rows = require_processor(plan)?.decode(&grid)?;
        Ok(Decoded {
            output: RawOutput::Text(rows),
            token_counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_covers_every_task() {
        let registry = StrategyRegistry::new();
        for task in TaskType::ALL {
            assert!(registry.get(task).is_ok(), "missing strategy for {task}");
        }
    }

    #[test]
    fn test_empty_registry_fails_with_unsupported_task() {
        let registry = StrategyRegistry::empty();
        let err = registry.get(TaskType::Classification).err().unwrap();
        assert!(matches!(
            err,
            MedirError::UnsupportedTask {
                stage: "input-construction",
                ..
            }
        ));
    }

    #[test]
    fn test_prompt_driven_tasks_build_inside_timer() {
        let registry = StrategyRegistry::new();
        assert!(registry.get(TaskType::TextToImage).unwrap().builds_inside_timer());
        assert!(registry
            .get(TaskType::TextTranslation)
            .unwrap()
            .builds_inside_timer());
        assert!(registry
            .get(TaskType::NamedEntityRecognition)
            .unwrap()
            .builds_inside_timer());
        assert!(!registry.get(TaskType::Feedforward).unwrap().builds_inside_timer());
        assert!(!registry
            .get(TaskType::TextGeneration)
            .unwrap()
            .builds_inside_timer());
    }

    #[test]
    fn test_prepared_input_audio_len() {
        let features = PreparedInput::Features {
            features: AudioFeatures {
                features: vec![0.0],
                frames: 1,
            },
            audio_len: 1600.0,
        };
        assert_eq!(features.audio_len(), Some(1600.0));
        assert_eq!(PreparedInput::Prompt(String::new()).audio_len(), None);
    }
}
