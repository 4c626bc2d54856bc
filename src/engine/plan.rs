//! Per-run invocation planning
//!
//! The plan binds everything that is fixed for a run — model handle, device,
//! declared input names, tokenizer/processor collaborators, prompt token
//! length, audio sample rate — so that only input data varies per iteration.
//! Replacing per-iteration rebinding with a plan value keeps the per-run /
//! per-iteration split explicit.

use std::sync::Arc;

use log::debug;

use crate::device::Device;
use crate::engine::batch::SliceSource;
use crate::engine::strategy::{expect_audio, expect_texts, PreparedInput, MAX_TEXT_LEN};
use crate::engine::RunOptions;
use crate::error::Result;
use crate::model::{AudioFrontend, ModelBackend, TextCodec};
use crate::task::TaskType;

/// Per-run bound state for issuing iterations
pub struct InvocationPlan<'m> {
    /// Active task type; drives every dispatch
    pub task: TaskType,
    /// Target device for device-resident payloads
    pub device: Device,
    /// Declared input tensor names, in call order
    pub input_names: Vec<String>,
    /// Inference-only execution hint recorded for the backend
    pub inference_mode: bool,
    /// Opaque model handle
    pub model: &'m dyn ModelBackend,
    /// Tokenizer bound at planning time (generative and NER tasks)
    pub tokenizer: Option<Arc<dyn TextCodec>>,
    /// Audio processor bound at planning time (speech)
    pub processor: Option<Arc<dyn AudioFrontend>>,
    /// Prompt token count subtracted from generated row lengths
    pub prompt_len: usize,
    /// Shared audio sample rate for the run
    pub sample_rate: Option<u32>,
    /// Input prepared during planning, consumed by the single-shot path
    pub planned_input: Option<PreparedInput>,
    /// Token counts seeded at planning time (fixed-width batch generation)
    pub planned_tokens: Vec<usize>,
    /// Audio lengths recorded at planning time, in waveform samples
    pub planned_audio: Vec<f64>,
}

/// Build the invocation plan for one run
///
/// Generative tasks draw one slice here to fix the prompt token length
/// (text generation), seed the fixed batch-generation token count, or
/// precompute audio features and the shared sample rate (speech). The
/// planned input is reused by the single-shot path only; looped iterations
/// always draw fresh slices.
pub(crate) fn build_plan<'m>(
    model: &'m dyn ModelBackend,
    source: &mut dyn SliceSource,
    options: &RunOptions,
) -> Result<InvocationPlan<'m>> {
    let mut plan = InvocationPlan {
        task: options.task,
        device: options.device,
        input_names: options.input_names.clone(),
        inference_mode: options.inference_mode,
        model,
        tokenizer: None,
        processor: None,
        prompt_len: 0,
        sample_rate: None,
        planned_input: None,
        planned_tokens: Vec::new(),
        planned_audio: Vec::new(),
    };

    match options.task {
        TaskType::TextGeneration | TaskType::BatchTextGeneration => {
            let tokenizer = model.tokenizer()?;
            let texts = expect_texts(options.task, source.next_slice()?)?;
            let encoding = tokenizer.tokenize(&texts)?;
            if options.task == TaskType::TextGeneration {
                plan.prompt_len = encoding.seq_len();
                debug!("encoded prompt tokens: {}", plan.prompt_len);
            } else {
                plan.planned_tokens.push(MAX_TEXT_LEN);
            }
            plan.planned_input = Some(PreparedInput::Encodings(encoding));
            plan.tokenizer = Some(tokenizer);
        }
        TaskType::NamedEntityRecognition => {
            plan.tokenizer = Some(model.tokenizer()?);
        }
        TaskType::SpeechToText => {
            let processor = model.audio_processor()?;
            let clip = expect_audio(options.task, source.next_slice()?)?;
            plan.planned_audio.push(clip.length);
            let features = processor.process(&clip.waveform, clip.sample_rate)?;
            plan.sample_rate = Some(processor.sampling_rate());
            plan.planned_input = Some(PreparedInput::Features {
                features,
                audio_len: clip.length,
            });
            plan.processor = Some(processor);
        }
        _ => {}
    }

    Ok(plan)
}
