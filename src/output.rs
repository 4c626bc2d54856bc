//! Presentation formatting for raw model results
//!
//! Maps a task type and a raw model result into a display-ready structure,
//! independent of timing. The dispatch table mirrors the invocation
//! strategies; the output-name validation is independent of the task type
//! and fails before any task dispatch.

use log::info;
use serde::{Deserialize, Serialize};

use crate::engine::RawOutput;
use crate::error::{MedirError, Result};
use crate::task::TaskType;
use crate::tensor::Tensor;
use crate::model::ImageSet;

/// One token paired with its predicted label index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledToken {
    /// Surface token
    pub token: String,
    /// Predicted label index
    pub label: usize,
}

/// Display-ready structure derived from a raw model result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DisplayOutput {
    /// Nothing to display (feedforward)
    Empty,
    /// Raw tensor passthrough (detection)
    Tensor(Tensor),
    /// Named numeric array (classification)
    Named {
        /// Declared output name
        name: String,
        /// Output values as a plain array
        values: Vec<f32>,
    },
    /// Text rows (generation, translation, transcription)
    Text(Vec<String>),
    /// Synthesized images
    Images(ImageSet),
    /// Labeled tokens (entity recognition)
    Entities(Vec<LabeledToken>),
}

/// Map a task type and raw result to a display structure
///
/// # Errors
///
/// Returns `InvalidConfiguration` if `output_names` is empty — regardless
/// of the task type — or if the raw result's shape does not match the task.
pub fn format_output(
    raw: &RawOutput,
    output_names: &[String],
    task: TaskType,
) -> Result<DisplayOutput> {
    if output_names.is_empty() {
        return Err(MedirError::InvalidConfiguration(
            "the number of output tensors does not match the number of output names".to_string(),
        ));
    }

    match task {
        TaskType::Feedforward => Ok(DisplayOutput::Empty),
        TaskType::Classification => match raw {
            RawOutput::Tensor(tensor) => {
                info!("converting output tensor to print results");
                Ok(DisplayOutput::Named {
                    name: output_names[0].clone(),
                    values: tensor.data().to_vec(),
                })
            }
            other => Err(mismatch(task, other)),
        },
        TaskType::Detection => match raw {
            RawOutput::Tensor(tensor) => Ok(DisplayOutput::Tensor(tensor.clone())),
            other => Err(mismatch(task, other)),
        },
        TaskType::TextToImage => match raw {
            RawOutput::Images(images) => Ok(DisplayOutput::Images(images.clone())),
            other => Err(mismatch(task, other)),
        },
        TaskType::NamedEntityRecognition => match raw {
            RawOutput::Entities(entities) => {
                let labeled = entities
                    .tokens
                    .iter()
                    .zip(&entities.label_indices)
                    .map(|(token, &label)| LabeledToken {
                        token: token.clone(),
                        label,
                    })
                    .collect();
                Ok(DisplayOutput::Entities(labeled))
            }
            other => Err(mismatch(task, other)),
        },
        TaskType::TextGeneration | TaskType::BatchTextGeneration | TaskType::SpeechToText => {
            match raw {
                RawOutput::Text(rows) => Ok(DisplayOutput::Text(rows.clone())),
                other => Err(mismatch(task, other)),
            }
        }
        TaskType::TextTranslation => match raw {
            RawOutput::Translations(rows) => Ok(DisplayOutput::Text(rows.clone())),
            other => Err(mismatch(task, other)),
        },
    }
}

fn mismatch(task: TaskType, raw: &RawOutput) -> MedirError {
    MedirError::InvalidConfiguration(format!(
        "task '{task}' cannot display a {} result",
        raw.kind()
    ))
}
