//! Task type tags
//!
//! `TaskType` selects which input/invoke/decode strategy applies. Exactly
//! one task type is active per benchmark run; it is immutable once selected
//! and drives every dispatch in the engine.

use serde::{Deserialize, Serialize};

use crate::error::MedirError;

/// Supported benchmark task types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    /// Plain tensor-in, tensor-out inference without postprocessing
    Feedforward,
    /// Tensor inference followed by a softmax over the class dimension
    Classification,
    /// Prompt-driven image synthesis
    TextToImage,
    /// Token classification decoded into (tokens, label indices)
    NamedEntityRecognition,
    /// Object detection returning a tuple of outputs (yolo-style)
    Detection,
    /// Autoregressive text generation
    TextGeneration,
    /// Fixed-width batch text generation
    BatchTextGeneration,
    /// Batch translation through a dedicated entry point
    TextTranslation,
    /// Audio transcription
    SpeechToText,
}

impl TaskType {
    /// Every supported task type, in declaration order
    pub const ALL: [TaskType; 9] = [
        TaskType::Feedforward,
        TaskType::Classification,
        TaskType::TextToImage,
        TaskType::NamedEntityRecognition,
        TaskType::Detection,
        TaskType::TextGeneration,
        TaskType::BatchTextGeneration,
        TaskType::TextTranslation,
        TaskType::SpeechToText,
    ];

    /// Canonical string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feedforward => "feedforward",
            Self::Classification => "classification",
            Self::TextToImage => "text-to-image",
            Self::NamedEntityRecognition => "named-entity-recognition",
            Self::Detection => "detection",
            Self::TextGeneration => "text-generation",
            Self::BatchTextGeneration => "batch-text-generation",
            Self::TextTranslation => "text-translation",
            Self::SpeechToText => "speech-to-text",
        }
    }

    /// Parse from string, accepting common aliases
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "feedforward" => Some(Self::Feedforward),
            "classification" => Some(Self::Classification),
            "text-to-image" => Some(Self::TextToImage),
            "named-entity-recognition" | "ner" => Some(Self::NamedEntityRecognition),
            "detection" | "yolo" | "yolo-v7" | "yolo_v7" => Some(Self::Detection),
            "text-generation" => Some(Self::TextGeneration),
            "batch-text-generation" => Some(Self::BatchTextGeneration),
            "text-translation" => Some(Self::TextTranslation),
            "speech-to-text" => Some(Self::SpeechToText),
            _ => None,
        }
    }

    /// Whether the model output is a generated token grid
    #[must_use]
    pub fn is_generative(&self) -> bool {
        matches!(
            self,
            Self::TextGeneration | Self::BatchTextGeneration | Self::SpeechToText
        )
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskType {
    type Err = MedirError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| MedirError::UnsupportedTask {
            task: s.to_string(),
            stage: "task parsing",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_parse_round_trip() {
        for task in TaskType::ALL {
            assert_eq!(TaskType::parse(task.as_str()), Some(task));
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(TaskType::parse("ner"), Some(TaskType::NamedEntityRecognition));
        assert_eq!(TaskType::parse("yolo_v7"), Some(TaskType::Detection));
        assert_eq!(TaskType::parse("YOLO-V7"), Some(TaskType::Detection));
    }

    #[test]
    fn test_parse_unknown_is_none() {
        assert_eq!(TaskType::parse("image-captioning"), None);
    }

    #[test]
    fn test_from_str_unknown_fails_with_unsupported_task() {
        let err = "underwater-basket-weaving".parse::<TaskType>().unwrap_err();
        assert!(matches!(
            err,
            crate::error::MedirError::UnsupportedTask { stage: "task parsing", .. }
        ));
    }

    #[test]
    fn test_serde_kebab_case() {
        let json = serde_json::to_string(&TaskType::NamedEntityRecognition).unwrap();
        assert_eq!(json, "\"named-entity-recognition\"");
        let task: TaskType = serde_json::from_str("\"speech-to-text\"").unwrap();
        assert_eq!(task, TaskType::SpeechToText);
    }

    #[test]
    fn test_is_generative() {
        assert!(TaskType::TextGeneration.is_generative());
        assert!(TaskType::SpeechToText.is_generative());
        assert!(!TaskType::Classification.is_generative());
        assert!(!TaskType::TextTranslation.is_generative());
    }
}
