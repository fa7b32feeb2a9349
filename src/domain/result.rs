//! Typed view over the opaque pipeline result payload.
//!
//! The poller never interprets `result`; this view exists for the results
//! screen and the CLI summary. Every field is optional so that a backend
//! adding or dropping sections never breaks the raw pass-through.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A scored sound label from the audio classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSound {
    pub sound: String,
    pub confidence: f64,
}

/// Audio classifier output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierInference {
    pub dominant_sound: String,
    pub dominant_confidence: f64,
    #[serde(default)]
    pub top_sounds: Vec<ScoredSound>,
    #[serde(default)]
    pub all_scores: HashMap<String, f64>,
}

/// One transcription segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechSegment {
    pub id: i64,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Speech-to-text output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechInference {
    pub has_speech: bool,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub segments: Vec<SpeechSegment>,
}

/// Reasoner inference, either a single answer or several
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Inference {
    Single(String),
    Many(Vec<String>),
}

impl Inference {
    pub fn joined(&self) -> String {
        match self {
            Self::Single(text) => text.clone(),
            Self::Many(parts) => parts.join("\n"),
        }
    }
}

/// Reasoner output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonerResult {
    pub success: bool,
    #[serde(default)]
    pub inference: Option<Inference>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub soft_prompt_used: Option<String>,
}

/// Processing metadata attached by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub audio_file: String,
    pub processing_time_seconds: f64,
    pub timestamp: String,
    #[serde(default)]
    pub user_prompt: Option<String>,
}

/// Structured results of a completed run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    #[serde(default, rename = "clap_inf")]
    pub classifier: Option<ClassifierInference>,

    #[serde(default, rename = "speech_inf")]
    pub speech: Option<SpeechInference>,

    #[serde(default, rename = "mellow_inf")]
    pub reasoner: Option<ReasonerResult>,

    #[serde(default)]
    pub metadata: Option<ResultMetadata>,

    #[serde(default)]
    pub soft_prompts: HashMap<String, String>,
}

impl PipelineResult {
    /// Interpret a raw result payload; `None` if it does not fit the shape
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Short human-readable summary lines
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        if let Some(ref clap) = self.classifier {
            lines.push(format!(
                "Dominant sound: {} ({:.1}%)",
                clap.dominant_sound,
                clap.dominant_confidence * 100.0
            ));
        }

        if let Some(ref speech) = self.speech {
            if speech.has_speech {
                let language = speech.language.as_deref().unwrap_or("unknown");
                let text = speech.text.as_deref().unwrap_or("").trim();
                lines.push(format!("Speech [{}]: {}", language, text));
            } else {
                lines.push("Speech: none detected".to_string());
            }
        }

        if let Some(ref reasoner) = self.reasoner {
            match (&reasoner.inference, &reasoner.error) {
                (Some(inference), _) if reasoner.success => {
                    lines.push(format!("Reasoning: {}", inference.joined()));
                }
                (_, Some(error)) => lines.push(format!("Reasoning failed: {}", error)),
                _ => lines.push("Reasoning: no output".to_string()),
            }
        }

        if let Some(ref meta) = self.metadata {
            lines.push(format!(
                "Processed {} in {:.2}s",
                meta.audio_file, meta.processing_time_seconds
            ));
        }

        lines
    }
}
