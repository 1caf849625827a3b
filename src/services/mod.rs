//! External collaborator seams
//!
//! The core talks to four external services: speech recognition, knowledge
//! search, answer generation, and speech synthesis. Each is a trait here so
//! the orchestrator and tests never depend on a concrete backend; the
//! submodules provide HTTP-backed adapters for hosted APIs.

mod answer;
mod knowledge;
mod recognition;
mod synthesis;

pub use answer::ChatAnswerer;
pub use knowledge::HttpKnowledgeStore;
pub use recognition::WhisperRecognizer;
pub use synthesis::HttpSynthesizer;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::session::Turn;

/// A recognized utterance with the recognizer's confidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    pub confidence: f32,
}

/// A retrieved knowledge chunk, scored by similarity to the query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub similarity_score: f32,
}

/// Synthesis voice parameters
///
/// Defaults match the shipped assistant: 150 words per minute at 80% volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Speaking rate in words per minute, valid range 50..=300
    pub rate: u32,
    /// Output volume, valid range 0.0..=1.0
    pub volume: f32,
    /// Voice identifier, `"default"` for the engine's default voice
    pub voice: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            rate: 150,
            volume: 0.8,
            voice: "default".to_string(),
        }
    }
}

/// Stream of recognized utterances from continuous recognition
///
/// The stream owns the underlying audio resource; dropping it releases the
/// resource, which is how cooperative cancellation reaches the recognizer.
pub type UtteranceStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Speech recognition: one-shot transcription and continuous listening
#[async_trait]
pub trait SpeechRecognition: Send + Sync {
    /// Transcribe a complete audio clip
    async fn recognize(&self, audio: &[u8]) -> Result<Transcription>;

    /// Open a continuous recognition stream, tuned for the wake phrase
    ///
    /// Yields utterances until the returned stream is dropped.
    async fn recognize_stream(&self, wake_phrase: &str) -> Result<UtteranceStream>;
}

/// Vector similarity search over the knowledge base
#[async_trait]
pub trait KnowledgeSearch: Send + Sync {
    /// Return up to `max_chunks` chunks scoring at least
    /// `similarity_threshold`, ordered by descending score
    async fn search(
        &self,
        query: &str,
        max_chunks: usize,
        similarity_threshold: f32,
    ) -> Result<Vec<KnowledgeChunk>>;
}

/// Context-aware answer generation
#[async_trait]
pub trait AnswerService: Send + Sync {
    /// Answer `query` using retrieved `chunks` and the prior conversation
    async fn summarize(
        &self,
        query: &str,
        chunks: &[KnowledgeChunk],
        history: &[Turn],
    ) -> Result<String>;
}

/// Text-to-speech synthesis
#[async_trait]
pub trait SpeechSynthesis: Send + Sync {
    /// Render `text` as WAV audio bytes
    async fn synthesize(&self, text: &str, settings: &VoiceSettings) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_settings_defaults() {
        let settings = VoiceSettings::default();
        assert_eq!(settings.rate, 150);
        assert!((settings.volume - 0.8).abs() < f32::EPSILON);
        assert_eq!(settings.voice, "default");
    }

    #[test]
    fn voice_settings_partial_json_fills_defaults() {
        let settings: VoiceSettings = serde_json::from_str(r#"{"rate": 200}"#).unwrap();
        assert_eq!(settings.rate, 200);
        assert!((settings.volume - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn knowledge_chunk_round_trips() {
        let chunk: KnowledgeChunk = serde_json::from_str(
            r#"{"content": "bleed the brakes", "metadata": {"page": 12}, "similarity_score": 0.91}"#,
        )
        .unwrap();
        assert_eq!(chunk.content, "bleed the brakes");
        assert_eq!(chunk.metadata["page"], 12);
    }
}
