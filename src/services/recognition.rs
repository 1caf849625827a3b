//! Speech recognition over a Whisper-compatible HTTP API

use async_trait::async_trait;

use super::{SpeechRecognition, Transcription, UtteranceStream};
use crate::config::RecognitionConfig;
use crate::{Error, Result};

/// Confidence reported when the API does not provide one
const DEFAULT_CONFIDENCE: f32 = 0.95;

/// Response from the transcription endpoint
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// One-shot transcription against a Whisper-compatible endpoint
pub struct WhisperRecognizer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl WhisperRecognizer {
    /// Create a recognizer from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(config: &RecognitionConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Config(
                "recognition API key required".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl SpeechRecognition for WhisperRecognizer {
    async fn recognize(&self, audio: &[u8]) -> Result<Transcription> {
        tracing::debug!(audio_bytes = audio.len(), "starting transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Internal(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::ServiceUnavailable(format!(
                "transcription API error {status}: {body}"
            )));
        }

        let result: TranscriptionResponse = response.json().await?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(Transcription {
            text: result.text,
            confidence: result.confidence.unwrap_or(DEFAULT_CONFIDENCE),
        })
    }

    async fn recognize_stream(&self, _wake_phrase: &str) -> Result<UtteranceStream> {
        // A one-shot HTTP transcriber has no microphone; continuous
        // recognition needs a streaming backend injected behind the same
        // trait.
        Err(Error::ServiceUnavailable(
            "continuous recognition requires a streaming recognizer".to_string(),
        ))
    }
}
