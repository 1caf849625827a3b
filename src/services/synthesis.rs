//! Speech synthesis over a speech-compatible HTTP API

use async_trait::async_trait;

use super::{SpeechSynthesis, VoiceSettings};
use crate::config::SynthesisConfig;
use crate::{Error, Result};

/// Rate that maps to a 1.0 speed multiplier
const BASELINE_RATE: f32 = 150.0;

#[derive(serde::Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'static str,
}

/// Text-to-speech against a speech endpoint, returning WAV bytes
pub struct HttpSynthesizer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpSynthesizer {
    /// Create a synthesizer from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(config: &SynthesisConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Config("synthesis API key required".to_string()));
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
impl SpeechSynthesis for HttpSynthesizer {
    async fn synthesize(&self, text: &str, settings: &VoiceSettings) -> Result<Vec<u8>> {
        // The endpoint takes a speed multiplier, not words per minute.
        // Volume is not supported by the speech API and is left to playback.
        #[allow(clippy::cast_precision_loss)]
        let speed = settings.rate as f32 / BASELINE_RATE;

        let voice = if settings.voice == "default" {
            "alloy"
        } else {
            settings.voice.as_str()
        };

        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice,
            speed,
            response_format: "wav",
        };

        tracing::debug!(chars = text.len(), voice, speed, "synthesizing speech");

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "synthesis API error");
            return Err(Error::ServiceUnavailable(format!(
                "synthesis API error {status}: {body}"
            )));
        }

        let audio = response.bytes().await?;
        tracing::info!(audio_bytes = audio.len(), "synthesis complete");
        Ok(audio.to_vec())
    }
}
