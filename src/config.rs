//! Configuration for the Buddy conversation core
//!
//! Everything is optional on disk: a missing file or a missing key falls back
//! to a default that matches the shipped assistant ("hey buddy", 24h session
//! TTL, five-chunk retrieval). Service blocks without an endpoint leave the
//! corresponding collaborator unconfigured, which surfaces as
//! `ServiceUnavailable` at call time rather than at startup.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Wake word listener settings
    pub wake: WakeConfig,

    /// Conversation session settings
    pub session: SessionConfig,

    /// Retrieval defaults for knowledge search
    pub search: SearchConfig,

    /// External service endpoints
    pub services: ServicesConfig,
}

/// Wake word listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    /// Trigger phrase, matched case-insensitively against utterances
    pub phrase: String,

    /// Capacity of the recent-detections ring buffer
    pub ring_capacity: usize,

    /// Capacity of the detection broadcast bus
    pub bus_capacity: usize,

    /// Seconds of bus silence before a subscriber receives a heartbeat
    pub heartbeat_secs: u64,

    /// Seconds to wait for the listening task to confirm shutdown
    pub stop_timeout_secs: u64,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            phrase: "hey buddy".to_string(),
            ring_capacity: 10,
            bus_capacity: 64,
            heartbeat_secs: 30,
            stop_timeout_secs: 5,
        }
    }
}

impl WakeConfig {
    /// Heartbeat interval as a [`Duration`]
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    /// Stop timeout as a [`Duration`]
    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

/// Conversation session settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds of inactivity before a session is treated as expired
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        // 24 hours
        Self { ttl_secs: 86_400 }
    }
}

impl SessionConfig {
    /// Session TTL as a [`Duration`]
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Retrieval defaults for knowledge search
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum chunks returned per query
    pub max_chunks: usize,

    /// Minimum similarity score for a chunk to be considered relevant
    pub similarity_threshold: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_chunks: 5,
            similarity_threshold: 0.7,
        }
    }
}

/// External service endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Speech recognition (transcription) service
    pub recognition: Option<RecognitionConfig>,

    /// Knowledge store (vector search) service
    pub knowledge: Option<KnowledgeConfig>,

    /// Language answering (LLM) service
    pub answer: Option<AnswerConfig>,

    /// Speech synthesis service
    pub synthesis: Option<SynthesisConfig>,
}

/// Whisper-compatible transcription endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionConfig {
    /// Base URL (e.g. `https://api.openai.com/v1`)
    pub base_url: String,
    /// Bearer API key
    pub api_key: String,
    /// Model identifier (e.g. `whisper-1`)
    #[serde(default = "default_recognition_model")]
    pub model: String,
}

fn default_recognition_model() -> String {
    "whisper-1".to_string()
}

/// Vector search endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeConfig {
    /// Base URL of the search service
    pub base_url: String,
    /// Collection to query
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_collection() -> String {
    "workshop-manuals".to_string()
}

/// Chat-completions-compatible answering endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerConfig {
    /// Base URL (e.g. `https://api.openai.com/v1`)
    pub base_url: String,
    /// Bearer API key
    pub api_key: String,
    /// Model identifier
    pub model: String,
}

/// Speech-compatible synthesis endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    /// Base URL (e.g. `https://api.openai.com/v1`)
    pub base_url: String,
    /// Bearer API key
    pub api_key: String,
    /// Model identifier (e.g. `tts-1`)
    #[serde(default = "default_synthesis_model")]
    pub model: String,
}

fn default_synthesis_model() -> String {
    "tts-1".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Check constraints that serde defaults cannot enforce
    ///
    /// An empty wake phrase would match every utterance at position zero, so
    /// it is rejected here rather than silently detecting everything.
    ///
    /// # Errors
    ///
    /// Returns error if the wake phrase is empty after trimming
    pub fn validate(&self) -> Result<()> {
        if self.wake.phrase.trim().is_empty() {
            return Err(Error::Config("wake phrase must not be empty".to_string()));
        }
        Ok(())
    }

    /// Load from a file if it exists, otherwise fall back to defaults
    ///
    /// # Errors
    ///
    /// Returns error only if the file exists but cannot be parsed
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }
}
