//! Buddy Core - conversation orchestration for a voice assistant
//!
//! This library turns a spoken or typed query into an answer while keeping
//! multi-turn context and segmenting conversations into topics:
//! - Session store with lazy TTL expiry and per-session locking
//! - Deterministic keyword topic classification
//! - Wake word listener with a multi-subscriber detection bus
//! - Query pipeline over external recognition/search/answer/synthesis
//!   services
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              Transport (HTTP, external)               │
//! └────────────────────┬─────────────────────────────────┘
//!                      │
//! ┌────────────────────▼─────────────────────────────────┐
//! │                  AppContext                           │
//! │  WakeWordController ──► PipelineOrchestrator          │
//! │        │                   │         │                │
//! │   detection bus      SessionStore  TopicClassifier    │
//! └────────────────────────┬─────────────────────────────┘
//!                          │
//! ┌────────────────────────▼─────────────────────────────┐
//! │  External services: recognition │ search │ LLM │ TTS  │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod services;
pub mod session;
pub mod topic;
pub mod wake;

pub use config::Config;
pub use context::AppContext;
pub use error::{Error, ErrorKind, Result};
pub use pipeline::{PipelineOrchestrator, QueryOutcome};
pub use services::{
    AnswerService, KnowledgeChunk, KnowledgeSearch, SpeechRecognition, SpeechSynthesis,
    Transcription, UtteranceStream, VoiceSettings,
};
pub use session::{Role, Session, SessionStore, SessionSummary, Turn};
pub use topic::{TopicClassifier, TopicTable};
pub use wake::{
    CommandOutcome, DetectionEvent, DetectionSubscriber, WakeStatus, WakeWordController,
    WakeWordDetection,
};
