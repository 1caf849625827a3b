//! Process-scoped application context
//!
//! Owns the session store, pipeline, and wake word controller for the
//! lifetime of the process. Built once at startup and handed to request
//! handlers; nothing in the core is reachable as ambient global state.

use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::PipelineOrchestrator;
use crate::services::{
    AnswerService, ChatAnswerer, HttpKnowledgeStore, HttpSynthesizer, KnowledgeSearch,
    SpeechRecognition, SpeechSynthesis, WhisperRecognizer,
};
use crate::session::SessionStore;
use crate::topic::TopicClassifier;
use crate::wake::WakeWordController;
use crate::Result;

/// Everything a request handler needs, wired together
pub struct AppContext {
    pub config: Config,
    pub sessions: Arc<SessionStore>,
    pub pipeline: Arc<PipelineOrchestrator>,
    pub wake: Arc<WakeWordController>,
}

impl AppContext {
    /// Build the context from configuration, constructing HTTP service
    /// adapters for every configured endpoint
    ///
    /// Unconfigured services stay `None` and fail with `ServiceUnavailable`
    /// at call time; the wake controller always needs a recognizer, so an
    /// unconfigured one is replaced by a recognizer that refuses to stream.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid (e.g. empty wake phrase
    /// or empty API key in a configured service block).
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;

        let recognition: Option<Arc<dyn SpeechRecognition>> =
            match config.services.recognition.as_ref() {
                Some(cfg) => {
                    tracing::info!(url = %cfg.base_url, model = %cfg.model, "recognition configured");
                    Some(Arc::new(WhisperRecognizer::new(cfg)?))
                }
                None => None,
            };

        let knowledge: Option<Arc<dyn KnowledgeSearch>> = config
            .services
            .knowledge
            .as_ref()
            .map(|cfg| {
                tracing::info!(url = %cfg.base_url, collection = %cfg.collection, "knowledge store configured");
                Arc::new(HttpKnowledgeStore::new(cfg)) as Arc<dyn KnowledgeSearch>
            });

        let answerer: Option<Arc<dyn AnswerService>> = match config.services.answer.as_ref() {
            Some(cfg) => {
                tracing::info!(url = %cfg.base_url, model = %cfg.model, "answering service configured");
                Some(Arc::new(ChatAnswerer::new(cfg)?))
            }
            None => None,
        };

        let synthesizer: Option<Arc<dyn SpeechSynthesis>> =
            match config.services.synthesis.as_ref() {
                Some(cfg) => {
                    tracing::info!(url = %cfg.base_url, model = %cfg.model, "synthesis configured");
                    Some(Arc::new(HttpSynthesizer::new(cfg)?))
                }
                None => None,
            };

        Ok(Self::assemble(config, recognition, knowledge, answerer, synthesizer))
    }

    /// Wire a context from pre-built services (used by tests and embedders)
    #[must_use]
    pub fn assemble(
        config: Config,
        recognition: Option<Arc<dyn SpeechRecognition>>,
        knowledge: Option<Arc<dyn KnowledgeSearch>>,
        answerer: Option<Arc<dyn AnswerService>>,
        synthesizer: Option<Arc<dyn SpeechSynthesis>>,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(config.session.ttl()));

        let pipeline = Arc::new(PipelineOrchestrator::new(
            Arc::clone(&sessions),
            TopicClassifier::default(),
            config.search.clone(),
            recognition.clone(),
            knowledge,
            answerer,
            synthesizer,
        ));

        let listener_recognition =
            recognition.unwrap_or_else(|| Arc::new(UnconfiguredRecognizer));
        let wake = Arc::new(WakeWordController::new(
            &config.wake,
            listener_recognition,
            Arc::clone(&pipeline),
        ));

        Self {
            config,
            sessions,
            pipeline,
            wake,
        }
    }
}

/// Stand-in recognizer when no recognition service is configured
struct UnconfiguredRecognizer;

#[async_trait::async_trait]
impl SpeechRecognition for UnconfiguredRecognizer {
    async fn recognize(&self, _audio: &[u8]) -> Result<crate::services::Transcription> {
        Err(crate::Error::ServiceUnavailable(
            "recognition service not configured".to_string(),
        ))
    }

    async fn recognize_stream(
        &self,
        _wake_phrase: &str,
    ) -> Result<crate::services::UtteranceStream> {
        Err(crate::Error::ServiceUnavailable(
            "recognition service not configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_wake_phrase_fails_construction() {
        let mut config = Config::default();
        config.wake.phrase = String::new();
        assert!(AppContext::from_config(config).is_err());
    }

    #[tokio::test]
    async fn default_context_reports_unconfigured_services() {
        let ctx = AppContext::from_config(Config::default()).unwrap();

        let err = ctx.wake.start().await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ServiceUnavailable);

        let err = ctx
            .pipeline
            .process_text_query("how do brakes work", None, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ServiceUnavailable);
    }
}
