//! End-to-end query pipeline
//!
//! Stitches the session store, topic classifier, and the external services
//! into the query→answer flow. History is only committed after the answer is
//! obtained: a failure in search or answering leaves the session exactly as
//! it was. External calls are awaited without holding any session lock.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::config::SearchConfig;
use crate::services::{
    AnswerService, KnowledgeChunk, KnowledgeSearch, SpeechRecognition, SpeechSynthesis,
    Transcription, VoiceSettings,
};
use crate::session::{DEFAULT_TOPIC, SessionStore};
use crate::topic::TopicClassifier;
use crate::{Error, Result};

/// Result of a processed query
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub summary: String,
    pub session_id: String,
    pub topic_name: String,
    pub relevant_chunks: Vec<KnowledgeChunk>,
    pub conversation_active: bool,
    /// Recognizer confidence, present for audio queries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub processing_time_ms: u64,
}

/// Composes sessions, classification, and external services
pub struct PipelineOrchestrator {
    sessions: Arc<SessionStore>,
    classifier: TopicClassifier,
    search_defaults: SearchConfig,
    recognition: Option<Arc<dyn SpeechRecognition>>,
    knowledge: Option<Arc<dyn KnowledgeSearch>>,
    answerer: Option<Arc<dyn AnswerService>>,
    synthesizer: Option<Arc<dyn SpeechSynthesis>>,
}

impl PipelineOrchestrator {
    /// Create an orchestrator; `None` services fail with `ServiceUnavailable`
    /// when reached
    #[must_use]
    pub fn new(
        sessions: Arc<SessionStore>,
        classifier: TopicClassifier,
        search_defaults: SearchConfig,
        recognition: Option<Arc<dyn SpeechRecognition>>,
        knowledge: Option<Arc<dyn KnowledgeSearch>>,
        answerer: Option<Arc<dyn AnswerService>>,
        synthesizer: Option<Arc<dyn SpeechSynthesis>>,
    ) -> Self {
        Self {
            sessions,
            classifier,
            search_defaults,
            recognition,
            knowledge,
            answerer,
            synthesizer,
        }
    }

    /// Session store backing this pipeline
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Topic classifier backing this pipeline
    #[must_use]
    pub const fn classifier(&self) -> &TopicClassifier {
        &self.classifier
    }

    /// Process a text query through search and answering
    ///
    /// A topic-change cue in the query forces a brand-new session regardless
    /// of any supplied id; the old session is left intact but unused. The
    /// user/assistant turn pair is appended only once the answer exists.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty query, `ServiceUnavailable` if
    /// the knowledge store or answering service is unconfigured or failing.
    pub async fn process_text_query(
        &self,
        query_text: &str,
        session_id: Option<&str>,
        max_chunks: Option<usize>,
        similarity_threshold: Option<f32>,
    ) -> Result<QueryOutcome> {
        let started = Instant::now();

        let query = query_text.trim();
        if query.is_empty() {
            return Err(Error::InvalidArgument("query is required".to_string()));
        }

        let mut session = if self.classifier.detect_topic_change(query) {
            tracing::info!(?session_id, "topic change cue, starting fresh session");
            self.sessions.create(None).await
        } else {
            self.sessions.get_or_create(session_id).await
        };

        if session.topic_name == DEFAULT_TOPIC {
            let topic = self.classifier.classify(query);
            self.sessions.set_topic(&session.id, &topic).await?;
            session.topic_name = topic;
        }

        let knowledge = self
            .knowledge
            .as_ref()
            .ok_or_else(|| Error::ServiceUnavailable("knowledge store not configured".to_string()))?;
        let answerer = self
            .answerer
            .as_ref()
            .ok_or_else(|| {
                Error::ServiceUnavailable("answering service not configured".to_string())
            })?;

        let chunks = knowledge
            .search(
                query,
                max_chunks.unwrap_or(self.search_defaults.max_chunks),
                similarity_threshold.unwrap_or(self.search_defaults.similarity_threshold),
            )
            .await?;

        let answer = answerer.summarize(query, &chunks, &session.history).await?;

        // Commit the paired turns only now that the answer exists.
        self.sessions
            .append_exchange(&session.id, query, &answer)
            .await?;

        tracing::info!(
            session_id = %session.id,
            topic = %session.topic_name,
            chunks = chunks.len(),
            "query processed"
        );

        Ok(QueryOutcome {
            summary: answer,
            session_id: session.id,
            topic_name: session.topic_name,
            relevant_chunks: chunks,
            conversation_active: true,
            confidence: None,
            processing_time_ms: elapsed_ms(started),
        })
    }

    /// Process an audio query: recognize, then run the text pipeline
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for empty audio or silent recognition,
    /// `ServiceUnavailable` if recognition is unconfigured, plus anything
    /// `process_text_query` returns.
    pub async fn process_audio_query(
        &self,
        audio: &[u8],
        session_id: Option<&str>,
    ) -> Result<QueryOutcome> {
        let started = Instant::now();

        let transcription = self.recognize(audio).await?;
        if transcription.text.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "no speech recognized in audio".to_string(),
            ));
        }

        let mut outcome = self
            .process_text_query(&transcription.text, session_id, None, None)
            .await?;
        outcome.confidence = Some(transcription.confidence);
        outcome.processing_time_ms = elapsed_ms(started);
        Ok(outcome)
    }

    /// Recognize audio without running the answer pipeline
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for empty audio, `ServiceUnavailable` if
    /// recognition is unconfigured or failing.
    pub async fn recognize(&self, audio: &[u8]) -> Result<Transcription> {
        if audio.is_empty() {
            return Err(Error::InvalidArgument("audio data is required".to_string()));
        }
        let recognition = self.recognition.as_ref().ok_or_else(|| {
            Error::ServiceUnavailable("recognition service not configured".to_string())
        })?;
        recognition.recognize(audio).await
    }

    /// Synthesize speech after validating the voice settings
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for empty text or out-of-range settings,
    /// `ServiceUnavailable` if synthesis is unconfigured or failing.
    pub async fn synthesize(&self, text: &str, settings: &VoiceSettings) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(Error::InvalidArgument("text is required".to_string()));
        }
        if !(50..=300).contains(&settings.rate) {
            return Err(Error::InvalidArgument(format!(
                "rate must be between 50 and 300, got {}",
                settings.rate
            )));
        }
        if !(0.0..=1.0).contains(&settings.volume) {
            return Err(Error::InvalidArgument(format!(
                "volume must be between 0.0 and 1.0, got {}",
                settings.volume
            )));
        }

        let synthesizer = self.synthesizer.as_ref().ok_or_else(|| {
            Error::ServiceUnavailable("synthesis service not configured".to_string())
        })?;
        synthesizer.synthesize(text, settings).await
    }
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
