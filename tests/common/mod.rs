//! Shared test utilities: mock external services and context wiring

#![allow(dead_code)]

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use buddy_core::session::Turn;
use buddy_core::services::{
    AnswerService, KnowledgeChunk, KnowledgeSearch, SpeechRecognition, SpeechSynthesis,
    Transcription, UtteranceStream, VoiceSettings,
};
use buddy_core::{AppContext, Config, Error, Result};

/// Utterance stream that flips a flag when its audio resource is released
struct MockUtteranceStream {
    inner: ReceiverStream<String>,
    released: Arc<AtomicBool>,
}

impl Stream for MockUtteranceStream {
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

impl Drop for MockUtteranceStream {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Scripted recognizer: one-shot results are fixed, the continuous stream is
/// fed by the test through an mpsc sender
pub struct MockRecognizer {
    transcription: Transcription,
    utterances: std::sync::Mutex<Option<mpsc::Receiver<String>>>,
    released: Arc<AtomicBool>,
}

impl MockRecognizer {
    /// Returns the recognizer plus the sender feeding its stream
    pub fn new(text: &str, confidence: f32) -> (Self, mpsc::Sender<String>) {
        let (tx, rx) = mpsc::channel(16);
        let recognizer = Self {
            transcription: Transcription {
                text: text.to_string(),
                confidence,
            },
            utterances: std::sync::Mutex::new(Some(rx)),
            released: Arc::new(AtomicBool::new(false)),
        };
        (recognizer, tx)
    }

    /// True once the continuous stream has been dropped
    pub fn resource_released(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }

    /// Replace the continuous stream with a fresh one; returns its sender
    pub fn arm(&self) -> mpsc::Sender<String> {
        let (tx, rx) = mpsc::channel(16);
        *self.utterances.lock().unwrap() = Some(rx);
        tx
    }
}

#[async_trait]
impl SpeechRecognition for MockRecognizer {
    async fn recognize(&self, audio: &[u8]) -> Result<Transcription> {
        assert!(!audio.is_empty(), "pipeline must reject empty audio first");
        Ok(self.transcription.clone())
    }

    async fn recognize_stream(&self, _wake_phrase: &str) -> Result<UtteranceStream> {
        let rx = self
            .utterances
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::Internal("mock stream already taken".to_string()))?;
        self.released.store(false, Ordering::SeqCst);
        Ok(Box::pin(MockUtteranceStream {
            inner: ReceiverStream::new(rx),
            released: Arc::clone(&self.released),
        }))
    }
}

/// Fixed-result knowledge store that records the last query parameters
pub struct MockKnowledge {
    chunks: Vec<KnowledgeChunk>,
    fail: AtomicBool,
    last_k: AtomicUsize,
}

impl MockKnowledge {
    pub fn new(chunks: Vec<KnowledgeChunk>) -> Self {
        Self {
            chunks,
            fail: AtomicBool::new(false),
            last_k: AtomicUsize::new(0),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn last_k(&self) -> usize {
        self.last_k.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeSearch for MockKnowledge {
    async fn search(
        &self,
        _query: &str,
        max_chunks: usize,
        _similarity_threshold: f32,
    ) -> Result<Vec<KnowledgeChunk>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::ServiceUnavailable("mock search down".to_string()));
        }
        self.last_k.store(max_chunks, Ordering::SeqCst);
        Ok(self.chunks.clone())
    }
}

/// Echo answerer that records how many prior turns it was given
pub struct MockAnswerer {
    fail: AtomicBool,
    last_history_len: AtomicUsize,
}

impl MockAnswerer {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            last_history_len: AtomicUsize::new(0),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn last_history_len(&self) -> usize {
        self.last_history_len.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnswerService for MockAnswerer {
    async fn summarize(
        &self,
        query: &str,
        _chunks: &[KnowledgeChunk],
        history: &[Turn],
    ) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::ServiceUnavailable("mock answerer down".to_string()));
        }
        self.last_history_len.store(history.len(), Ordering::SeqCst);
        Ok(format!("answer: {query}"))
    }
}

/// Synthesizer returning a fixed WAV-ish payload
pub struct MockSynthesizer;

#[async_trait]
impl SpeechSynthesis for MockSynthesizer {
    async fn synthesize(&self, _text: &str, _settings: &VoiceSettings) -> Result<Vec<u8>> {
        Ok(b"RIFF-mock-wav".to_vec())
    }
}

/// One relevant chunk for pipeline tests
pub fn sample_chunks() -> Vec<KnowledgeChunk> {
    vec![KnowledgeChunk {
        content: "Brake pads should be replaced when under 3mm thick.".to_string(),
        metadata: serde_json::json!({"source": "manual.pdf", "page": 42}),
        similarity_score: 0.92,
    }]
}

/// Config tuned for fast tests: 1s heartbeat, 2s stop timeout
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.wake.heartbeat_secs = 1;
    config.wake.stop_timeout_secs = 2;
    config
}

/// Fully mocked context; returns the utterance sender and the shared mocks
pub struct TestHarness {
    pub ctx: AppContext,
    pub utterances: mpsc::Sender<String>,
    pub recognizer: Arc<MockRecognizer>,
    pub knowledge: Arc<MockKnowledge>,
    pub answerer: Arc<MockAnswerer>,
    pub released: Arc<AtomicBool>,
}

pub fn harness() -> TestHarness {
    harness_with_config(test_config())
}

pub fn harness_with_config(config: Config) -> TestHarness {
    let (recognizer, utterances) = MockRecognizer::new("how do brakes work", 0.9);
    let recognizer = Arc::new(recognizer);
    let released = recognizer.resource_released();
    let knowledge = Arc::new(MockKnowledge::new(sample_chunks()));
    let answerer = Arc::new(MockAnswerer::new());

    let ctx = AppContext::assemble(
        config,
        Some(Arc::clone(&recognizer) as Arc<dyn SpeechRecognition>),
        Some(Arc::clone(&knowledge) as Arc<dyn KnowledgeSearch>),
        Some(Arc::clone(&answerer) as Arc<dyn AnswerService>),
        Some(Arc::new(MockSynthesizer)),
    );

    TestHarness {
        ctx,
        utterances,
        recognizer,
        knowledge,
        answerer,
        released,
    }
}
