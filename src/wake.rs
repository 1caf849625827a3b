//! Wake word listening and detection fan-out
//!
//! One long-lived listening task pulls utterances from the recognizer's
//! continuous stream and matches them against the wake phrase. Matches land
//! in a bounded ring buffer of recent detections and are simultaneously
//! published on a broadcast bus; non-matches are discarded. Subscribers each
//! hold their own bus cursor, so a slow or disconnected subscriber never
//! blocks the producer or the other subscribers — at worst it lags and loses
//! events for itself. An idle subscriber receives a heartbeat once per
//! configured interval so connection liveness stays observable.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;

use crate::config::WakeConfig;
use crate::pipeline::{PipelineOrchestrator, QueryOutcome};
use crate::services::{SpeechRecognition, UtteranceStream};
use crate::{Error, Result};

/// Detections returned by `status()`
const STATUS_RECENT_LIMIT: usize = 5;

/// Confidence attached to wake detections; continuous recognition does not
/// report one
const DETECTION_CONFIDENCE: f32 = 0.95;

/// A recognized utterance that matched the wake phrase
#[derive(Debug, Clone, Serialize)]
pub struct WakeWordDetection {
    pub timestamp: DateTime<Utc>,
    pub wake_word_detected: bool,
    /// Raw recognized utterance
    pub full_text: String,
    /// Text following the wake phrase
    pub command_text: String,
    pub confidence: f32,
}

/// Event delivered to bus subscribers
#[derive(Debug, Clone)]
pub enum DetectionEvent {
    Detection(WakeWordDetection),
    /// Liveness marker for idle subscribers
    Heartbeat { timestamp: DateTime<Utc> },
}

/// Snapshot returned by `status()`
#[derive(Debug, Clone, Serialize)]
pub struct WakeStatus {
    pub listening: bool,
    pub wake_word: String,
    pub detection_count: u64,
    pub recent_detections: Vec<WakeWordDetection>,
}

/// Result of a wake-word command run through the pipeline
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    #[serde(flatten)]
    pub query: QueryOutcome,
    pub wake_word_triggered: bool,
}

/// Listening task handle, present only while `Listening`
struct ListenerState {
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

/// Shared between the controller and the listening task
struct DetectionSink {
    wake_phrase: String,
    ring_capacity: usize,
    recent: Mutex<VecDeque<WakeWordDetection>>,
    total: AtomicU64,
    bus: broadcast::Sender<WakeWordDetection>,
}

impl DetectionSink {
    /// Match an utterance against the wake phrase; record and publish on hit
    async fn handle_utterance(&self, text: &str) {
        let normalized = text.to_lowercase();
        let Some(index) = normalized.find(&self.wake_phrase) else {
            tracing::trace!(utterance = %text, "no wake phrase, discarded");
            return;
        };

        let command_text = normalized[index + self.wake_phrase.len()..]
            .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | ':' | ';' | '!' | '?'))
            .to_string();

        let detection = WakeWordDetection {
            timestamp: Utc::now(),
            wake_word_detected: true,
            full_text: text.to_string(),
            command_text,
            confidence: DETECTION_CONFIDENCE,
        };

        tracing::info!(
            command = %detection.command_text,
            full_text = %detection.full_text,
            "wake word detected"
        );

        {
            let mut recent = self.recent.lock().await;
            if recent.len() == self.ring_capacity {
                recent.pop_front();
            }
            recent.push_back(detection.clone());
        }
        self.total.fetch_add(1, Ordering::Relaxed);

        // No receivers is fine; the ring buffer still has the detection.
        let _ = self.bus.send(detection);
    }
}

/// Owns the listening task, the recent-detections ring, and the detection bus
pub struct WakeWordController {
    heartbeat: Duration,
    stop_timeout: Duration,
    recognizer: Arc<dyn SpeechRecognition>,
    pipeline: Arc<PipelineOrchestrator>,
    sink: Arc<DetectionSink>,
    listener: Mutex<ListenerState>,
}

impl WakeWordController {
    /// Create a controller in the `Idle` state
    #[must_use]
    pub fn new(
        config: &WakeConfig,
        recognizer: Arc<dyn SpeechRecognition>,
        pipeline: Arc<PipelineOrchestrator>,
    ) -> Self {
        let (bus, _) = broadcast::channel(config.bus_capacity.max(1));
        Self {
            heartbeat: config.heartbeat_interval(),
            stop_timeout: config.stop_timeout(),
            recognizer,
            pipeline,
            sink: Arc::new(DetectionSink {
                wake_phrase: config.phrase.to_lowercase().trim().to_string(),
                ring_capacity: config.ring_capacity.max(1),
                recent: Mutex::new(VecDeque::new()),
                total: AtomicU64::new(0),
                bus,
            }),
            listener: Mutex::new(ListenerState {
                shutdown: None,
                task: None,
            }),
        }
    }

    /// The configured wake phrase (normalized)
    #[must_use]
    pub fn wake_phrase(&self) -> &str {
        &self.sink.wake_phrase
    }

    /// Start the listening task
    ///
    /// A task whose stream ended on its own is reaped here, so a restart is
    /// never blocked by a listener that already exited.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyActive` if a listener is running, or the recognizer's
    /// error if the continuous stream cannot be opened.
    pub async fn start(&self) -> Result<()> {
        let mut listener = self.listener.lock().await;
        if let Some(task) = listener.task.take() {
            if task.is_finished() {
                listener.shutdown = None;
                let _ = task.await;
                tracing::debug!("reaped listening task whose stream ended");
            } else {
                listener.task = Some(task);
                return Err(Error::AlreadyActive(
                    "wake word detection is already active".to_string(),
                ));
            }
        }

        let stream = self
            .recognizer
            .recognize_stream(&self.sink.wake_phrase)
            .await?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sink = Arc::clone(&self.sink);
        let task = tokio::spawn(listen_loop(stream, shutdown_rx, sink));

        listener.shutdown = Some(shutdown_tx);
        listener.task = Some(task);
        tracing::info!(wake_phrase = %self.sink.wake_phrase, "wake word detection started");
        Ok(())
    }

    /// Stop the listening task and wait for it to release the audio resource
    ///
    /// # Errors
    ///
    /// Returns `NotActive` if no listener is running, or `Internal` if the
    /// task does not confirm shutdown within the configured timeout.
    pub async fn stop(&self) -> Result<()> {
        let mut listener = self.listener.lock().await;
        let (Some(shutdown), Some(task)) = (listener.shutdown.take(), listener.task.take()) else {
            return Err(Error::NotActive(
                "wake word detection is not active".to_string(),
            ));
        };

        // Transient Stopping phase: the listener mutex stays held, so a
        // concurrent start() cannot observe a half-cancelled task.
        let _ = shutdown.send(true);
        match tokio::time::timeout(self.stop_timeout, task).await {
            Ok(Ok(())) => {
                tracing::info!("wake word detection stopped");
                Ok(())
            }
            Ok(Err(join_err)) => Err(Error::Internal(format!(
                "listening task failed: {join_err}"
            ))),
            Err(_) => Err(Error::Internal(format!(
                "listening task did not stop within {:?}",
                self.stop_timeout
            ))),
        }
    }

    /// Whether the listening task is running
    ///
    /// A task that exited because its stream ended counts as not listening,
    /// even before `start` or `stop` reaps it.
    pub async fn is_listening(&self) -> bool {
        self.listener
            .lock()
            .await
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Current listener state and recent detections
    pub async fn status(&self) -> WakeStatus {
        let listening = self.is_listening().await;
        let recent = self.sink.recent.lock().await;
        let skip = recent.len().saturating_sub(STATUS_RECENT_LIMIT);
        WakeStatus {
            listening,
            wake_word: self.sink.wake_phrase.clone(),
            detection_count: self.sink.total.load(Ordering::Relaxed),
            recent_detections: recent.iter().skip(skip).cloned().collect(),
        }
    }

    /// Drop all buffered detections and reset the counter
    pub async fn clear_detections(&self) {
        self.sink.recent.lock().await.clear();
        self.sink.total.store(0, Ordering::Relaxed);
    }

    /// Register a new subscriber on the detection bus
    ///
    /// The subscriber receives every detection published after this call, in
    /// publication order. Dropping the subscriber detaches it without
    /// affecting the listener or other subscribers.
    #[must_use]
    pub fn subscribe(&self) -> DetectionSubscriber {
        DetectionSubscriber {
            rx: self.sink.bus.subscribe(),
            heartbeat: self.heartbeat,
        }
    }

    /// Run a detected command through the full pipeline
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for empty command text, plus anything the
    /// pipeline returns.
    pub async fn process(
        &self,
        command_text: &str,
        session_id: Option<&str>,
    ) -> Result<CommandOutcome> {
        if command_text.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "command text is required".to_string(),
            ));
        }

        let query = self
            .pipeline
            .process_text_query(command_text, session_id, None, None)
            .await?;

        Ok(CommandOutcome {
            query,
            wake_word_triggered: true,
        })
    }
}

/// A registered cursor on the detection bus
pub struct DetectionSubscriber {
    rx: broadcast::Receiver<WakeWordDetection>,
    heartbeat: Duration,
}

impl DetectionSubscriber {
    /// Await the next detection, or a heartbeat after an idle interval
    ///
    /// Returns `None` once the bus is closed (controller dropped). If this
    /// subscriber lagged behind the bus capacity, the overwritten events are
    /// lost for it alone and delivery resumes from the oldest retained event.
    pub async fn next(&mut self) -> Option<DetectionEvent> {
        loop {
            match tokio::time::timeout(self.heartbeat, self.rx.recv()).await {
                Ok(Ok(detection)) => return Some(DetectionEvent::Detection(detection)),
                Ok(Err(broadcast::error::RecvError::Lagged(missed))) => {
                    tracing::warn!(missed, "subscriber lagged, detections dropped");
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => return None,
                Err(_) => {
                    return Some(DetectionEvent::Heartbeat {
                        timestamp: Utc::now(),
                    });
                }
            }
        }
    }
}

/// The listening task: utterances in, detections out, until shutdown
async fn listen_loop(
    mut stream: UtteranceStream,
    mut shutdown: watch::Receiver<bool>,
    sink: Arc<DetectionSink>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::debug!("shutdown requested");
                break;
            }
            utterance = stream.next() => {
                match utterance {
                    Some(text) => sink.handle_utterance(&text).await,
                    None => {
                        tracing::warn!("recognition stream ended");
                        break;
                    }
                }
            }
        }
    }
    // Dropping the stream here releases the recognizer's audio resource.
    drop(stream);
    tracing::info!("listening task stopped");
}
