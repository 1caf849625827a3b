//! Wire contract exposed to the transport layer
//!
//! The HTTP layer lives outside this crate; these are the JSON shapes it
//! serializes, matching the assistant's public API, plus the server-sent
//! event encoding for the detection stream.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::Error;
use crate::pipeline::QueryOutcome;
use crate::services::{KnowledgeChunk, Transcription};
use crate::session::{Session, SessionSummary, Turn};
use crate::wake::{CommandOutcome, DetectionEvent, WakeStatus};

/// Successful query response
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub status: &'static str,
    pub query: String,
    pub summary: String,
    pub session_id: String,
    pub topic_name: String,
    pub relevant_chunks: Vec<KnowledgeChunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f32>,
    pub processing_time_ms: u64,
    pub conversation_active: bool,
}

impl QueryResponse {
    /// Build from a pipeline outcome and the original query text
    #[must_use]
    pub fn new(query: &str, outcome: QueryOutcome) -> Self {
        Self {
            status: "success",
            query: query.to_string(),
            summary: outcome.summary,
            session_id: outcome.session_id,
            topic_name: outcome.topic_name,
            relevant_chunks: outcome.relevant_chunks,
            confidence_score: outcome.confidence,
            processing_time_ms: outcome.processing_time_ms,
            conversation_active: outcome.conversation_active,
        }
    }
}

/// Standalone recognition response
#[derive(Debug, Serialize)]
pub struct RecognizeResponse {
    pub status: &'static str,
    pub recognized_text: String,
    pub confidence_score: f32,
    pub processing_time_ms: u64,
}

impl RecognizeResponse {
    #[must_use]
    pub fn new(transcription: Transcription, processing_time_ms: u64) -> Self {
        Self {
            status: "success",
            recognized_text: transcription.text,
            confidence_score: transcription.confidence,
            processing_time_ms,
        }
    }
}

/// Response for an explicitly created session
#[derive(Debug, Serialize)]
pub struct SessionCreatedResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub session_id: String,
    pub topic_name: String,
    pub created_at: DateTime<Utc>,
}

impl SessionCreatedResponse {
    #[must_use]
    pub fn new(session: &Session) -> Self {
        Self {
            status: "success",
            message: "New conversation session created",
            session_id: session.id.clone(),
            topic_name: session.topic_name.clone(),
            created_at: session.created_at,
        }
    }
}

/// Response for a session reset
#[derive(Debug, Serialize)]
pub struct SessionResetResponse {
    pub status: &'static str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_session_id: Option<String>,
    pub new_session_id: String,
    pub topic_name: String,
    pub created_at: DateTime<Utc>,
}

impl SessionResetResponse {
    #[must_use]
    pub fn new(old_session_id: Option<String>, session: &Session) -> Self {
        Self {
            status: "success",
            message: "Session reset successfully",
            old_session_id,
            new_session_id: session.id.clone(),
            topic_name: session.topic_name.clone(),
            created_at: session.created_at,
        }
    }
}

/// Listing of active sessions
#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub status: &'static str,
    pub active_sessions: usize,
    pub sessions: Vec<SessionSummary>,
}

impl SessionListResponse {
    #[must_use]
    pub fn new(sessions: Vec<SessionSummary>) -> Self {
        Self {
            status: "success",
            active_sessions: sessions.len(),
            sessions,
        }
    }
}

/// Conversation history for one session
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub status: &'static str,
    pub session_id: String,
    pub chat_history: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl HistoryResponse {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            status: "success",
            session_id: session.id,
            chat_history: session.history,
            created_at: session.created_at,
            last_accessed: session.last_accessed_at,
        }
    }
}

/// Wake word listener status
#[derive(Debug, Serialize)]
pub struct WakeStatusResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub wake: WakeStatus,
}

impl WakeStatusResponse {
    #[must_use]
    pub fn new(wake: WakeStatus) -> Self {
        Self {
            status: "success",
            wake,
        }
    }
}

/// Result of a wake-word command run through the pipeline
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub status: &'static str,
    pub command_text: String,
    #[serde(flatten)]
    pub outcome: CommandOutcome,
}

impl CommandResponse {
    #[must_use]
    pub fn new(command_text: &str, outcome: CommandOutcome) -> Self {
        Self {
            status: "success",
            command_text: command_text.to_string(),
            outcome,
        }
    }
}

/// Structured error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub code: &'static str,
    pub message: String,
}

impl From<&Error> for ErrorResponse {
    fn from(error: &Error) -> Self {
        Self {
            status: "error",
            code: error.kind().as_str(),
            message: error.to_string(),
        }
    }
}

/// Encode a detection bus event as one server-sent event
///
/// Detections serialize flat; heartbeats serialize as
/// `{"type": "heartbeat", "timestamp": ...}`.
#[must_use]
pub fn sse_event(event: &DetectionEvent) -> String {
    let json = match event {
        DetectionEvent::Detection(detection) => {
            serde_json::to_string(detection).unwrap_or_else(|_| "{}".to_string())
        }
        DetectionEvent::Heartbeat { timestamp } => serde_json::json!({
            "type": "heartbeat",
            "timestamp": timestamp,
        })
        .to_string(),
    };
    format!("data: {json}\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wake::WakeWordDetection;

    #[test]
    fn sse_heartbeat_shape() {
        let event = DetectionEvent::Heartbeat {
            timestamp: Utc::now(),
        };
        let line = sse_event(&event);
        assert!(line.starts_with("data: {"));
        assert!(line.ends_with("\n\n"));
        assert!(line.contains("\"type\":\"heartbeat\""));
    }

    #[test]
    fn sse_detection_is_flat() {
        let event = DetectionEvent::Detection(WakeWordDetection {
            timestamp: Utc::now(),
            wake_word_detected: true,
            full_text: "hey buddy check the brakes".to_string(),
            command_text: "check the brakes".to_string(),
            confidence: 0.95,
        });
        let line = sse_event(&event);
        assert!(line.contains("\"wake_word_detected\":true"));
        assert!(line.contains("\"command_text\":\"check the brakes\""));
        assert!(!line.contains("\"type\""));
    }

    #[test]
    fn error_response_carries_kind() {
        let err = Error::NotFound("session: abc".to_string());
        let body = ErrorResponse::from(&err);
        assert_eq!(body.status, "error");
        assert_eq!(body.code, "not_found");
        assert!(body.message.contains("abc"));
    }
}
