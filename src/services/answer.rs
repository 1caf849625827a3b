//! Answer generation over a chat-completions-compatible HTTP API

use async_trait::async_trait;

use super::{AnswerService, KnowledgeChunk};
use crate::config::AnswerConfig;
use crate::session::{Role, Turn};
use crate::{Error, Result};

/// System prompt for the automotive technician assistant
const SYSTEM_PROMPT: &str = "You are a helpful voice assistant for an automotive technician. \
Use the provided context to answer the user's question. \
If you don't know the answer, say so. Be brief and clear. \
If there are multiple steps, just give one step and ask the user if they want to proceed for the next step.";

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(serde::Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(serde::Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Context-aware answering against a chat-completions endpoint
pub struct ChatAnswerer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatAnswerer {
    /// Create an answerer from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(config: &AnswerConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Config("answer API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Fold the retrieved chunks, prior turns, and the query into messages
    fn build_messages(
        query: &str,
        chunks: &[KnowledgeChunk],
        history: &[Turn],
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);

        let mut system = String::from(SYSTEM_PROMPT);
        if !chunks.is_empty() {
            system.push_str("\n\nContext:\n");
            for chunk in chunks {
                system.push_str("- ");
                system.push_str(&chunk.content);
                system.push('\n');
            }
        }
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });

        for turn in history {
            messages.push(ChatMessage {
                role: match turn.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: turn.content.clone(),
            });
        }

        messages.push(ChatMessage {
            role: "user",
            content: query.to_string(),
        });

        messages
    }
}

#[async_trait]
impl AnswerService for ChatAnswerer {
    async fn summarize(
        &self,
        query: &str,
        chunks: &[KnowledgeChunk],
        history: &[Turn],
    ) -> Result<String> {
        tracing::debug!(
            chunks = chunks.len(),
            prior_turns = history.len(),
            "requesting answer"
        );

        let request = ChatRequest {
            model: &self.model,
            messages: Self::build_messages(query, chunks, history),
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "answer API error");
            return Err(Error::ServiceUnavailable(format!(
                "answer API error {status}: {body}"
            )));
        }

        let result: ChatResponse = response.json().await?;
        let answer = result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Internal("answer API returned no choices".to_string()))?;

        tracing::info!(chars = answer.len(), "answer generated");
        Ok(answer)
    }
}
