//! Answer generation over retrieved context.

use crate::error::SyncError;
use crate::index::ScoredEntry;
use crate::retrieval::build_context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Produces a natural-language answer from retrieved context and a
/// question. Single request/response, no streaming.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn answer(&self, context: &[ScoredEntry], question: &str) -> Result<String, SyncError>;
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Answer generator backed by an OpenAI-style chat completions endpoint.
pub struct ChatAnswerGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl ChatAnswerGenerator {
    /// `base_url` is the API root (e.g. `https://api.openai.com/v1` or a
    /// local llama server); `model` is the chat model name.
    pub fn new<S1: Into<String>, S2: Into<String>>(base_url: S1, model: S2) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: None,
            model: model.into(),
        }
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn answer_error(message: impl std::fmt::Display) -> SyncError {
        SyncError::Answer {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl AnswerGenerator for ChatAnswerGenerator {
    async fn answer(&self, context: &[ScoredEntry], question: &str) -> Result<String, SyncError> {
        let context_block = build_context(context);
        let user_content = if context_block.is_empty() {
            question.to_string()
        } else {
            format!("{context_block}---\n\nBased on the excerpts above, answer:\n{question}")
        };

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You answer questions using only the provided document excerpts. \
                              If the excerpts do not contain the answer, say so."
                        .to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_content,
                },
            ],
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("Requesting answer from {url}");

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder.send().await.map_err(Self::answer_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Self::answer_error(format!(
                "answer backend returned {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(Self::answer_error)?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Self::answer_error("answer backend returned no choices"))
    }
}
