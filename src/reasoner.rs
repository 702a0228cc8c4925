use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ReasoningConfig;

pub const SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant specialized in answering academic questions accurately and concisely.";

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 200;

/// Wrap recognized question text in the fixed two-line answer instructions.
pub fn question_prompt(text: &str) -> String {
    format!(
        "Analyze the following text which contains a question and possibly multiple choice options:\n\
         \n\
         {text}\n\
         \n\
         Please provide:\n\
         1. The correct answer\n\
         2. A brief explanation of why it's correct\n\
         \n\
         Format your response as:\n\
         Answer: [Your answer]\n\
         Explanation: [Your explanation]"
    )
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("reasoning service rejected the API key")]
    Unauthorized,
    #[error("reasoning service rate limit exceeded")]
    RateLimited,
    #[error("reasoning service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("reasoning service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("reasoning service sent an unreadable response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("reasoning service response contained no answer")]
    EmptyResponse,
}

impl UpstreamError {
    fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => UpstreamError::Unauthorized,
            StatusCode::TOO_MANY_REQUESTS => UpstreamError::RateLimited,
            _ => UpstreamError::Status { status, body },
        }
    }
}

/// A chat-completion backend: one system message, one user message, one reply.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, UpstreamError>;
}

/// Chat-completions request types
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Chat-completions response types
#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible `chat/completions` client with bearer auth.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
}

impl ChatCompletionsClient {
    pub fn new(config: &ReasoningConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            url: config.url.clone(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl ChatCompleter for ChatCompletionsClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, UpstreamError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        log::debug!("Sending chat completion to {} (model {})", self.url, self.model);

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(UpstreamError::from_status(status, text));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(UpstreamError::EmptyResponse)
    }
}
