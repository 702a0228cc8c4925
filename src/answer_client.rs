use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::server::{AnswerBody, ErrorBody};

/// Why a confirmed question produced no answer. Display text is what the user sees.
#[derive(Debug, Error, PartialEq)]
pub enum DispatchError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid API key. Check the server configuration.")]
    Unauthorized,
    #[error("Rate limit exceeded. Please wait a moment and try again.")]
    RateLimited,
    #[error("Failed to process the question. Please try again.")]
    Server,
    #[error("{0}")]
    Transport(String),
}

impl DispatchError {
    /// Classify a non-success response from the core server.
    pub fn from_response(status: StatusCode, error: Option<String>) -> Self {
        match status {
            StatusCode::BAD_REQUEST => {
                DispatchError::Validation(error.unwrap_or_else(|| "No text provided".into()))
            }
            StatusCode::UNAUTHORIZED => DispatchError::Unauthorized,
            StatusCode::TOO_MANY_REQUESTS => DispatchError::RateLimited,
            _ => DispatchError::Server,
        }
    }
}

/// Sends confirmed question text somewhere that answers it.
#[async_trait]
pub trait AnswerClient: Send + Sync {
    async fn ask(&self, text: &str) -> Result<String, DispatchError>;
}

#[derive(Serialize)]
struct ProcessQuestion<'a> {
    text: &'a str,
}

/// Talks to the core server's `/api/process-question`.
pub struct HttpAnswerClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnswerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `GET /health` as raw JSON.
    pub async fn health(&self) -> Result<serde_json::Value, reqwest::Error> {
        self.client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl AnswerClient for HttpAnswerClient {
    async fn ask(&self, text: &str) -> Result<String, DispatchError> {
        let resp = self
            .client
            .post(format!("{}/api/process-question", self.base_url))
            .json(&ProcessQuestion { text })
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let error = resp.json::<ErrorBody>().await.ok().map(|b| b.error);
            return Err(DispatchError::from_response(status, error));
        }

        match resp.json::<AnswerBody>().await {
            Ok(body) => Ok(body.answer),
            Err(e) => {
                log::error!("Unreadable answer from server: {e}");
                Err(DispatchError::Server)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoner::{ChatCompleter, UpstreamError};
    use crate::server::{router, ServerState};
    use crate::test_support::serve;
    use std::sync::Arc;

    struct FixedReasoner(fn() -> Result<String, UpstreamError>);

    #[async_trait]
    impl ChatCompleter for FixedReasoner {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, UpstreamError> {
            (self.0)()
        }
    }

    async fn server_with(reply: fn() -> Result<String, UpstreamError>) -> HttpAnswerClient {
        let state = ServerState {
            reasoner: Arc::new(FixedReasoner(reply)),
        };
        HttpAnswerClient::new(serve(router(state)).await)
    }

    #[test]
    fn classifies_statuses() {
        assert_eq!(
            DispatchError::from_response(StatusCode::BAD_REQUEST, None),
            DispatchError::Validation("No text provided".into())
        );
        assert_eq!(
            DispatchError::from_response(StatusCode::UNAUTHORIZED, Some("Invalid API key".into())),
            DispatchError::Unauthorized
        );
        assert_eq!(
            DispatchError::from_response(StatusCode::TOO_MANY_REQUESTS, None),
            DispatchError::RateLimited
        );
        assert_eq!(
            DispatchError::from_response(StatusCode::BAD_GATEWAY, None),
            DispatchError::Server
        );
    }

    #[tokio::test]
    async fn returns_answer_text() {
        let client = server_with(|| Ok("Answer: B\nExplanation: 2+2=4".into())).await;
        let answer = client.ask("What is 2+2? A)3 B)4 C)5").await.unwrap();
        assert_eq!(answer, "Answer: B\nExplanation: 2+2=4");
    }

    #[tokio::test]
    async fn empty_text_is_a_validation_error() {
        let client = server_with(|| Ok("unused".into())).await;
        let err = client.ask("").await.unwrap_err();
        assert_eq!(err, DispatchError::Validation("No text provided".into()));
    }

    #[tokio::test]
    async fn upstream_rate_limit_reaches_the_client() {
        let client = server_with(|| Err(UpstreamError::RateLimited)).await;
        let err = client.ask("a real question").await.unwrap_err();
        assert_eq!(err, DispatchError::RateLimited);
        assert!(err.to_string().contains("Rate limit"));
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let client = HttpAnswerClient::new("http://127.0.0.1:9/");
        let err = client.ask("a real question").await.unwrap_err();
        assert!(matches!(err, DispatchError::Transport(_)));
    }

    #[tokio::test]
    async fn health_round_trip() {
        let client = server_with(|| Ok(String::new())).await;
        let body = client.health().await.unwrap();
        assert_eq!(body["status"], "ok");
    }
}
