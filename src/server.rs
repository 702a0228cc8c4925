use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::reasoner::{question_prompt, ChatCompleter, UpstreamError, SYSTEM_PROMPT};

#[derive(Clone)]
pub struct ServerState {
    pub reasoner: Arc<dyn ChatCompleter>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessQuestionRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerBody {
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Failures of `POST /api/process-question`, one per response status.
#[derive(Debug)]
pub enum ApiError {
    MissingText,
    InvalidApiKey,
    RateLimited,
    Upstream,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingText => StatusCode::BAD_REQUEST,
            ApiError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ApiError::MissingText => "No text provided",
            ApiError::InvalidApiKey => "Invalid API key",
            ApiError::RateLimited => "Rate limit exceeded",
            ApiError::Upstream => "Failed to process the question",
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Unauthorized => ApiError::InvalidApiKey,
            UpstreamError::RateLimited => ApiError::RateLimited,
            _ => ApiError::Upstream,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Handler for `POST /api/process-question`
pub async fn process_question(
    State(state): State<ServerState>,
    payload: Result<Json<ProcessQuestionRequest>, JsonRejection>,
) -> Result<Json<AnswerBody>, ApiError> {
    let text = match payload {
        Ok(Json(req)) => req.text.unwrap_or_default(),
        Err(rejection) => {
            log::warn!("Rejected process-question body: {rejection}");
            return Err(ApiError::MissingText);
        }
    };

    if text.trim().is_empty() {
        return Err(ApiError::MissingText);
    }
    log::info!("Text: {text}");

    let prompt = question_prompt(&text);
    match state.reasoner.complete(SYSTEM_PROMPT, &prompt).await {
        Ok(answer) => {
            log::info!("Answer: {answer}");
            Ok(Json(AnswerBody { answer }))
        }
        Err(e) => {
            log::error!("Error processing question: {e}");
            Err(ApiError::from(e))
        }
    }
}

/// Handler for `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Core server routes: forwards confirmed question text to the reasoning service.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/process-question", post(process_question))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn start_server(addr: SocketAddr, state: ServerState) -> Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    log::info!("Server running on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutting down server");
        })
        .await?;
    Ok(())
}
