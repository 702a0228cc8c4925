use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::OcrConfig;

#[derive(Debug, Error)]
pub enum RecognitionError {
    /// Message reported by the service itself, surfaced verbatim.
    #[error("{0}")]
    Service(String),
    #[error("Failed to process the image. Please try again.")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected response from the text recognition service")]
    Malformed(#[from] serde_json::Error),
}

/// Turns an encoded frame into raw text. `Ok(None)` means the service
/// succeeded but found nothing.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image_data_url: &str) -> Result<Option<String>, RecognitionError>;
}

/// OCR.Space response types
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OcrResponse {
    #[serde(default)]
    error_message: Option<ErrorMessage>,
    #[serde(default)]
    parsed_results: Option<Vec<ParsedResult>>,
}

/// OCR.Space sends either a single string or a list of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl ErrorMessage {
    fn into_text(self) -> Option<String> {
        let text = match self {
            ErrorMessage::One(s) => s,
            ErrorMessage::Many(parts) => parts.join(" "),
        };
        let text = text.trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: Option<String>,
}

impl OcrResponse {
    /// Service-reported error first, otherwise the first parsed text if any.
    pub fn into_text(self) -> Result<Option<String>, RecognitionError> {
        if let Some(message) = self.error_message.and_then(ErrorMessage::into_text) {
            return Err(RecognitionError::Service(message));
        }
        Ok(self
            .parsed_results
            .and_then(|results| results.into_iter().next())
            .and_then(|r| r.parsed_text))
    }
}

/// Client for the OCR.Space `parse/image` endpoint.
pub struct OcrSpaceClient {
    client: reqwest::Client,
    api_key: String,
    url: String,
}

impl OcrSpaceClient {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            url: config.url.clone(),
        }
    }
}

#[async_trait]
impl TextRecognizer for OcrSpaceClient {
    async fn recognize(&self, image_data_url: &str) -> Result<Option<String>, RecognitionError> {
        let form = [
            ("apikey", self.api_key.as_str()),
            ("base64Image", image_data_url),
            ("language", "eng"),
            ("isOverlayRequired", "false"),
            ("filetype", "JPG"),
            ("detectOrientation", "true"),
            ("scale", "true"),
            ("OCREngine", "2"),
        ];

        let resp = self.client.post(&self.url).form(&form).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            // Error bodies usually still carry ErrorMessage.
            if let Ok(parsed) = serde_json::from_str::<OcrResponse>(&body) {
                parsed.into_text()?;
            }
            return Err(RecognitionError::Service(format!(
                "Text recognition service returned {status}"
            )));
        }

        let parsed: OcrResponse = serde_json::from_str(&body)?;
        parsed.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve;
    use axum::{http::StatusCode, routing::post, Form, Json, Router};
    use std::collections::HashMap;

    fn parse(json: &str) -> Result<Option<String>, RecognitionError> {
        serde_json::from_str::<OcrResponse>(json).unwrap().into_text()
    }

    #[test]
    fn first_parsed_text_wins() {
        let text = parse(
            r#"{"ParsedResults":[{"ParsedText":"first"},{"ParsedText":"second"}],"ErrorMessage":null}"#,
        )
        .unwrap();
        assert_eq!(text.as_deref(), Some("first"));
    }

    #[test]
    fn missing_results_are_not_an_error() {
        assert_eq!(parse(r#"{}"#).unwrap(), None);
        assert_eq!(parse(r#"{"ParsedResults":[]}"#).unwrap(), None);
        assert_eq!(parse(r#"{"ParsedResults":[{}]}"#).unwrap(), None);
    }

    #[test]
    fn string_error_message_is_surfaced() {
        let err = parse(r#"{"ErrorMessage":"Invalid API key"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Invalid API key");
    }

    #[test]
    fn list_error_message_is_joined() {
        let err = parse(r#"{"ErrorMessage":["File failed validation.","Size too big."]}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "File failed validation. Size too big.");
    }

    #[test]
    fn empty_error_message_is_ignored() {
        let text = parse(r#"{"ErrorMessage":[],"ParsedResults":[{"ParsedText":"ok text"}]}"#)
            .unwrap();
        assert_eq!(text.as_deref(), Some("ok text"));
    }

    #[tokio::test]
    async fn sends_fixed_recognition_parameters() {
        let router = Router::new().route(
            "/parse/image",
            post(|Form(fields): Form<HashMap<String, String>>| async move {
                let ok = fields.get("apikey").map(String::as_str) == Some("k-test")
                    && fields.get("base64Image").map(String::as_str)
                        == Some("data:image/jpeg;base64,AAAA")
                    && fields.get("language").map(String::as_str) == Some("eng")
                    && fields.get("isOverlayRequired").map(String::as_str) == Some("false")
                    && fields.get("filetype").map(String::as_str) == Some("JPG")
                    && fields.get("detectOrientation").map(String::as_str) == Some("true")
                    && fields.get("scale").map(String::as_str) == Some("true")
                    && fields.get("OCREngine").map(String::as_str) == Some("2");
                let text = if ok { "all fields present" } else { "missing field" };
                Json(serde_json::json!({ "ParsedResults": [{ "ParsedText": text }] }))
            }),
        );
        let base = serve(router).await;
        let client = OcrSpaceClient::new(&OcrConfig {
            api_key: "k-test".into(),
            url: format!("{base}/parse/image"),
        });

        let text = client
            .recognize("data:image/jpeg;base64,AAAA")
            .await
            .unwrap();
        assert_eq!(text.as_deref(), Some("all fields present"));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let router = Router::new().route("/parse/image", post(|| async { "<html>oops</html>" }));
        let base = serve(router).await;
        let client = OcrSpaceClient::new(&OcrConfig {
            api_key: String::new(),
            url: format!("{base}/parse/image"),
        });

        let err = client.recognize("data:,").await.unwrap_err();
        assert!(matches!(err, RecognitionError::Malformed(_)));
    }

    #[tokio::test]
    async fn error_status_surfaces_service_message() {
        let router = Router::new().route(
            "/parse/image",
            post(|| async {
                (
                    StatusCode::FORBIDDEN,
                    Json(serde_json::json!({ "ErrorMessage": ["The API key is invalid"] })),
                )
            }),
        );
        let base = serve(router).await;
        let client = OcrSpaceClient::new(&OcrConfig {
            api_key: "bad".into(),
            url: format!("{base}/parse/image"),
        });

        let err = client.recognize("data:,").await.unwrap_err();
        assert!(matches!(err, RecognitionError::Service(_)));
        assert_eq!(err.to_string(), "The API key is invalid");
    }

    #[tokio::test]
    async fn bare_error_status_reports_the_status() {
        let router = Router::new().route(
            "/parse/image",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let base = serve(router).await;
        let client = OcrSpaceClient::new(&OcrConfig {
            api_key: String::new(),
            url: format!("{base}/parse/image"),
        });

        let err = client.recognize("data:,").await.unwrap_err();
        assert!(matches!(err, RecognitionError::Service(_)));
        assert_eq!(
            err.to_string(),
            "Text recognition service returned 500 Internal Server Error"
        );
    }

    #[tokio::test]
    async fn unreachable_service_is_transport_failure() {
        let client = OcrSpaceClient::new(&OcrConfig {
            api_key: String::new(),
            url: "http://127.0.0.1:9/parse/image".into(),
        });
        let err = client.recognize("data:,").await.unwrap_err();
        assert!(matches!(err, RecognitionError::Transport(_)));
        assert_eq!(err.to_string(), "Failed to process the image. Please try again.");
    }
}
