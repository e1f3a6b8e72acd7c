//! Core `StudioService` trait and the `HttpService` implementation.
//!
//! `HttpService` talks to the generation backend over plain JSON/HTTP:
//!
//! | Call | Request | Response |
//! |------|---------|----------|
//! | `send_code` | `POST /send-code {"code": …}` | `{"message": …, "code": …}` |
//! | `chat` | `POST /chat {"message": …}` | `{"reply": …}` |
//!
//! The generated audio itself is fetched by the audio engine from
//! [`StudioService::stream_url`].  All connection details come from
//! [`ServiceConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ServiceConfig;

// ---------------------------------------------------------------------------
// ServiceError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the remote service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// HTTP transport or connection error.
    #[error("cannot reach service: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("service request timed out")]
    Timeout,

    /// The service answered with a non-success HTTP status.
    #[error("service returned HTTP {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },

    /// The response body was not the expected JSON shape.
    #[error("malformed service response: {0}")]
    Parse(String),

    /// The service was reachable but refused the submitted code.
    #[error("service rejected the code: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ServiceError::Timeout
        } else if e.is_decode() {
            ServiceError::Parse(e.to_string())
        } else {
            ServiceError::Request(e.to_string())
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body of a `/send-code` response.
///
/// `code` is kept as raw JSON: the contract describes a numeric status, while
/// the reference backend echoes the submitted source back in that field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendCodeReply {
    pub message: String,
    #[serde(default)]
    pub code: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct SendCodeRequest<'a> {
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    reply: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

// ---------------------------------------------------------------------------
// StudioService trait
// ---------------------------------------------------------------------------

/// Async interface to the remote generation / chat collaborator.
///
/// Implementors must be `Send + Sync` so they can be shared with spawned
/// tasks behind an `Arc<dyn StudioService>`.
#[async_trait]
pub trait StudioService: Send + Sync {
    /// Submit source code for generation.
    async fn send_code(&self, code: &str) -> Result<SendCodeReply, ServiceError>;

    /// Ask the conversational side-channel a question.
    async fn chat(&self, message: &str) -> Result<String, ServiceError>;

    /// Stable location of the most recently generated audio, without any
    /// cache-busting token.
    fn stream_url(&self) -> String;
}

// ---------------------------------------------------------------------------
// HttpService
// ---------------------------------------------------------------------------

pub struct HttpService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpService {
    /// Build an `HttpService` from application config.
    ///
    /// The HTTP client carries the request and connect timeouts from
    /// `config`.  A default client is used as a last-resort fallback if the
    /// builder fails.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl StudioService for HttpService {
    async fn send_code(&self, code: &str) -> Result<SendCodeReply, ServiceError> {
        let response = self
            .client
            .post(self.endpoint("/send-code"))
            .json(&SendCodeRequest { code })
            .send()
            .await?;

        let response = check_status(response).await?;
        let reply: SendCodeReply = response
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))?;
        Ok(reply)
    }

    async fn chat(&self, message: &str) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(self.endpoint("/chat"))
            .json(&ChatRequest { message })
            .send()
            .await?;

        let response = check_status(response).await?;
        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))?;
        Ok(reply.reply)
    }

    fn stream_url(&self) -> String {
        self.endpoint("/stream-mp3")
    }
}

/// Turn a non-success status into [`ServiceError::Status`], keeping the
/// backend's `{"error": …}` text when present.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let detail = response
        .text()
        .await
        .ok()
        .and_then(|body| serde_json::from_str::<ErrorBody>(&body).ok())
        .map(|body| body.error);
    Err(ServiceError::Status {
        status: status.as_u16(),
        detail,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
