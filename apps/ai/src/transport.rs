//! Transport to the LLM provider.
//!
//! The gateway never touches the wire protocol: it supplies prompts and
//! consumes `(text, usage)` through the [`Transport`] trait. The concrete
//! [`AnthropicTransport`] wraps the Messages API with retry on 429/5xx.
//! Timeout and retry policy live here, not in the interpretation pipeline.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("model returned empty content")]
    EmptyContent,
}

/// Token counts reported by the provider for one call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// The raw output of one model call: literal text plus usage counters.
/// Owned by the call that produced it; never persisted verbatim.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
}

/// Narrow contract between the AI gateway and the provider client.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(
        &self,
        system: &str,
        user: &str,
        model_id: &str,
        max_tokens: u32,
    ) -> Result<Completion, TransportError>;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

impl MessagesResponse {
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Messages API client. Retries 429 and 5xx with exponential backoff;
/// all other failures propagate unchanged.
#[derive(Clone)]
pub struct AnthropicTransport {
    client: Client,
    api_key: String,
}

impl AnthropicTransport {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }
}

#[async_trait]
impl Transport for AnthropicTransport {
    async fn call(
        &self,
        system: &str,
        user: &str,
        model_id: &str,
        max_tokens: u32,
    ) -> Result<Completion, TransportError> {
        let request_body = MessagesRequest {
            model: model_id,
            max_tokens,
            system,
            messages: vec![Message {
                role: "user",
                content: user,
            }],
        };

        let mut last_error: Option<TransportError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "model call attempt {} failed, retrying after {}ms",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(TransportError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("model API returned {}: {}", status, body);
                last_error = Some(TransportError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(TransportError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: MessagesResponse = response.json().await?;

            debug!(
                "model call ok: model={}, input_tokens={}, output_tokens={}",
                model_id, parsed.usage.input_tokens, parsed.usage.output_tokens
            );

            let text = parsed.text().ok_or(TransportError::EmptyContent)?;
            return Ok(Completion {
                text: text.to_string(),
                usage: parsed.usage,
            });
        }

        Err(last_error.unwrap_or(TransportError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}
