//! OpenAI-compatible chat-completions backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::backend::{classify_http_failure, CompletionBackend};
use super::request::CompletionCall;
use crate::config::AppConfig;
use crate::errors::{BackendError, SpecsmithError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Backend for any service speaking the OpenAI chat-completions protocol.
#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl OpenAiBackend {
    /// Creates a new backend.
    ///
    /// # Errors
    ///
    /// Returns [`SpecsmithError::ClientConstruction`] if the HTTP client cannot be built.
    pub fn new(
        model: impl Into<String>,
        api_key: impl Into<String>,
        base_url: Option<String>,
    ) -> Result<Self, SpecsmithError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                SpecsmithError::ClientConstruction(format!("Failed to build HTTP client: {e}"))
            })?;

        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            model: model.into(),
            api_key: api_key.into(),
            base_url,
        })
    }

    /// Creates a backend from application config.
    pub fn from_config(config: &AppConfig) -> Result<Self, SpecsmithError> {
        Self::new(
            config.model.clone(),
            config.api_key.clone(),
            config.base_url.clone(),
        )
    }

    /// Returns the model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_body<'a>(&'a self, call: &'a CompletionCall) -> ChatCompletionRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = call.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &call.prompt,
        });

        ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: call.temperature,
            max_tokens: call.max_tokens,
            response_format: call.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn map_transport_error(error: &reqwest::Error, timeout: Duration) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout { duration: timeout }
    } else if error.is_connect() {
        BackendError::transient(format!("Connection error: {error}"))
    } else {
        BackendError::transient(format!("HTTP error: {error}"))
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn send(&self, call: CompletionCall) -> Result<String, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(&call);

        debug!(
            model = %self.model,
            json_mode = call.json_mode,
            temperature = ?call.temperature,
            "Sending chat completion"
        );

        let mut request = self
            .client
            .post(&url)
            .timeout(call.timeout)
            .json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_transport_error(&e, call.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_http_failure(status.as_u16(), &error_text, &call));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::transient(format!("Failed to parse response: {e}")))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::transient("No choices in response"))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationRequest;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend =
            OpenAiBackend::new("m", "k", Some("http://localhost:8080/v1/".to_string())).unwrap();
        assert_eq!(backend.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_body_shape() {
        let backend = OpenAiBackend::new("gpt-test", "k", None).unwrap();
        let call = GenerationRequest::new("hello")
            .with_system("be terse")
            .structured()
            .to_call(Duration::from_secs(5));

        let body = serde_json::to_value(backend.build_body(&call)).unwrap();
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_body_without_system_or_json_mode() {
        let backend = OpenAiBackend::new("gpt-test", "k", None).unwrap();
        let call = GenerationRequest::new("hello")
            .with_temperature(0.4)
            .to_call(Duration::from_secs(5));

        let body = serde_json::to_value(backend.build_body(&call)).unwrap();
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert!(body.get("response_format").is_none());
        assert!((body["temperature"].as_f64().unwrap() - 0.4).abs() < 1e-6);
    }
}
