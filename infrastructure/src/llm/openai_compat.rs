//! OpenAI-compatible chat completions client
//!
//! Sends one system + user message pair to `{base_url}/chat/completions` and
//! reads the first choice. Works against OpenAI and the many servers that
//! mirror its API (vLLM, Ollama, LiteLLM, ...).

use crate::config::FileLlmConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use roundtable_application::ports::completion::{
    Completion, CompletionClient, CompletionRequest, GatewayError,
};
use roundtable_domain::TokenUsage;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Other(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Build from the `[llm]` section, reading the key from `api_key_env`
    ///
    /// A missing key is allowed; local servers usually need none.
    pub fn from_config(config: &FileLlmConfig) -> Result<Self, GatewayError> {
        let client = Self::new(
            &config.base_url,
            &config.model,
            Duration::from_secs(config.timeout_seconds),
        )?;
        Ok(match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => client.with_api_key(key.trim()),
            _ => client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn build_request<'a>(model: &'a str, request: &'a CompletionRequest) -> ChatRequest<'a> {
    let mut messages = Vec::with_capacity(2);
    if !request.system.is_empty() {
        messages.push(ChatMessage {
            role: "system",
            content: &request.system,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: &request.prompt,
    });
    ChatRequest {
        model,
        messages,
        temperature: request.temperature,
    }
}

fn parse_response(response: ChatResponse) -> Result<Completion, GatewayError> {
    let text = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::InvalidResponse("no choices in response".to_string()))?
        .message
        .content
        .unwrap_or_default();

    let completion = Completion::new(text);
    Ok(match response.usage {
        Some(usage) => {
            completion.with_usage(TokenUsage::new(usage.prompt_tokens, usage.completion_tokens))
        }
        None => completion,
    })
}

fn status_error(status: StatusCode, model: &str, body: String) -> GatewayError {
    match status {
        StatusCode::NOT_FOUND => GatewayError::ModelNotAvailable(model.to_string()),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GatewayError::Timeout,
        _ => GatewayError::RequestFailed(format!("HTTP {}: {}", status, body)),
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, GatewayError> {
        let payload = build_request(&self.model, request);
        debug!(model = %self.model, prompt_len = request.prompt.len(), "Sending completion request");

        let mut http = self.client.post(self.endpoint()).json(&payload);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        let response = http.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout
            } else {
                GatewayError::ConnectionError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &self.model, body));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        parse_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_payload() {
        let request = CompletionRequest::new("You review PRDs.", "Review this").with_temperature(0.2);
        let payload = serde_json::to_value(build_request("gpt-4o", &request)).unwrap();
        assert_eq!(
            payload,
            json!({
                "model": "gpt-4o",
                "messages": [
                    {"role": "system", "content": "You review PRDs."},
                    {"role": "user", "content": "Review this"}
                ],
                "temperature": 0.2f32
            })
        );
    }

    #[test]
    fn test_request_without_system_or_temperature() {
        let request = CompletionRequest::new("", "Hello");
        let payload = serde_json::to_value(build_request("m", &request)).unwrap();
        assert_eq!(payload["messages"].as_array().unwrap().len(), 1);
        assert!(payload.get("temperature").is_none());
    }

    #[test]
    fn test_parse_response_with_usage() {
        let body: ChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Refined"}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150}
        }))
        .unwrap();

        let completion = parse_response(body).unwrap();
        assert_eq!(completion.text, "Refined");
        assert_eq!(completion.usage, Some(TokenUsage::new(120, 30)));
    }

    #[test]
    fn test_parse_response_without_choices() {
        let body: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(
            parse_response(body),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "gpt-x", String::new()),
            GatewayError::ModelNotAvailable(m) if m == "gpt-x"
        ));
        assert!(matches!(
            status_error(StatusCode::GATEWAY_TIMEOUT, "m", String::new()),
            GatewayError::Timeout
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "m", "slow down".into()),
            GatewayError::RequestFailed(msg) if msg.contains("429")
        ));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client =
            OpenAiCompatClient::new("http://localhost:8000/v1/", "m", Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8000/v1/chat/completions");
        assert_eq!(client.model(), "m");
    }
}
