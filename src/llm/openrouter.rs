//! OpenRouter chat-completions client.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::llm::client::{
    extract_content, map_error_status, ChatRequest, ChatResponse, LLMClient, BACKOFF,
};
use crate::types::{AppError, Result};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "deepseek/deepseek-chat";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OpenRouterClient {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    #[serde(flatten)]
    chat: ChatResponse,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl OpenRouterClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        let model = if model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            model
        };
        let base_url = if base_url.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            base_url
        };

        Self {
            api_key,
            model,
            base_url,
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::LLMRequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::LLMRequestFailed(e.to_string()))?;

        if !status.is_success() {
            if status.is_server_error() {
                // Retryable; the outer loop backs off.
                return Err(AppError::LLMRequestFailed(format!(
                    "server error: {}",
                    status.as_u16()
                )));
            }
            return Err(map_error_status(status, &body, "openrouter"));
        }

        let parsed: OpenRouterResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::LLMRequestFailed(format!("unmarshal response: {}", e)))?;

        if let Some(err) = parsed.error {
            return Err(AppError::LLMRequestFailed(err.message));
        }

        extract_content(&parsed.chat)
    }

    fn is_retryable(err: &AppError) -> bool {
        match err {
            AppError::LLMRequestFailed(msg) => {
                // Server errors and transport failures; 4xx mapping happens
                // before this point and produces non-retryable kinds.
                msg.starts_with("server error")
                    || !(msg.starts_with("status ") || msg.starts_with("unmarshal"))
            }
            _ => false,
        }
    }
}

#[async_trait]
impl LLMClient for OpenRouterClient {
    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        let request = ChatRequest::new(&self.model, system, prompt);

        let mut last_err = AppError::LLMRequestFailed("no attempts made".to_string());
        for attempt in 0..=BACKOFF.len() {
            if attempt > 0 {
                tokio::time::sleep(BACKOFF[attempt - 1]).await;
            }

            match self.send_once(&request).await {
                Ok(content) => return Ok(content),
                Err(err) if Self::is_retryable(&err) => {
                    tracing::warn!(attempt, error = %err, "openrouter request failed, retrying");
                    last_err = err;
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err)
    }

    fn provider_name(&self) -> &str {
        "openrouter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let client = OpenRouterClient::new("key".to_string(), String::new(), String::new());
        assert_eq!(client.model, DEFAULT_MODEL);
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_explicit_config_kept() {
        let client = OpenRouterClient::new(
            "key".to_string(),
            "qwen/qwen-2.5-72b".to_string(),
            "http://localhost:9999/v1".to_string(),
        );
        assert_eq!(client.model, "qwen/qwen-2.5-72b");
        assert_eq!(client.base_url, "http://localhost:9999/v1");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(OpenRouterClient::is_retryable(&AppError::LLMRequestFailed(
            "server error: 503".to_string()
        )));
        assert!(OpenRouterClient::is_retryable(&AppError::LLMRequestFailed(
            "connection reset by peer".to_string()
        )));
        assert!(!OpenRouterClient::is_retryable(
            &AppError::LLMRequestFailed("status 400".to_string())
        ));
        assert!(!OpenRouterClient::is_retryable(&AppError::LLMRateLimited));
        assert!(!OpenRouterClient::is_retryable(&AppError::LLMAuthFailed));
    }
}
