use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::types::{AppError, Result};

/// Backoff schedule for transient provider failures (5xx, transport).
/// 429 and 400 are terminal for the call; 401 is handled per provider.
pub(crate) const BACKOFF: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// Generic LLM client trait for provider abstraction
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion for a user prompt under a system instruction.
    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Provider identifier used in logs and metrics.
    fn provider_name(&self) -> &str;
}

// ============= Chat Wire Types =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(model: &str, system: &str, prompt: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChatMessage,
}

/// Pull the first choice's content out of a chat response.
pub fn extract_content(resp: &ChatResponse) -> Result<String> {
    match resp.choices.first() {
        Some(choice) if !choice.message.content.is_empty() => Ok(choice.message.content.clone()),
        _ => Err(AppError::LLMEmptyResponse),
    }
}

/// Map a non-success status to the stable error kinds. 5xx is not mapped
/// here: callers treat it as retryable.
pub(crate) fn map_error_status(status: StatusCode, body: &str, provider: &str) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED => AppError::LLMAuthFailed,
        StatusCode::TOO_MANY_REQUESTS => AppError::LLMRateLimited,
        _ => {
            tracing::error!(provider, status = %status, body, "llm request failed");
            AppError::LLMRequestFailed(format!("status {}", status.as_u16()))
        }
    }
}

// ============= Provider Configuration =============

/// LLM provider configuration. One variant per supported backend; the mock
/// variant keeps the whole pipeline runnable without network access.
#[derive(Debug, Clone)]
pub enum Provider {
    OpenRouter {
        api_key: String,
        model: String,
        base_url: String,
    },
    GigaChat {
        auth_key: String,
        scope: String,
        auth_url: String,
        base_url: String,
    },
    Mock,
}

impl Provider {
    /// Create an LLM client from this provider configuration.
    pub fn create_client(&self) -> Arc<dyn LLMClient> {
        match self {
            Provider::OpenRouter {
                api_key,
                model,
                base_url,
            } => Arc::new(super::openrouter::OpenRouterClient::new(
                api_key.clone(),
                model.clone(),
                base_url.clone(),
            )),
            Provider::GigaChat {
                auth_key,
                scope,
                auth_url,
                base_url,
            } => Arc::new(super::gigachat::GigaChatClient::new(
                auth_key.clone(),
                scope.clone(),
                auth_url.clone(),
                base_url.clone(),
            )),
            Provider::Mock => Arc::new(super::mock::MockLLMClient::new()),
        }
    }

    /// Get the provider name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenRouter { .. } => "openrouter",
            Provider::GigaChat { .. } => "gigachat",
            Provider::Mock => "mock",
        }
    }

    /// Check if this provider requires an API key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Provider::Mock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_shape() {
        let req = ChatRequest::new("some-model", "be brief", "hello");
        assert_eq!(req.model, "some-model");
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, "system");
        assert_eq!(req.messages[1].role, "user");
        assert_eq!(req.messages[1].content, "hello");
    }

    #[test]
    fn test_extract_content() {
        let resp = ChatResponse {
            choices: vec![Choice {
                message: ChatMessage {
                    role: "assistant".to_string(),
                    content: "answer".to_string(),
                },
            }],
        };
        assert_eq!(extract_content(&resp).unwrap(), "answer");
    }

    #[test]
    fn test_extract_content_empty() {
        let resp = ChatResponse { choices: vec![] };
        assert!(matches!(
            extract_content(&resp),
            Err(AppError::LLMEmptyResponse)
        ));

        let resp = ChatResponse {
            choices: vec![Choice {
                message: ChatMessage {
                    role: "assistant".to_string(),
                    content: String::new(),
                },
            }],
        };
        assert!(matches!(
            extract_content(&resp),
            Err(AppError::LLMEmptyResponse)
        ));
    }

    #[test]
    fn test_error_status_mapping() {
        assert!(matches!(
            map_error_status(StatusCode::UNAUTHORIZED, "", "test"),
            AppError::LLMAuthFailed
        ));
        assert!(matches!(
            map_error_status(StatusCode::TOO_MANY_REQUESTS, "", "test"),
            AppError::LLMRateLimited
        ));
        assert!(matches!(
            map_error_status(StatusCode::BAD_REQUEST, "", "test"),
            AppError::LLMRequestFailed(_)
        ));
    }

    #[test]
    fn test_provider_properties() {
        let provider = Provider::OpenRouter {
            api_key: "k".to_string(),
            model: "m".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
        };
        assert_eq!(provider.name(), "openrouter");
        assert!(provider.requires_api_key());

        assert_eq!(Provider::Mock.name(), "mock");
        assert!(!Provider::Mock.requires_api_key());
    }
}
