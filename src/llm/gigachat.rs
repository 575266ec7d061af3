//! GigaChat client with OAuth token caching.
//!
//! Tokens are refreshed five minutes before expiry; a 401 on the completion
//! call invalidates the cached token and retries exactly once with a fresh
//! one.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use serde::Deserialize;
use std::time::Duration;

use crate::llm::client::{
    extract_content, map_error_status, ChatRequest, ChatResponse, LLMClient, BACKOFF,
};
use crate::types::{AppError, Result};

const DEFAULT_AUTH_URL: &str = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth";
const DEFAULT_BASE_URL: &str = "https://gigachat.devices.sberbank.ru/api/v1";
const DEFAULT_SCOPE: &str = "GIGACHAT_API_PERS";
const MODEL: &str = "GigaChat";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TOKEN_EARLY_REFRESH: chrono::Duration = chrono::Duration::minutes(5);

pub struct GigaChatClient {
    auth_key: String,
    scope: String,
    auth_url: String,
    base_url: String,
    http: reqwest::Client,
    token: RwLock<Option<CachedToken>>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Utc::now() < self.expires_at - TOKEN_EARLY_REFRESH
    }
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
    /// Expiry in unix milliseconds.
    expires_at: i64,
}

impl GigaChatClient {
    pub fn new(auth_key: String, scope: String, auth_url: String, base_url: String) -> Self {
        let scope = if scope.is_empty() {
            DEFAULT_SCOPE.to_string()
        } else {
            scope
        };
        let auth_url = if auth_url.is_empty() {
            DEFAULT_AUTH_URL.to_string()
        } else {
            auth_url
        };
        let base_url = if base_url.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            base_url
        };

        // The auth endpoint presents a self-signed certificate.
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .build()
            .unwrap_or_default();

        Self {
            auth_key,
            scope,
            auth_url,
            base_url,
            http,
            token: RwLock::new(None),
        }
    }

    async fn get_token(&self) -> Result<String> {
        if let Some(cached) = self.token.read().as_ref() {
            if cached.is_fresh() {
                return Ok(cached.access_token.clone());
            }
        }
        self.refresh_token().await
    }

    async fn refresh_token(&self) -> Result<String> {
        let response = self
            .http
            .post(&self.auth_url)
            .header("Authorization", format!("Basic {}", self.auth_key))
            .header("Accept", "application/json")
            .header("RqUID", uuid::Uuid::new_v4().to_string())
            .form(&[("scope", self.scope.as_str())])
            .send()
            .await
            .map_err(|_| AppError::LLMAuthFailed)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "gigachat auth failed");
            return Err(AppError::LLMAuthFailed);
        }

        let auth: AuthResponse = response.json().await.map_err(|_| AppError::LLMAuthFailed)?;

        let expires_at = Utc
            .timestamp_millis_opt(auth.expires_at)
            .single()
            .unwrap_or_else(Utc::now);

        tracing::debug!(expires = %expires_at, "gigachat token refreshed");

        let token = auth.access_token.clone();
        *self.token.write() = Some(CachedToken {
            access_token: auth.access_token,
            expires_at,
        });

        Ok(token)
    }

    fn invalidate_token(&self) {
        *self.token.write() = None;
    }

    async fn send_once(&self, request: &ChatRequest, token: &str) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(token)
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
                return Err(AppError::LLMRequestFailed(format!(
                    "server error: {}",
                    status.as_u16()
                )));
            }
            return Err(map_error_status(status, &body, "gigachat"));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::LLMRequestFailed(format!("unmarshal response: {}", e)))?;

        extract_content(&parsed)
    }

    async fn complete_attempt(&self, request: &ChatRequest) -> Result<String> {
        let token = self.get_token().await?;

        match self.send_once(request, &token).await {
            Err(AppError::LLMAuthFailed) => {
                // Token may have been revoked; refresh once and retry.
                self.invalidate_token();
                let token = self.refresh_token().await?;
                match self.send_once(request, &token).await {
                    Err(AppError::LLMAuthFailed) => Err(AppError::LLMAuthFailed),
                    other => other,
                }
            }
            other => other,
        }
    }

    fn is_retryable(err: &AppError) -> bool {
        matches!(err, AppError::LLMRequestFailed(msg)
            if msg.starts_with("server error")
                || !(msg.starts_with("status ") || msg.starts_with("unmarshal")))
    }
}

#[async_trait]
impl LLMClient for GigaChatClient {
    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        let request = ChatRequest::new(MODEL, system, prompt);

        let mut last_err = AppError::LLMRequestFailed("no attempts made".to_string());
        for attempt in 0..=BACKOFF.len() {
            if attempt > 0 {
                tokio::time::sleep(BACKOFF[attempt - 1]).await;
            }

            match self.complete_attempt(&request).await {
                Ok(content) => return Ok(content),
                Err(err) if Self::is_retryable(&err) => {
                    tracing::warn!(attempt, error = %err, "gigachat request failed, retrying");
                    last_err = err;
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err)
    }

    fn provider_name(&self) -> &str {
        "gigachat"
    }
}
