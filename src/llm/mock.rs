//! Scripted LLM client for tests and offline runs.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use crate::llm::client::LLMClient;
use crate::types::{AppError, Result};

const DEFAULT_RESPONSE: &str = "This is a mock response with sources [S1] and [S2].";

/// One recorded completion call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub prompt: String,
}

/// Mock client that replays a scripted sequence of responses. When the
/// script runs out, the last scripted response repeats. Records every call
/// for assertions.
pub struct MockLLMClient {
    script: Mutex<VecDeque<String>>,
    fallback: Mutex<String>,
    fail_with: Mutex<Option<fn() -> AppError>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockLLMClient {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(DEFAULT_RESPONSE.to_string()),
            fail_with: Mutex::new(None),
            delay: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with the same text.
    pub fn with_response(self, response: &str) -> Self {
        *self.fallback.lock() = response.to_string();
        self
    }

    /// Answer with each script entry in order, then repeat the last one.
    pub fn with_script(self, responses: Vec<&str>) -> Self {
        let script: VecDeque<String> = responses.into_iter().map(String::from).collect();
        if let Some(last) = script.back().cloned() {
            *self.fallback.lock() = last;
        }
        *self.script.lock() = script;
        self
    }

    /// Fail every call with the given error constructor.
    pub fn failing_with(self, err: fn() -> AppError) -> Self {
        *self.fail_with.lock() = Some(err);
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().last().cloned()
    }
}

impl Default for MockLLMClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.calls.lock().push(RecordedCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
        });

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = *self.fail_with.lock() {
            return Err(err());
        }

        let next = self.script.lock().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.lock().clone()))
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_response() {
        let client = MockLLMClient::new();
        let out = client.complete_with_system("sys", "prompt").await.unwrap();
        assert_eq!(out, DEFAULT_RESPONSE);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_script_plays_in_order_then_repeats() {
        let client = MockLLMClient::new().with_script(vec!["first", "second"]);

        assert_eq!(
            client.complete_with_system("s", "p").await.unwrap(),
            "first"
        );
        assert_eq!(
            client.complete_with_system("s", "p").await.unwrap(),
            "second"
        );
        assert_eq!(
            client.complete_with_system("s", "p").await.unwrap(),
            "second"
        );
    }

    #[tokio::test]
    async fn test_failing_client() {
        let client = MockLLMClient::new().failing_with(|| AppError::LLMRateLimited);
        assert!(matches!(
            client.complete_with_system("s", "p").await,
            Err(AppError::LLMRateLimited)
        ));
    }

    #[tokio::test]
    async fn test_records_calls() {
        let client = MockLLMClient::new();
        client.complete_with_system("sys-a", "prompt-a").await.unwrap();
        client.complete_with_system("sys-b", "prompt-b").await.unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].system, "sys-a");
        assert_eq!(calls[1].prompt, "prompt-b");
    }
}
