//! LLM provider integration.
//!
//! Providers expose one operation: a system+user completion returning plain
//! text. Each client speaks its provider's chat-completions dialect over
//! raw JSON and retries transient failures with bounded backoff.

pub mod client;
pub mod gigachat;
pub mod mock;
pub mod openrouter;

pub use client::{LLMClient, Provider};
pub use gigachat::GigaChatClient;
pub use mock::MockLLMClient;
pub use openrouter::OpenRouterClient;
