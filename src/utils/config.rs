use std::env;
use std::time::Duration;

use crate::domain::StrategyKind;
use crate::llm::Provider;
use crate::types::{AppError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub llm: LLMConfig,
    pub search: SearchConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub critic: CriticSettings,
    pub default_strategy: StrategyKind,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// "memory" or "libsql".
    pub backend: String,
    /// Local database path for the libsql backend (used when no remote URL
    /// is configured).
    pub database_path: String,
    pub database_url: String,
    pub database_auth_token: String,
}

#[derive(Debug, Clone)]
pub struct LLMConfig {
    /// "openrouter", "gigachat", or "mock".
    pub provider: String,
    pub openrouter_api_key: String,
    pub openrouter_model: String,
    pub openrouter_base_url: String,
    pub gigachat_auth_key: String,
    pub gigachat_scope: String,
    pub gigachat_auth_url: String,
    pub gigachat_base_url: String,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub tavily_api_key: String,
    pub tavily_base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_minute: usize,
}

#[derive(Debug, Clone)]
pub struct CriticSettings {
    pub max_retries: usize,
    pub strict_mode: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: env_or("HOST", "127.0.0.1"),
                port: parse_env("PORT", 3000)?,
            },
            storage: StorageConfig {
                backend: env_or("STORAGE_BACKEND", "memory"),
                database_path: env_or("DATABASE_PATH", "orion.db"),
                database_url: env::var("DATABASE_URL").unwrap_or_default(),
                database_auth_token: env::var("DATABASE_AUTH_TOKEN").unwrap_or_default(),
            },
            llm: LLMConfig {
                provider: env_or("LLM_PROVIDER", "mock"),
                openrouter_api_key: env::var("OPENROUTER_API_KEY").unwrap_or_default(),
                openrouter_model: env_or("OPENROUTER_MODEL", "deepseek/deepseek-chat"),
                openrouter_base_url: env_or("OPENROUTER_BASE_URL", "https://openrouter.ai/api/v1"),
                gigachat_auth_key: env::var("GIGACHAT_AUTH_KEY").unwrap_or_default(),
                gigachat_scope: env_or("GIGACHAT_SCOPE", "GIGACHAT_API_PERS"),
                gigachat_auth_url: env::var("GIGACHAT_AUTH_URL").unwrap_or_default(),
                gigachat_base_url: env::var("GIGACHAT_BASE_URL").unwrap_or_default(),
            },
            search: SearchConfig {
                tavily_api_key: env::var("TAVILY_API_KEY").unwrap_or_default(),
                tavily_base_url: env_or("TAVILY_BASE_URL", "https://api.tavily.com"),
                timeout: Duration::from_secs(parse_env("TAVILY_TIMEOUT_SEC", 30u64)?),
            },
            cache: CacheConfig {
                ttl: Duration::from_secs(parse_env("CACHE_TTL_SEC", 3600u64)?),
                sweep_interval: Duration::from_secs(parse_env("CACHE_SWEEP_INTERVAL_SEC", 300u64)?),
            },
            rate_limit: RateLimitConfig {
                requests_per_minute: parse_env("RATE_LIMIT_PER_MINUTE", 10usize)?,
            },
            critic: CriticSettings {
                max_retries: parse_env("CRITIC_MAX_RETRIES", 2usize)?,
                strict_mode: env_or("CRITIC_STRICT_MODE", "false") == "true",
            },
            default_strategy: env_or("DEFAULT_STRATEGY", "standard")
                .parse()
                .map_err(|_| AppError::Configuration("invalid DEFAULT_STRATEGY".to_string()))?,
            log_level: env_or("LOG_LEVEL", "info"),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        match self.llm.provider.as_str() {
            "openrouter" => {
                if self.llm.openrouter_api_key.is_empty() {
                    return Err(AppError::Configuration(
                        "OPENROUTER_API_KEY is required for the openrouter provider".to_string(),
                    ));
                }
            }
            "gigachat" => {
                if self.llm.gigachat_auth_key.is_empty() {
                    return Err(AppError::Configuration(
                        "GIGACHAT_AUTH_KEY is required for the gigachat provider".to_string(),
                    ));
                }
            }
            "mock" => {}
            other => {
                return Err(AppError::Configuration(format!(
                    "unknown LLM provider: {}",
                    other
                )));
            }
        }

        match self.storage.backend.as_str() {
            "memory" | "libsql" => {}
            other => {
                return Err(AppError::Configuration(format!(
                    "unknown storage backend: {}",
                    other
                )));
            }
        }

        if self.critic.max_retries > 10 {
            return Err(AppError::Configuration(
                "CRITIC_MAX_RETRIES cannot exceed 10".to_string(),
            ));
        }

        Ok(())
    }

    /// Provider configuration for the configured LLM backend.
    pub fn llm_provider(&self) -> Provider {
        match self.llm.provider.as_str() {
            "openrouter" => Provider::OpenRouter {
                api_key: self.llm.openrouter_api_key.clone(),
                model: self.llm.openrouter_model.clone(),
                base_url: self.llm.openrouter_base_url.clone(),
            },
            "gigachat" => Provider::GigaChat {
                auth_key: self.llm.gigachat_auth_key.clone(),
                scope: self.llm.gigachat_scope.clone(),
                auth_url: self.llm.gigachat_auth_url.clone(),
                base_url: self.llm.gigachat_base_url.clone(),
            },
            _ => Provider::Mock,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| AppError::Configuration(format!("invalid {}", key))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_needs_no_keys() {
        let config = mock_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm_provider().name(), "mock");
    }

    #[test]
    fn test_openrouter_requires_key() {
        let mut config = mock_config();
        config.llm.provider = "openrouter".to_string();
        assert!(config.validate().is_err());

        config.llm.openrouter_api_key = "key".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = mock_config();
        config.llm.provider = "claude".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut config = mock_config();
        config.storage.backend = "postgres".to_string();
        assert!(config.validate().is_err());
    }

    fn mock_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                backend: "memory".to_string(),
                database_path: String::new(),
                database_url: String::new(),
                database_auth_token: String::new(),
            },
            llm: LLMConfig {
                provider: "mock".to_string(),
                openrouter_api_key: String::new(),
                openrouter_model: String::new(),
                openrouter_base_url: String::new(),
                gigachat_auth_key: String::new(),
                gigachat_scope: String::new(),
                gigachat_auth_url: String::new(),
                gigachat_base_url: String::new(),
            },
            search: SearchConfig {
                tavily_api_key: String::new(),
                tavily_base_url: String::new(),
                timeout: Duration::from_secs(30),
            },
            cache: CacheConfig {
                ttl: Duration::from_secs(3600),
                sweep_interval: Duration::from_secs(300),
            },
            rate_limit: RateLimitConfig {
                requests_per_minute: 10,
            },
            critic: CriticSettings {
                max_retries: 2,
                strict_mode: false,
            },
            default_strategy: StrategyKind::Standard,
            log_level: "info".to_string(),
        }
    }
}
