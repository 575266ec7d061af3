use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============= Error Types =============

/// All error kinds the core can surface. Variants are stable: the API layer
/// maps each kind to a fixed status code and a fixed user-facing string, so
/// raw provider messages never reach users.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Validation
    #[error("empty query")]
    EmptyQuery,
    #[error("query too long")]
    QueryTooLong,
    #[error("invalid url")]
    InvalidUrl,
    #[error("invalid strategy")]
    InvalidStrategy,
    #[error("max queries must be between 1 and 10")]
    InvalidMaxQueries,
    #[error("max results must be between 1 and 100")]
    InvalidMaxResults,
    #[error("max analysis iterations must be at least 1")]
    InvalidAnalysisIterations,
    #[error("timeout seconds must be at least 1")]
    InvalidTimeout,
    #[error("invalid trust level")]
    InvalidTrustLevel,
    #[error("max retries cannot exceed 10")]
    InvalidMaxRetries,
    #[error("empty question")]
    EmptyQuestion,
    #[error("empty content")]
    EmptyContent,
    #[error("empty entity name")]
    EmptyEntityName,
    #[error("invalid entity type")]
    InvalidEntityType,

    // Domain
    #[error("no sources available")]
    NoSources,
    #[error("no results found")]
    NoResults,
    #[error("source limit reached")]
    SourceLimitReached,
    #[error("source already exists")]
    DuplicateSource,
    #[error("no agent responses received")]
    NoAgentResponses,

    // Not found
    #[error("user not found")]
    UserNotFound,
    #[error("source not found")]
    SourceNotFound,
    #[error("not found")]
    NotFound,

    // LLM integration
    #[error("llm authentication failed")]
    LLMAuthFailed,
    #[error("llm rate limit exceeded")]
    LLMRateLimited,
    #[error("llm returned an empty response")]
    LLMEmptyResponse,
    #[error("llm request failed: {0}")]
    LLMRequestFailed(String),

    // Search integration
    #[error("search authentication failed")]
    SearchUnauthorized,
    #[error("search rate limit exceeded")]
    SearchRateLimited,
    #[error("invalid search request")]
    SearchInvalidRequest,
    #[error("search request failed: {0}")]
    SearchFailed(String),

    // Infrastructure
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("database error: {0}")]
    Database(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Deterministic user-facing message for this error kind.
    /// Payload-carrying variants collapse to a generic line.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::EmptyQuery => "Your question is empty.",
            AppError::QueryTooLong => "Your question is too long (max 1000 characters).",
            AppError::InvalidUrl => "That URL is not valid. Use http:// or https://.",
            AppError::InvalidStrategy
            | AppError::InvalidMaxQueries
            | AppError::InvalidMaxResults
            | AppError::InvalidAnalysisIterations
            | AppError::InvalidTimeout
            | AppError::InvalidMaxRetries => "The research strategy is invalid.",
            AppError::InvalidTrustLevel => "Trust level must be high, medium, or low.",
            AppError::EmptyQuestion | AppError::EmptyContent | AppError::EmptyEntityName => {
                "The request is missing required content."
            }
            AppError::InvalidEntityType => "Unknown entity type.",
            AppError::NoSources => "You have no sources configured. Add sources first.",
            AppError::NoResults => "No results found in your sources for this question.",
            AppError::SourceLimitReached => "Source limit reached (max 100).",
            AppError::DuplicateSource => "That source is already registered.",
            AppError::NoAgentResponses => "Analysis failed. Please try again.",
            AppError::UserNotFound => "User not found.",
            AppError::SourceNotFound => "Source not found.",
            AppError::NotFound => "Not found.",
            AppError::LLMAuthFailed
            | AppError::LLMRateLimited
            | AppError::LLMEmptyResponse
            | AppError::LLMRequestFailed(_) => {
                "The analysis service is unavailable. Try again later."
            }
            AppError::SearchUnauthorized
            | AppError::SearchRateLimited
            | AppError::SearchInvalidRequest
            | AppError::SearchFailed(_) => "The search service is unavailable. Try again later.",
            AppError::RateLimited => "Too many requests. Please wait a minute.",
            AppError::DeadlineExceeded => "The request timed out. Try a quicker strategy.",
            AppError::Database(_) | AppError::Configuration(_) | AppError::Internal(_) => {
                "Something went wrong. Please try again."
            }
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::EmptyQuery
            | AppError::QueryTooLong
            | AppError::InvalidUrl
            | AppError::InvalidStrategy
            | AppError::InvalidMaxQueries
            | AppError::InvalidMaxResults
            | AppError::InvalidAnalysisIterations
            | AppError::InvalidTimeout
            | AppError::InvalidTrustLevel
            | AppError::InvalidMaxRetries
            | AppError::EmptyQuestion
            | AppError::EmptyContent
            | AppError::EmptyEntityName
            | AppError::InvalidEntityType
            | AppError::NoSources
            | AppError::SourceLimitReached => StatusCode::BAD_REQUEST,
            AppError::DuplicateSource => StatusCode::CONFLICT,
            AppError::NoResults
            | AppError::UserNotFound
            | AppError::SourceNotFound
            | AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            AppError::LLMAuthFailed
            | AppError::LLMRateLimited
            | AppError::LLMEmptyResponse
            | AppError::LLMRequestFailed(_)
            | AppError::SearchUnauthorized
            | AppError::SearchRateLimited
            | AppError::SearchInvalidRequest
            | AppError::SearchFailed(_)
            | AppError::NoAgentResponses => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.user_message()
        });
        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryApiRequest {
    /// Stable external principal id.
    pub principal_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Free-form message; may start with /quick, /research, or /deep.
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryApiResponse {
    pub answer: String,
    pub sources: Vec<SourceRefDto>,
    pub strategy: String,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SourceRefDto {
    pub marker: String,
    pub title: String,
    pub url: String,
    pub trust_level: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddSourceRequest {
    pub principal_id: i64,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SourceDto {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub trust_level: String,
    pub is_user_added: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetTrustRequest {
    pub trust_level: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SeedImportResponse {
    pub imported: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct KnowledgeResponse {
    pub total_facts: usize,
    pub total_entities: usize,
    pub recent_questions: Vec<String>,
    pub top_entities: Vec<String>,
}
