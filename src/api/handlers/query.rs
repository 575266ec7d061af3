use crate::{
    chat::parse_query_command,
    domain::{QueryRequest, Strategy},
    types::{QueryApiRequest, QueryApiResponse, Result, SourceRefDto},
    AppState,
};
use axum::{extract::State, Json};
use std::time::Instant;

/// Answer a research question.
#[utoipa::path(
    post,
    path = "/api/query",
    request_body = QueryApiRequest,
    responses(
        (status = 200, description = "Answer produced", body = QueryApiResponse),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "No sources or no results"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "query"
)]
pub async fn query(
    State(state): State<AppState>,
    Json(payload): Json<QueryApiRequest>,
) -> Result<Json<QueryApiResponse>> {
    let start = Instant::now();

    let user = state
        .users
        .get_or_create(
            payload.principal_id,
            payload.display_name.as_deref().unwrap_or(""),
        )
        .await?;

    if !state.rate_limiter.allow(payload.principal_id) {
        state.metrics.record_rate_limit_hit(payload.principal_id);
        return Err(crate::types::AppError::RateLimited);
    }

    let default_strategy = Strategy::for_kind(state.config.default_strategy);
    let (question, strategy) = parse_query_command(&payload.message, default_strategy);

    let response = state
        .orchestrator
        .process(QueryRequest {
            user_id: user.id,
            text: question,
            strategy,
        })
        .await?;

    let sources = response
        .sources
        .iter()
        .map(|s| SourceRefDto {
            marker: s.marker.clone(),
            title: s.title.clone(),
            url: s.url.clone(),
            trust_level: s.trust_level.as_str().to_string(),
        })
        .collect();

    Ok(Json(QueryApiResponse {
        answer: response.text,
        sources,
        strategy: strategy.kind.as_str().to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
    }))
}
