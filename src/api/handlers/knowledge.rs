use crate::{
    types::{KnowledgeResponse, Result},
    AppState,
};
use axum::{
    extract::{Path, State},
    Json,
};

/// Summarize what the world model has learned for this user.
#[utoipa::path(
    get,
    path = "/api/knowledge/{principal_id}",
    responses((status = 200, description = "Knowledge summary", body = KnowledgeResponse)),
    tag = "knowledge"
)]
pub async fn user_knowledge(
    State(state): State<AppState>,
    Path(principal_id): Path<i64>,
) -> Result<Json<KnowledgeResponse>> {
    let user = state.users.get_or_create(principal_id, "").await?;

    let Some(world_model) = &state.world_model else {
        return Ok(Json(KnowledgeResponse {
            total_facts: 0,
            total_entities: 0,
            recent_questions: vec![],
            top_entities: vec![],
        }));
    };

    let summary = world_model.user_knowledge(user.id).await?;

    Ok(Json(KnowledgeResponse {
        total_facts: summary.total_facts,
        total_entities: summary.total_entities,
        recent_questions: summary
            .recent_sessions
            .iter()
            .map(|s| s.question.clone())
            .collect(),
        top_entities: summary
            .top_entities
            .iter()
            .map(|e| e.name.clone())
            .collect(),
    }))
}
