use crate::{
    domain::TrustLevel,
    types::{
        AddSourceRequest, Result, SeedImportResponse, SetTrustRequest, SourceDto,
    },
    AppState,
};
use axum::{
    extract::{Path, State},
    Json,
};

fn to_dto(source: &crate::domain::Source) -> SourceDto {
    SourceDto {
        id: source.id,
        url: source.url.clone(),
        name: source.name.clone(),
        trust_level: source.trust_level.as_str().to_string(),
        is_user_added: source.is_user_added,
    }
}

/// Register a new source.
#[utoipa::path(
    post,
    path = "/api/sources",
    request_body = AddSourceRequest,
    responses(
        (status = 200, description = "Source added", body = SourceDto),
        (status = 400, description = "Invalid URL or limit reached"),
        (status = 409, description = "Source already exists")
    ),
    tag = "sources"
)]
pub async fn add_source(
    State(state): State<AppState>,
    Json(payload): Json<AddSourceRequest>,
) -> Result<Json<SourceDto>> {
    let user = state.users.get_or_create(payload.principal_id, "").await?;
    let source = state.sources.add(user.id, &payload.url).await?;
    Ok(Json(to_dto(&source)))
}

/// List the user's sources, newest first.
#[utoipa::path(
    get,
    path = "/api/sources/{principal_id}",
    responses((status = 200, description = "Sources", body = [SourceDto])),
    tag = "sources"
)]
pub async fn list_sources(
    State(state): State<AppState>,
    Path(principal_id): Path<i64>,
) -> Result<Json<Vec<SourceDto>>> {
    let user = state.users.get_or_create(principal_id, "").await?;
    let sources = state.sources.list(user.id).await?;
    Ok(Json(sources.iter().map(to_dto).collect()))
}

/// Remove one of the user's sources.
#[utoipa::path(
    delete,
    path = "/api/sources/{principal_id}/{source_id}",
    responses(
        (status = 200, description = "Source removed"),
        (status = 404, description = "Source not found")
    ),
    tag = "sources"
)]
pub async fn remove_source(
    State(state): State<AppState>,
    Path((principal_id, source_id)): Path<(i64, i64)>,
) -> Result<Json<serde_json::Value>> {
    let user = state.users.get_or_create(principal_id, "").await?;
    state.sources.remove(user.id, source_id).await?;
    Ok(Json(serde_json::json!({ "removed": source_id })))
}

/// Update a source's trust level.
#[utoipa::path(
    put,
    path = "/api/sources/{principal_id}/{source_id}/trust",
    request_body = SetTrustRequest,
    responses(
        (status = 200, description = "Trust level updated"),
        (status = 400, description = "Invalid trust level"),
        (status = 404, description = "Source not found")
    ),
    tag = "sources"
)]
pub async fn set_trust(
    State(state): State<AppState>,
    Path((principal_id, source_id)): Path<(i64, i64)>,
    Json(payload): Json<SetTrustRequest>,
) -> Result<Json<serde_json::Value>> {
    let level: TrustLevel = payload.trust_level.parse()?;
    let user = state.users.get_or_create(principal_id, "").await?;
    state.sources.set_trust_level(user.id, source_id, level).await?;
    Ok(Json(serde_json::json!({ "trust_level": level.as_str() })))
}

/// Import the curated seed sources for a user. Idempotent.
#[utoipa::path(
    post,
    path = "/api/sources/{principal_id}/seed",
    responses((status = 200, description = "Seed imported", body = SeedImportResponse)),
    tag = "sources"
)]
pub async fn import_seed(
    State(state): State<AppState>,
    Path(principal_id): Path<i64>,
) -> Result<Json<SeedImportResponse>> {
    let user = state.users.get_or_create(principal_id, "").await?;
    let imported = state.sources.import_seed(user.id).await?;
    Ok(Json(SeedImportResponse { imported }))
}
