use crate::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/query", post(crate::api::handlers::query::query))
        .route("/sources", post(crate::api::handlers::sources::add_source))
        .route(
            "/sources/{principal_id}",
            get(crate::api::handlers::sources::list_sources),
        )
        .route(
            "/sources/{principal_id}/seed",
            post(crate::api::handlers::sources::import_seed),
        )
        .route(
            "/sources/{principal_id}/{source_id}",
            delete(crate::api::handlers::sources::remove_source),
        )
        .route(
            "/sources/{principal_id}/{source_id}/trust",
            put(crate::api::handlers::sources::set_trust),
        )
        .route(
            "/knowledge/{principal_id}",
            get(crate::api::handlers::knowledge::user_knowledge),
        )
}
