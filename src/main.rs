use std::sync::Arc;

use axum::{routing::get, Json, Router};
use orion::{
    agents,
    cache::TtlCache,
    domain::CriticConfig,
    metrics::Metrics,
    ratelimit::RateLimiter,
    repository::{
        LibsqlRepositories, MemorySourceRepository, MemoryUserRepository,
        MemoryWorldModelRepository, SourceRepository, UserRepository, WorldModelRepository,
    },
    research::{CriticService, QueryOrchestrator, SearchFanout, WorldModelService},
    search::{MockSearchClient, SearchClient, TavilyClient},
    services::{SourceService, UserService},
    utils::config::Config,
    AppState,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first so the log level can come from it.
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting O.R.I.O.N. - Orchestrated Research Intelligence Over Networks");

    // Repositories
    let (user_repo, source_repo, world_repo): (
        Arc<dyn UserRepository>,
        Arc<dyn SourceRepository>,
        Arc<dyn WorldModelRepository>,
    ) = if config.storage.backend == "libsql" {
        let repos = if config.storage.database_url.is_empty() {
            LibsqlRepositories::new_local(&config.storage.database_path).await?
        } else {
            LibsqlRepositories::new_remote(
                config.storage.database_url.clone(),
                config.storage.database_auth_token.clone(),
            )
            .await?
        };
        let repos = Arc::new(repos);
        tracing::info!("libsql storage initialized");
        (repos.clone(), repos.clone(), repos)
    } else {
        tracing::info!("in-memory storage initialized");
        (
            Arc::new(MemoryUserRepository::new()),
            Arc::new(MemorySourceRepository::new()),
            Arc::new(MemoryWorldModelRepository::new()),
        )
    };

    // Providers
    let provider = config.llm_provider();
    tracing::info!(provider = provider.name(), "LLM provider initialized");
    let llm = provider.create_client();

    let search: Arc<dyn SearchClient> = if config.search.tavily_api_key.is_empty() {
        tracing::warn!("TAVILY_API_KEY not set, using mock search client");
        Arc::new(
            MockSearchClient::new().with_results(vec![offline_search_result()]),
        )
    } else {
        Arc::new(TavilyClient::new(
            config.search.tavily_api_key.clone(),
            config.search.tavily_base_url.clone(),
            config.search.timeout,
        ))
    };

    // Core components
    let metrics = Arc::new(Metrics::new());
    let cache = TtlCache::new(config.cache.sweep_interval);
    let rate_limiter = RateLimiter::new(config.rate_limit.requests_per_minute);

    let fanout = SearchFanout::new(
        Arc::clone(&search),
        Arc::clone(&cache),
        config.cache.ttl,
        orion::research::fanout::DEFAULT_SEARCH_TIMEOUT,
    )
    .with_metrics(Arc::clone(&metrics));

    let coordinator = Arc::new(agents::Coordinator::new(
        agents::all_agents(Arc::clone(&llm)),
        Arc::clone(&llm),
    ));

    let critic = Arc::new(CriticService::new(
        Arc::clone(&llm),
        CriticConfig {
            max_retries: config.critic.max_retries,
            strict_mode: config.critic.strict_mode,
        },
    ));

    let world_model = Arc::new(WorldModelService::new(
        Arc::clone(&world_repo),
        Arc::clone(&llm),
    ));

    let orchestrator = Arc::new(
        QueryOrchestrator::new(Arc::clone(&source_repo), Arc::clone(&llm), fanout)
            .with_coordinator(coordinator)
            .with_critic(critic)
            .with_world_model(Arc::clone(&world_model))
            .with_metrics(Arc::clone(&metrics)),
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        orchestrator,
        users: Arc::new(UserService::new(user_repo)),
        sources: Arc::new(SourceService::new(source_repo)),
        world_model: Some(world_model),
        rate_limiter: Arc::clone(&rate_limiter),
        metrics: Arc::clone(&metrics),
    };

    // Build OpenAPI documentation
    #[derive(OpenApi)]
    #[openapi(
        paths(
            orion::api::handlers::query::query,
            orion::api::handlers::sources::add_source,
            orion::api::handlers::sources::list_sources,
            orion::api::handlers::sources::remove_source,
            orion::api::handlers::sources::set_trust,
            orion::api::handlers::sources::import_seed,
            orion::api::handlers::knowledge::user_knowledge,
        ),
        components(schemas(
            orion::types::QueryApiRequest,
            orion::types::QueryApiResponse,
            orion::types::SourceRefDto,
            orion::types::AddSourceRequest,
            orion::types::SourceDto,
            orion::types::SetTrustRequest,
            orion::types::SeedImportResponse,
            orion::types::KnowledgeResponse,
        )),
        tags(
            (name = "query", description = "Research query endpoints"),
            (name = "sources", description = "Trusted source management"),
            (name = "knowledge", description = "World model endpoints"),
        ),
        info(
            title = "O.R.I.O.N. API",
            version = "0.1.0",
            description = "Source-grounded research server with multi-expert analysis"
        )
    )]
    struct ApiDoc;

    let metrics_for_handler = Arc::clone(&metrics);
    let app = Router::new()
        .route("/health", get(health_check))
        .route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics_for_handler);
                async move { Json(metrics.snapshot()) }
            }),
        )
        .nest("/api", orion::api::routes::create_router())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop background sweepers before exiting.
    cache.stop();
    rate_limiter.stop();
    tracing::info!("shutdown complete");

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

/// Placeholder result so the pipeline stays usable without a search key.
fn offline_search_result() -> orion::search::SearchResult {
    orion::search::SearchResult {
        title: "Example result".to_string(),
        url: "https://example.com/article".to_string(),
        content: "Stub search content for offline runs.".to_string(),
        score: 0.5,
        published_date: String::new(),
    }
}
