//! Search Profiler Library
//!
//! Analysis engine for search profile responses plus the HTTP surface that serves it.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use services::profile_analyzer::{AnalysisOptions, ProfileAnalysis, analyze_profile};
pub use services::AnalysisCache;

/// Application shared state
#[derive(Clone)]
pub struct AppState {
    pub analysis_options: AnalysisOptions,
    pub analysis_cache: Arc<AnalysisCache>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let analysis_cache = if config.cache.enabled {
            AnalysisCache::new(config.cache.capacity, config.cache.ttl())
        } else {
            AnalysisCache::disabled()
        };

        Self {
            analysis_options: config.to_analysis_options(),
            analysis_cache: Arc::new(analysis_cache),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::profile::analyze_profile,
        handlers::profile::get_node_breakdown,
    ),
    components(
        schemas(
            models::AnalyzeProfileQuery,
            models::AnalyzeProfileResponse,
            models::BreakdownRequest,
            models::BreakdownResponse,
            utils::error::ErrorBody,
        )
    ),
    tags(
        (name = "Profiles", description = "Search profile analysis"),
    )
)]
pub struct ApiDoc;

/// Build the application router: API routes, health probes and the OpenAPI UI
pub fn build_router(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.analysis_options.max_input_bytes;

    let api_routes = Router::new()
        .route("/api/profiles/analyze", post(handlers::profile::analyze_profile))
        .route("/api/profiles/breakdown", post(handlers::profile::get_node_breakdown))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state);

    let health_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check));

    Router::new()
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_routes)
        .merge(health_routes)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn ready_check() -> &'static str {
    "READY"
}
