use axum::{
    Json,
    extract::{Query, State},
};
use std::sync::Arc;

use crate::models::{
    AnalyzeProfileQuery, AnalyzeProfileResponse, BreakdownRequest, BreakdownResponse,
};
use crate::services::profile_analyzer::{
    AnalysisOptions, BreakdownOptions, ShardRanker, summarize_node,
};
use crate::utils::{ApiError, ApiResult};

/// Merge query string overrides into the configured analysis options
fn resolve_options(
    defaults: &AnalysisOptions,
    query: &AnalyzeProfileQuery,
) -> ApiResult<AnalysisOptions> {
    let mut options = *defaults;
    if let Some(top_n) = query.top_n {
        options.top_n = ShardRanker::validate_top_n(top_n)?;
    }
    if let Some(include_zero) = query.include_zero {
        options.include_zero_breakdown = include_zero;
    }
    Ok(options)
}

// Analyze a raw profile response
#[utoipa::path(
    post,
    path = "/api/profiles/analyze",
    params(AnalyzeProfileQuery),
    request_body(content = String, description = "Raw search response with profiling enabled", content_type = "application/json"),
    responses(
        (status = 200, description = "Profile analysis", body = AnalyzeProfileResponse),
        (status = 400, description = "Invalid query parameter"),
        (status = 413, description = "Profile exceeds a size, depth or node limit"),
        (status = 422, description = "Profile does not match the expected structure")
    ),
    tag = "Profiles"
)]
pub async fn analyze_profile(
    State(state): State<Arc<crate::AppState>>,
    Query(query): Query<AnalyzeProfileQuery>,
    body: String,
) -> ApiResult<Json<AnalyzeProfileResponse>> {
    let options = resolve_options(&state.analysis_options, &query)?;

    tracing::info!(
        "Analyzing profile ({} bytes, top_n={}, include_zero={})",
        body.len(),
        options.top_n,
        options.include_zero_breakdown
    );

    // Parsing a large profile is CPU bound; keep it off the async workers
    let cache = Arc::clone(&state.analysis_cache);
    let (analysis, cache_hit) =
        tokio::task::spawn_blocking(move || cache.get_or_analyze(&body, &options))
            .await
            .map_err(|e| ApiError::internal_error(format!("Analysis task failed: {}", e)))??;

    Ok(Json(AnalyzeProfileResponse { analysis, cache_hit, analyzed_at: chrono::Utc::now() }))
}

// Summarize the breakdown of a single component node
#[utoipa::path(
    post,
    path = "/api/profiles/breakdown",
    request_body = BreakdownRequest,
    responses(
        (status = 200, description = "Breakdown of the addressed node", body = BreakdownResponse),
        (status = 400, description = "No node at the given path"),
        (status = 413, description = "Profile exceeds a depth or node limit"),
        (status = 422, description = "Profile does not match the expected structure")
    ),
    tag = "Profiles"
)]
pub async fn get_node_breakdown(
    State(state): State<Arc<crate::AppState>>,
    Json(request): Json<BreakdownRequest>,
) -> ApiResult<Json<BreakdownResponse>> {
    let document = state.analysis_options.composer().parse_value(&request.profile)?;
    let options = BreakdownOptions { include_zero: request.include_zero };

    let breakdown = summarize_node(&document, &request.path, options)?;
    let breakdown_total_nanos = breakdown
        .entries
        .iter()
        .fold(0u64, |acc, entry| acc.saturating_add(entry.nanos));

    tracing::debug!("Breakdown for {}: {} operations", breakdown.path, breakdown.entries.len());

    Ok(Json(BreakdownResponse { breakdown, breakdown_total_nanos }))
}
