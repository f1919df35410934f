use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::services::profile_analyzer::{NodeBreakdown, NodePath, ProfileAnalysis};

/// Query string of `POST /api/profiles/analyze`
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AnalyzeProfileQuery {
    /// Number of slow shards to return (>= 1)
    pub top_n: Option<i64>,
    /// Keep zero-valued breakdown operations
    pub include_zero: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalyzeProfileResponse {
    #[schema(value_type = Object)]
    pub analysis: Arc<ProfileAnalysis>,
    pub cache_hit: bool,
    pub analyzed_at: DateTime<Utc>,
}

/// Breakdown of one node in an already fetched profile
#[derive(Debug, Deserialize, ToSchema)]
pub struct BreakdownRequest {
    /// The full profile response
    #[schema(value_type = Object)]
    pub profile: serde_json::Value,
    #[schema(value_type = Object)]
    pub path: NodePath,
    #[serde(default = "default_include_zero")]
    pub include_zero: bool,
}

fn default_include_zero() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BreakdownResponse {
    #[schema(value_type = Object)]
    pub breakdown: NodeBreakdown,
    /// Sum of the summarized operations, in nanoseconds
    pub breakdown_total_nanos: u64,
}
