//! Search Profile Analyzer
//!
//! Parses search engine profile responses (`"profile": true` searches) and derives
//! per-phase timing totals, a slow-shard ranking, the slowest components and drill-down
//! component trees with summarized breakdowns.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      analyze_profile()                        │
//! │                             │                                 │
//! │         ┌───────────────────┼────────────────────┐           │
//! │         ▼                   ▼                    ▼           │
//! │  ┌─────────────┐    ┌───────────────┐    ┌─────────────┐     │
//! │  │   Parser    │    │   Analyzer    │    │   Models    │     │
//! │  │  Composer   │ ─► │  Phases       │ ─► │  Document   │     │
//! │  │  Shard      │    │  ShardRanker  │    │  Analysis   │     │
//! │  │  TreeBuilder│    │  Components   │    │  Trees      │     │
//! │  │  Value      │    │  Breakdown    │    │             │     │
//! │  └─────────────┘    │  DrillDown    │    └─────────────┘     │
//! │                     └───────────────┘                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every step is a pure function over immutable input, so analyses can run concurrently
//! without any locking.
//!
//! # Usage
//!
//! ```ignore
//! use search_profiler::services::profile_analyzer::{AnalysisOptions, analyze_profile};
//!
//! let response_text = "..."; // Raw `_search?profile=true` response
//! let analysis = analyze_profile(response_text, &AnalysisOptions::default())?;
//!
//! println!("Overall: {} ns", analysis.phases.overall_total_nanos);
//! for shard in &analysis.shard_ranking.entries {
//!     println!("{}: {} ns", shard.label, shard.total_time_nanos);
//! }
//! ```

pub mod analyzer;
pub mod models;
pub mod parser;

#[cfg(test)]
mod tests;

pub use analyzer::{
    BreakdownOptions, BreakdownSummarizer, ComponentRanker, DrillDownBuilder, PhaseAggregator,
    ShardRanker,
};
pub use models::*;
pub use parser::{MAX_DEPTH_CEILING, ParseLimits, ProfileComposer, ProfileError, ProfileResult};

use serde::{Deserialize, Serialize};

/// Knobs for one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Number of slow shards to keep
    pub top_n: usize,
    /// Number of slowest root components to keep
    pub slowest_components: usize,
    /// Keep zero-valued operations in breakdown summaries
    pub include_zero_breakdown: bool,
    pub limits: ParseLimits,
    pub max_input_bytes: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            top_n: constants::DEFAULT_TOP_N,
            slowest_components: constants::DEFAULT_SLOWEST_COMPONENTS,
            include_zero_breakdown: true,
            limits: ParseLimits::default(),
            max_input_bytes: parser::composer::DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

impl AnalysisOptions {
    pub fn composer(&self) -> ProfileComposer {
        ProfileComposer::new()
            .with_limits(self.limits)
            .with_max_input_bytes(self.max_input_bytes)
    }

    fn breakdown_options(&self) -> BreakdownOptions {
        BreakdownOptions { include_zero: self.include_zero_breakdown }
    }
}

/// Parse raw profile response text and run the full analysis
///
/// This is the main entry point for profile analysis. It:
/// 1. Parses and validates the response into a `ProfileDocument`
/// 2. Aggregates per-phase totals
/// 3. Ranks shards by query + fetch time
/// 4. Lists the slowest root components
/// 5. Builds drill-down trees with exclusive times and breakdown summaries
pub fn analyze_profile(text: &str, options: &AnalysisOptions) -> ProfileResult<ProfileAnalysis> {
    let document = options.composer().parse(text)?;
    analyze_document(&document, options)
}

/// Run the analysis over an already parsed document
pub fn analyze_document(
    document: &ProfileDocument,
    options: &AnalysisOptions,
) -> ProfileResult<ProfileAnalysis> {
    let shard_ranking = ShardRanker::rank(document, options.top_n)?;
    let phases = PhaseAggregator::aggregate(document);
    let slowest_components = ComponentRanker::slowest(document, options.slowest_components);

    let drill_down = DrillDownBuilder::new(options.breakdown_options());
    let shards = document
        .shards
        .iter()
        .map(|shard| drill_down.shard_tree(shard))
        .collect();

    let summary = ProfileSummary {
        shard_count: document.shards.len(),
        search_count: document.search_count(),
        node_count: document.node_count(),
        max_depth: document.max_depth(),
        total_took_nanos: document.total_took_nanos,
        reported_phases: PhaseAggregator::reported_phases(document),
    };

    tracing::info!(
        "Analyzed profile: {} shards, {} searches, {} nodes, overall {} ns",
        summary.shard_count,
        summary.search_count,
        summary.node_count,
        phases.overall_total_nanos
    );

    Ok(ProfileAnalysis { summary, phases, shard_ranking, slowest_components, shards })
}

/// Summarize the breakdown of one node selected by `path`
pub fn summarize_node(
    document: &ProfileDocument,
    path: &NodePath,
    options: BreakdownOptions,
) -> ProfileResult<NodeBreakdown> {
    let node = document.node_at(path).ok_or_else(|| {
        ProfileError::InvalidArgument(format!("no component node at {}", path))
    })?;

    Ok(NodeBreakdown {
        path: path.to_string(),
        kind: node.kind,
        node_type: node.node_type.clone(),
        description: node.description.clone(),
        time_nanos: node.time_nanos,
        exclusive_time_nanos: node.exclusive_time_nanos(),
        entries: BreakdownSummarizer::summarize_with(node, options),
        counts: node.breakdown_counts.clone(),
    })
}
