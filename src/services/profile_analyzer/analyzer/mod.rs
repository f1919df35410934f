//! Profile analyzer module
//!
//! Pure derivations over a parsed `ProfileDocument`: phase totals, shard ranking, slowest
//! components, breakdown summaries and drill-down trees.

pub mod breakdown;
pub mod components;
pub mod drill_down;
pub mod phase_aggregator;
pub mod shard_ranker;

pub use breakdown::{BreakdownOptions, BreakdownSummarizer};
pub use components::ComponentRanker;
pub use drill_down::DrillDownBuilder;
pub use phase_aggregator::PhaseAggregator;
pub use shard_ranker::ShardRanker;
