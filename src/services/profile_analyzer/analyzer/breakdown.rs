//! Breakdown summarizer
//!
//! Turns a node's low-level operation timings (build_scorer, next_doc, score, advance, ...)
//! into a deterministic, sorted list.

use crate::services::profile_analyzer::models::{BreakdownEntry, ComponentNode};

/// Options for breakdown summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakdownOptions {
    /// Keep operations that recorded zero nanoseconds
    pub include_zero: bool,
}

impl Default for BreakdownOptions {
    fn default() -> Self {
        Self { include_zero: true }
    }
}

/// Summarizer for per-node breakdown maps
pub struct BreakdownSummarizer;

impl BreakdownSummarizer {
    /// Operations sorted by nanos descending, ties by operation name ascending
    pub fn summarize(node: &ComponentNode) -> Vec<BreakdownEntry> {
        Self::summarize_with(node, BreakdownOptions::default())
    }

    pub fn summarize_with(node: &ComponentNode, options: BreakdownOptions) -> Vec<BreakdownEntry> {
        let mut entries: Vec<BreakdownEntry> = node
            .breakdown
            .iter()
            .filter(|(_, nanos)| options.include_zero || **nanos > 0)
            .map(|(op, nanos)| BreakdownEntry { operation: op.clone(), nanos: *nanos })
            .collect();

        entries.sort_by(|a, b| b.nanos.cmp(&a.nanos).then_with(|| a.operation.cmp(&b.operation)));
        entries
    }

    /// Sum of all breakdown timings of a node
    pub fn total_nanos(node: &ComponentNode) -> u64 {
        node.breakdown
            .values()
            .fold(0u64, |acc, nanos| acc.saturating_add(*nanos))
    }
}
