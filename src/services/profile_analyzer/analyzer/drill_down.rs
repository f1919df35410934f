//! Drill-down trees
//!
//! Mirrors each shard's component trees with derived per-node data (exclusive time and the
//! summarized breakdown) so a renderer can expand any node without recomputing anything.

use crate::services::profile_analyzer::analyzer::{BreakdownOptions, BreakdownSummarizer};
use crate::services::profile_analyzer::models::{
    ComponentNode, ComponentTreeNode, SearchTree, ShardProfile, ShardTree,
};

pub struct DrillDownBuilder {
    options: BreakdownOptions,
}

impl DrillDownBuilder {
    pub fn new(options: BreakdownOptions) -> Self {
        Self { options }
    }

    pub fn shard_tree(&self, shard: &ShardProfile) -> ShardTree {
        ShardTree {
            shard_id: shard.shard_id.raw.clone(),
            label: shard.shard_id.label(),
            total_time_nanos: shard.total_time_nanos(),
            searches: shard
                .searches
                .iter()
                .map(|search| SearchTree {
                    rewrite_time_nanos: search.rewrite_time_nanos,
                    query_phase_nanos: search.query_phase_nanos(),
                    query: self.nodes(&search.query_nodes),
                    collectors: self.nodes(&search.collector_nodes),
                })
                .collect(),
            aggregations: self.nodes(&shard.aggregations),
            fetch: shard.fetch.as_ref().map(|f| self.node(f)),
        }
    }

    fn nodes(&self, nodes: &[ComponentNode]) -> Vec<ComponentTreeNode> {
        nodes.iter().map(|n| self.node(n)).collect()
    }

    // Recursion depth is bounded by the parser's depth ceiling
    fn node(&self, node: &ComponentNode) -> ComponentTreeNode {
        ComponentTreeNode {
            kind: node.kind,
            node_type: node.node_type.clone(),
            description: node.description.clone(),
            time_nanos: node.time_nanos,
            exclusive_time_nanos: node.exclusive_time_nanos(),
            breakdown: BreakdownSummarizer::summarize_with(node, self.options),
            children: self.nodes(&node.children),
        }
    }
}
