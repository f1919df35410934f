//! Profile analysis data models
//!
//! These models represent the structured data extracted from search engine profile responses.
//! Everything here is built once by the parser and never mutated afterwards; derived views
//! (phase totals, rankings, drill-down trees) are produced by the analyzer as new values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Component Nodes
// ============================================================================

/// Which section of a shard profile a component node was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Query,
    Collector,
    Aggregation,
    Fetch,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Query => "query",
            NodeKind::Collector => "collector",
            NodeKind::Aggregation => "aggregation",
            NodeKind::Fetch => "fetch",
        }
    }

    /// Human readable label used in component listings
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Query => "Query",
            NodeKind::Collector => "Collector",
            NodeKind::Aggregation => "Aggregation",
            NodeKind::Fetch => "Fetch",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timed unit of work (query clause, collector, aggregation or fetch step)
///
/// `time_nanos` is copied verbatim from the profile. It is measured independently of the
/// children, so a parent may report less time than its children combined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentNode {
    pub kind: NodeKind,
    #[serde(rename = "type")]
    pub node_type: String,
    pub description: String,
    pub time_nanos: u64,
    /// Operation name -> nanoseconds
    #[serde(default)]
    pub breakdown: BTreeMap<String, u64>,
    /// Operation name -> invocation count (`*_count` keys of the raw breakdown)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub breakdown_counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub children: Vec<ComponentNode>,
}

impl ComponentNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Sum of the direct children's reported times
    pub fn children_time_nanos(&self) -> u64 {
        self.children
            .iter()
            .fold(0u64, |acc, child| acc.saturating_add(child.time_nanos))
    }

    /// Own time with direct children subtracted, clamped at zero
    pub fn exclusive_time_nanos(&self) -> u64 {
        self.time_nanos.saturating_sub(self.children_time_nanos())
    }

    /// Number of nodes in this subtree, including self
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Depth of this subtree; a leaf has depth 1
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((node, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            stack.extend(node.children.iter().map(|c| (c, depth + 1)));
        }
        max_depth
    }

    /// Follow a sequence of child indices starting at this node
    pub fn descendant(&self, child_path: &[usize]) -> Option<&ComponentNode> {
        child_path
            .iter()
            .try_fold(self, |node, &idx| node.children.get(idx))
    }
}

/// Exclusive time of a node: its reported time minus its direct children's, never negative
pub fn exclusive_time_nanos(node: &ComponentNode) -> u64 {
    node.exclusive_time_nanos()
}

// ============================================================================
// Shard / Search Structure
// ============================================================================

/// One query execution against a shard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SearchPhaseProfile {
    pub query_nodes: Vec<ComponentNode>,
    pub collector_nodes: Vec<ComponentNode>,
    pub rewrite_time_nanos: u64,
}

impl SearchPhaseProfile {
    /// Rewrite time plus every query and collector root
    pub fn query_phase_nanos(&self) -> u64 {
        self.query_nodes
            .iter()
            .chain(self.collector_nodes.iter())
            .fold(self.rewrite_time_nanos, |acc, node| acc.saturating_add(node.time_nanos))
    }

    pub fn node_count(&self) -> usize {
        self.query_nodes
            .iter()
            .chain(self.collector_nodes.iter())
            .map(ComponentNode::node_count)
            .sum()
    }
}

/// Shard identifier as reported by the cluster
///
/// Shard ids usually follow `[node][index][shard]`; when they do, the parts are split out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardId {
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_number: Option<u32>,
}

impl ShardId {
    pub fn parse(raw: &str) -> Self {
        let parts: Vec<&str> = raw
            .split('[')
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.strip_suffix(']'))
            .collect();

        if parts.len() == 3 && raw.starts_with('[') && raw.ends_with(']') {
            Self {
                raw: raw.to_string(),
                node_id: Some(parts[0].to_string()),
                index: Some(parts[1].to_string()),
                shard_number: parts[2].parse().ok(),
            }
        } else {
            Self { raw: raw.to_string(), node_id: None, index: None, shard_number: None }
        }
    }

    pub fn index_name(&self) -> &str {
        self.index.as_deref().unwrap_or("unknown")
    }

    /// Short display label, e.g. `products[3]`
    pub fn label(&self) -> String {
        match self.shard_number {
            Some(n) => format!("{}[{}]", self.index_name(), n),
            None => format!("{}[{}]", self.index_name(), self.raw),
        }
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One shard's profiling data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardProfile {
    pub shard_id: ShardId,
    pub searches: Vec<SearchPhaseProfile>,
    #[serde(default)]
    pub aggregations: Vec<ComponentNode>,
    #[serde(default)]
    pub fetch: Option<ComponentNode>,
}

impl ShardProfile {
    pub fn query_phase_nanos(&self) -> u64 {
        self.searches
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.query_phase_nanos()))
    }

    pub fn fetch_phase_nanos(&self) -> u64 {
        self.fetch.as_ref().map(|f| f.time_nanos).unwrap_or(0)
    }

    pub fn aggregations_phase_nanos(&self) -> u64 {
        self.aggregations
            .iter()
            .fold(0u64, |acc, a| acc.saturating_add(a.time_nanos))
    }

    /// Time of every root node contained in the shard (all three phases)
    pub fn total_time_nanos(&self) -> u64 {
        self.query_phase_nanos()
            .saturating_add(self.fetch_phase_nanos())
            .saturating_add(self.aggregations_phase_nanos())
    }

    /// Root nodes of every section in document order, tagged with their search index
    pub fn roots(&self) -> impl Iterator<Item = (Option<usize>, &ComponentNode)> {
        let searches = self.searches.iter().enumerate().flat_map(|(i, s)| {
            s.query_nodes
                .iter()
                .chain(s.collector_nodes.iter())
                .map(move |n| (Some(i), n))
        });
        searches
            .chain(self.aggregations.iter().map(|n| (None, n)))
            .chain(self.fetch.iter().map(|n| (None, n)))
    }

    pub fn node_count(&self) -> usize {
        self.roots().map(|(_, n)| n.node_count()).sum()
    }
}

// ============================================================================
// Document
// ============================================================================

/// Top-level parsed profile response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDocument {
    pub shards: Vec<ShardProfile>,
    /// Overall `took` of the response envelope, converted to nanoseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_took_nanos: Option<u64>,
    /// Cluster reported per-phase timings (`phase_took`, milliseconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_took_ms: Option<BTreeMap<String, u64>>,
}

impl ProfileDocument {
    pub fn search_count(&self) -> usize {
        self.shards.iter().map(|s| s.searches.len()).sum()
    }

    pub fn node_count(&self) -> usize {
        self.shards.iter().map(ShardProfile::node_count).sum()
    }

    pub fn max_depth(&self) -> usize {
        self.shards
            .iter()
            .flat_map(|s| s.roots())
            .map(|(_, n)| n.depth())
            .max()
            .unwrap_or(0)
    }

    /// Resolve a node address to the node it points at
    pub fn node_at(&self, path: &NodePath) -> Option<&ComponentNode> {
        let shard = self.shards.get(path.shard)?;
        let root = match path.section {
            NodeKind::Query => shard.searches.get(path.search)?.query_nodes.get(path.root)?,
            NodeKind::Collector => {
                shard.searches.get(path.search)?.collector_nodes.get(path.root)?
            },
            NodeKind::Aggregation => shard.aggregations.get(path.root)?,
            NodeKind::Fetch => shard.fetch.as_ref().filter(|_| path.root == 0)?,
        };
        root.descendant(&path.children)
    }
}

/// Address of a single component node inside a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePath {
    pub shard: usize,
    pub section: NodeKind,
    /// Search index, only meaningful for query and collector nodes
    #[serde(default)]
    pub search: usize,
    /// Root index within the section
    #[serde(default)]
    pub root: usize,
    /// Child indices from the root downwards
    #[serde(default)]
    pub children: Vec<usize>,
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shards[{}]", self.shard)?;
        match self.section {
            NodeKind::Query => write!(f, ".searches[{}].query[{}]", self.search, self.root)?,
            NodeKind::Collector => {
                write!(f, ".searches[{}].collector[{}]", self.search, self.root)?
            },
            NodeKind::Aggregation => write!(f, ".aggregations[{}]", self.root)?,
            NodeKind::Fetch => write!(f, ".fetch")?,
        }
        for idx in &self.children {
            write!(f, ".children[{}]", idx)?;
        }
        Ok(())
    }
}

// ============================================================================
// Analysis Results
// ============================================================================

/// Aggregate nanoseconds per phase across all shards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PhaseTotals {
    pub query_nanos: u64,
    pub fetch_nanos: u64,
    pub aggregations_nanos: u64,
}

impl PhaseTotals {
    pub fn get(&self, phase: &str) -> Option<u64> {
        match phase {
            constants::phases::QUERY => Some(self.query_nanos),
            constants::phases::FETCH => Some(self.fetch_nanos),
            constants::phases::AGGREGATIONS => Some(self.aggregations_nanos),
            _ => None,
        }
    }

    /// (phase name, nanos) in fixed display order
    pub fn entries(&self) -> [(&'static str, u64); 3] {
        [
            (constants::phases::QUERY, self.query_nanos),
            (constants::phases::FETCH, self.fetch_nanos),
            (constants::phases::AGGREGATIONS, self.aggregations_nanos),
        ]
    }
}

/// Phase totals plus the overall query + fetch time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PhaseSummary {
    pub totals: PhaseTotals,
    pub overall_total_nanos: u64,
}

/// A shard's position in the slow-shard ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedShard {
    pub shard_id: String,
    pub label: String,
    /// Index of the shard in the input document
    pub position: usize,
    /// Query phase + fetch phase nanoseconds
    pub total_time_nanos: u64,
}

/// Shards ordered by total time, slowest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ShardRanking {
    pub entries: Vec<RankedShard>,
}

impl ShardRanking {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn shard_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.shard_id.as_str()).collect()
    }
}

/// One summarized breakdown operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub operation: String,
    pub nanos: u64,
}

/// Breakdown of a single node selected by `NodePath`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeBreakdown {
    pub path: String,
    pub kind: NodeKind,
    #[serde(rename = "type")]
    pub node_type: String,
    pub description: String,
    pub time_nanos: u64,
    pub exclusive_time_nanos: u64,
    pub entries: Vec<BreakdownEntry>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub counts: BTreeMap<String, u64>,
}

/// A root component flattened out of its shard for the "slowest components" listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentTiming {
    pub shard: String,
    pub kind: NodeKind,
    pub name: String,
    pub time_nanos: u64,
}

/// Drill-down view of a component node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentTreeNode {
    pub kind: NodeKind,
    #[serde(rename = "type")]
    pub node_type: String,
    pub description: String,
    pub time_nanos: u64,
    pub exclusive_time_nanos: u64,
    pub breakdown: Vec<BreakdownEntry>,
    pub children: Vec<ComponentTreeNode>,
}

/// Drill-down view of one search on a shard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTree {
    pub rewrite_time_nanos: u64,
    pub query_phase_nanos: u64,
    pub query: Vec<ComponentTreeNode>,
    pub collectors: Vec<ComponentTreeNode>,
}

/// Drill-down view of a shard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardTree {
    pub shard_id: String,
    pub label: String,
    pub total_time_nanos: u64,
    pub searches: Vec<SearchTree>,
    pub aggregations: Vec<ComponentTreeNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch: Option<ComponentTreeNode>,
}

/// A phase timing reported by the cluster itself (`phase_took`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedPhase {
    pub phase: String,
    pub took_ms: u64,
}

/// Document level statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProfileSummary {
    pub shard_count: usize,
    pub search_count: usize,
    pub node_count: usize,
    pub max_depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_took_nanos: Option<u64>,
    /// Empty when the response carried no `phase_took`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reported_phases: Vec<ReportedPhase>,
}

/// Complete analysis of one profile response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileAnalysis {
    pub summary: ProfileSummary,
    pub phases: PhaseSummary,
    pub shard_ranking: ShardRanking,
    pub slowest_components: Vec<ComponentTiming>,
    pub shards: Vec<ShardTree>,
}

// ============================================================================
// Constants
// ============================================================================

pub mod constants {
    /// Phase names used for aggregate totals
    pub mod phases {
        pub const QUERY: &str = "query";
        pub const FETCH: &str = "fetch";
        pub const AGGREGATIONS: &str = "aggregations";

        /// Phases reported by the cluster in `phase_took`, in display order
        pub const REPORTED: [&str; 6] =
            ["dfs_pre_query", "query", "fetch", "dfs_query", "expand", "can_match"];
    }

    /// Suffix of raw breakdown keys that hold invocation counts instead of nanoseconds
    pub const BREAKDOWN_COUNT_SUFFIX: &str = "_count";

    pub const DEFAULT_TOP_N: usize = 10;
    pub const DEFAULT_SLOWEST_COMPONENTS: usize = 10;

    pub const NANOS_PER_MILLI: u64 = 1_000_000;
}
