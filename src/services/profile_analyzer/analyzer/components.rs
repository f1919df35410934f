//! Slowest component listing
//!
//! Flattens the root nodes of every shard into one list so the slowest query clauses,
//! collectors, aggregations and fetch steps can be compared across shards.

use crate::services::profile_analyzer::models::{ComponentTiming, ProfileDocument};

pub struct ComponentRanker;

impl ComponentRanker {
    /// Root components sorted by time descending (stable), truncated to `limit`
    pub fn slowest(doc: &ProfileDocument, limit: usize) -> Vec<ComponentTiming> {
        let mut components: Vec<ComponentTiming> = doc
            .shards
            .iter()
            .flat_map(|shard| {
                let label = shard.shard_id.label();
                shard.roots().map(move |(_, node)| ComponentTiming {
                    shard: label.clone(),
                    kind: node.kind,
                    name: node.node_type.clone(),
                    time_nanos: node.time_nanos,
                })
            })
            .collect();

        components.sort_by(|a, b| b.time_nanos.cmp(&a.time_nanos));
        components.truncate(limit);
        components
    }
}
