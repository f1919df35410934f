//! Slow shard ranking

use crate::services::profile_analyzer::analyzer::PhaseAggregator;
use crate::services::profile_analyzer::models::{ProfileDocument, RankedShard, ShardRanking};
use crate::services::profile_analyzer::parser::error::{ProfileError, ProfileResult};

/// Ranks shards by query + fetch time, slowest first
pub struct ShardRanker;

impl ShardRanker {
    /// Rank every shard and keep the `top_n` slowest
    ///
    /// Ties keep input order. `top_n` larger than the shard count returns all shards.
    pub fn rank(doc: &ProfileDocument, top_n: usize) -> ProfileResult<ShardRanking> {
        let entries = doc
            .shards
            .iter()
            .enumerate()
            .map(|(position, shard)| RankedShard {
                shard_id: shard.shard_id.raw.clone(),
                label: shard.shard_id.label(),
                position,
                total_time_nanos: PhaseAggregator::overall_nanos(&PhaseAggregator::shard_totals(
                    shard,
                )),
            })
            .collect();

        Self::rank_entries(entries, top_n)
    }

    /// Re-rank an existing ranking; ranking an already ranked sequence is a no-op
    pub fn rerank(ranking: &ShardRanking, top_n: usize) -> ProfileResult<ShardRanking> {
        Self::rank_entries(ranking.entries.clone(), top_n)
    }

    /// Validate a caller supplied (possibly signed) `top_n`
    pub fn validate_top_n(top_n: i64) -> ProfileResult<usize> {
        if top_n <= 0 {
            return Err(ProfileError::InvalidArgument(format!(
                "top_n must be positive, got {}",
                top_n
            )));
        }
        usize::try_from(top_n)
            .map_err(|_| ProfileError::InvalidArgument(format!("top_n {} is too large", top_n)))
    }

    fn rank_entries(mut entries: Vec<RankedShard>, top_n: usize) -> ProfileResult<ShardRanking> {
        if top_n == 0 {
            return Err(ProfileError::InvalidArgument("top_n must be positive, got 0".to_string()));
        }

        // sort_by is stable, so equal totals stay in their current order
        entries.sort_by(|a, b| b.total_time_nanos.cmp(&a.total_time_nanos));
        entries.truncate(top_n);

        Ok(ShardRanking { entries })
    }
}
