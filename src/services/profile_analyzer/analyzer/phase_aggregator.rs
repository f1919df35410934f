//! Phase aggregation
//!
//! Sums root node times per phase across every shard and search. All arithmetic stays in
//! integer nanoseconds; conversion for display belongs to the caller.

use crate::services::profile_analyzer::models::{
    PhaseSummary, PhaseTotals, ProfileDocument, ReportedPhase, ShardProfile, constants,
};

/// Aggregator for per-phase timing totals
pub struct PhaseAggregator;

impl PhaseAggregator {
    /// Totals for the whole document plus the overall query + fetch time
    pub fn aggregate(doc: &ProfileDocument) -> PhaseSummary {
        let totals = doc
            .shards
            .iter()
            .map(Self::shard_totals)
            .fold(PhaseTotals::default(), |acc, shard| PhaseTotals {
                query_nanos: acc.query_nanos.saturating_add(shard.query_nanos),
                fetch_nanos: acc.fetch_nanos.saturating_add(shard.fetch_nanos),
                aggregations_nanos: acc.aggregations_nanos.saturating_add(shard.aggregations_nanos),
            });

        PhaseSummary { totals, overall_total_nanos: Self::overall_nanos(&totals) }
    }

    /// Totals scoped to a single shard
    pub fn shard_totals(shard: &ShardProfile) -> PhaseTotals {
        PhaseTotals {
            query_nanos: shard.query_phase_nanos(),
            fetch_nanos: shard.fetch_phase_nanos(),
            aggregations_nanos: shard.aggregations_phase_nanos(),
        }
    }

    /// Query + fetch; aggregations are reported separately because the cluster does not
    /// always fold them into `took`
    pub fn overall_nanos(totals: &PhaseTotals) -> u64 {
        totals.query_nanos.saturating_add(totals.fetch_nanos)
    }

    /// Cluster reported `phase_took` values for the standard phases, 0 when absent
    pub fn reported_phases(doc: &ProfileDocument) -> Vec<ReportedPhase> {
        let Some(phase_took) = &doc.phase_took_ms else {
            return Vec::new();
        };

        constants::phases::REPORTED
            .iter()
            .map(|phase| ReportedPhase {
                phase: phase.to_string(),
                took_ms: phase_took.get(*phase).copied().unwrap_or(0),
            })
            .collect()
    }
}
