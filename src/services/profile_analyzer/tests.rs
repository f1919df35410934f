//! End-to-end tests for the profile analyzer
//!
//! Fixtures live in tests/fixtures/profiles/ and are real-shaped `_search?profile=true`
//! responses.

#[cfg(test)]
mod profile_tests {
    use crate::services::profile_analyzer::models::*;
    use crate::services::profile_analyzer::{
        AnalysisOptions, BreakdownOptions, BreakdownSummarizer, ParseLimits, PhaseAggregator,
        ProfileComposer, ProfileError, ShardRanker, analyze_document, analyze_profile,
        summarize_node,
    };
    use std::fs;
    use std::path::PathBuf;

    /// Get the path to test fixtures
    fn get_fixture_path(filename: &str) -> PathBuf {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("tests/fixtures/profiles");
        path.push(filename);
        path
    }

    /// Load a profile fixture file
    fn load_profile(filename: &str) -> String {
        let path = get_fixture_path(filename);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", path.display(), e))
    }

    fn parse_fixture(filename: &str) -> ProfileDocument {
        ProfileComposer::new()
            .parse(&load_profile(filename))
            .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", filename, e))
    }

    fn leaf(time_nanos: u64) -> ComponentNode {
        ComponentNode {
            kind: NodeKind::Query,
            node_type: "TermQuery".to_string(),
            description: String::new(),
            time_nanos,
            breakdown: Default::default(),
            breakdown_counts: Default::default(),
            children: vec![],
        }
    }

    mod parser_tests {
        use super::*;

        #[test]
        fn test_parse_single_shard() {
            let doc = parse_fixture("single_shard.json");

            assert_eq!(doc.shards.len(), 1);
            let shard = &doc.shards[0];
            assert_eq!(shard.shard_id.node_id.as_deref(), Some("q2v9bY5oQ3GEXr9yB6YdUA"));
            assert_eq!(shard.shard_id.index.as_deref(), Some("products"));
            assert_eq!(shard.shard_id.shard_number, Some(0));
            assert_eq!(shard.searches[0].query_nodes[0].node_type, "MatchAllDocsQuery");
            assert_eq!(shard.searches[0].rewrite_time_nanos, 50_000);
            assert!(shard.fetch.is_none());
            assert_eq!(doc.total_took_nanos, Some(1_000_000));
        }

        #[test]
        fn test_breakdown_counts_are_separated() {
            let doc = parse_fixture("single_shard.json");
            let node = &doc.shards[0].searches[0].query_nodes[0];

            assert!(node.breakdown.keys().all(|k| !k.ends_with("_count")));
            assert_eq!(node.breakdown_counts.get("build_scorer_count"), Some(&2));
            assert_eq!(node.breakdown_counts.get("next_doc_count"), Some(&20));
            assert_eq!(node.breakdown.len(), 9);
        }

        #[test]
        fn test_parse_multi_shard_structure() {
            let doc = parse_fixture("multi_shard.json");

            assert_eq!(doc.shards.len(), 3);
            assert_eq!(doc.search_count(), 2);
            assert_eq!(doc.node_count(), 14);
            assert_eq!(doc.max_depth(), 2);

            let multi = &doc.shards[0].searches[0].collector_nodes[0];
            assert_eq!(multi.node_type, "MultiCollector");
            assert_eq!(multi.description, "search_multi");
            assert_eq!(multi.children[1].description, "aggregation");

            let fetch = doc.shards[0].fetch.as_ref().unwrap();
            assert_eq!(fetch.kind, NodeKind::Fetch);
            assert_eq!(fetch.children[0].node_type, "FetchSourcePhase");
        }

        #[test]
        fn test_parse_pasted_console_output() {
            let doc = parse_fixture("pasted_console.txt");
            let query = &doc.shards[0].searches[0].query_nodes[0];
            assert_eq!(query.description, "message:\"connection reset\" +level:ERROR");
        }

        #[test]
        fn test_parsing_is_deterministic() {
            let text = load_profile("multi_shard.json");
            let composer = ProfileComposer::new();
            let first = composer.parse(&text).unwrap();
            let second = composer.parse(&text).unwrap();
            assert_eq!(first, second);
            assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&second).unwrap()
            );
        }

        #[test]
        fn test_missing_shards_reports_path() {
            let err = ProfileComposer::new().parse(r#"{"profile": {}}"#).unwrap_err();
            assert!(matches!(err, ProfileError::Schema { .. }));
            assert_eq!(err.path(), Some("profile.shards"));
        }

        #[test]
        fn test_bad_time_reports_full_path() {
            let text = r#"{"profile": {"shards": [
                {"id": "a", "searches": []},
                {"id": "b", "searches": []},
                {"id": "c", "searches": [{"query": [{"type": "TermQuery", "time_in_nanos": "12"}]}]}
            ]}}"#;
            let err = ProfileComposer::new().parse(text).unwrap_err();
            assert_eq!(err.path(), Some("shards[2].searches[0].query[0].time_in_nanos"));
        }

        #[test]
        fn test_depth_limit_applies_to_document() {
            let limits = ParseLimits { max_depth: 1, max_nodes: 1000 };
            let err = ProfileComposer::new()
                .with_limits(limits)
                .parse(&load_profile("multi_shard.json"))
                .unwrap_err();
            assert!(matches!(err, ProfileError::ResourceLimitExceeded { limit: "depth", .. }));
        }

        #[test]
        fn test_node_limit_applies_to_document() {
            let limits = ParseLimits { max_depth: 64, max_nodes: 13 };
            let err = ProfileComposer::new()
                .with_limits(limits)
                .parse(&load_profile("multi_shard.json"))
                .unwrap_err();
            assert_eq!(
                err,
                ProfileError::ResourceLimitExceeded { limit: "nodes", actual: 14, max: 13 }
            );
        }
    }

    mod phase_tests {
        use super::*;

        #[test]
        fn test_single_shard_phase_totals() {
            let doc = parse_fixture("single_shard.json");
            let summary = PhaseAggregator::aggregate(&doc);

            assert_eq!(summary.totals.query_nanos, 1_050_000);
            assert_eq!(summary.totals.fetch_nanos, 0);
            assert_eq!(summary.overall_total_nanos, 1_050_000);
        }

        #[test]
        fn test_multi_shard_phase_totals() {
            let doc = parse_fixture("multi_shard.json");
            let summary = PhaseAggregator::aggregate(&doc);

            assert_eq!(summary.totals.query_nanos, 11_840_000);
            assert_eq!(summary.totals.fetch_nanos, 600_000);
            assert_eq!(summary.totals.aggregations_nanos, 3_600_000);
            assert_eq!(summary.overall_total_nanos, 12_440_000);
        }

        /// Query and fetch time folded straight from the root nodes, by node kind
        fn timed_phases_from_roots(doc: &ProfileDocument) -> (u64, u64) {
            doc.shards.iter().fold((0, 0), |(query, fetch), shard| {
                let rewrite: u64 = shard.searches.iter().map(|s| s.rewrite_time_nanos).sum();
                shard.roots().fold((query + rewrite, fetch), |(query, fetch), (_, node)| {
                    match node.kind {
                        NodeKind::Query | NodeKind::Collector => (query + node.time_nanos, fetch),
                        NodeKind::Fetch => (query, fetch + node.time_nanos),
                        NodeKind::Aggregation => (query, fetch),
                    }
                })
            })
        }

        #[test]
        fn test_overall_matches_root_node_times() {
            let expected = [
                ("single_shard.json", 1_050_000, 0, 1_050_000),
                ("multi_shard.json", 11_840_000, 600_000, 12_440_000),
                ("pasted_console.txt", 333_000, 0, 333_000),
            ];

            for (fixture, query, fetch, overall) in expected {
                let doc = parse_fixture(fixture);
                assert_eq!(timed_phases_from_roots(&doc), (query, fetch), "{}", fixture);

                let summary = PhaseAggregator::aggregate(&doc);
                assert_eq!(summary.totals.query_nanos, query, "{}", fixture);
                assert_eq!(summary.totals.fetch_nanos, fetch, "{}", fixture);
                assert_eq!(summary.overall_total_nanos, overall, "{}", fixture);
            }
        }
    }

    mod ranking_tests {
        use super::*;

        #[test]
        fn test_multi_shard_ranking() {
            let doc = parse_fixture("multi_shard.json");
            let ranking = ShardRanker::rank(&doc, 10).unwrap();

            assert_eq!(ranking.len(), 3);
            assert_eq!(ranking.entries[0].position, 0);
            assert_eq!(ranking.entries[0].total_time_nanos, 6_221_000);
            assert_eq!(ranking.entries[1].position, 1);
            assert_eq!(ranking.entries[1].total_time_nanos, 6_219_000);
            assert_eq!(ranking.entries[2].total_time_nanos, 0);
            assert_eq!(ranking.entries[0].label, "opensearch_dashboards_sample_data_ecommerce[0]");
        }

        #[test]
        fn test_rank_zero_is_invalid_argument() {
            let doc = parse_fixture("single_shard.json");
            assert!(matches!(ShardRanker::rank(&doc, 0), Err(ProfileError::InvalidArgument(_))));
        }

        #[test]
        fn test_rerank_of_fixture_is_stable() {
            let doc = parse_fixture("multi_shard.json");
            let ranked = ShardRanker::rank(&doc, 2).unwrap();
            assert_eq!(ShardRanker::rerank(&ranked, 2).unwrap(), ranked);
        }
    }

    mod tree_tests {
        use super::*;

        #[test]
        fn test_exclusive_time_clamped_to_zero() {
            let mut node = leaf(100);
            node.children = vec![leaf(60), leaf(70)];
            assert_eq!(exclusive_time_nanos(&node), 0);
        }

        #[test]
        fn test_exclusive_time_subtracts_direct_children_only() {
            let mut child = leaf(40);
            child.children = vec![leaf(35)];
            let mut node = leaf(100);
            node.children = vec![child, leaf(10)];
            assert_eq!(node.exclusive_time_nanos(), 50);
            assert_eq!(node.children[0].exclusive_time_nanos(), 5);
        }

        #[test]
        fn test_exclusive_time_never_negative_for_fixtures() {
            for fixture in ["single_shard.json", "multi_shard.json"] {
                let doc = parse_fixture(fixture);
                for shard in &doc.shards {
                    for (_, root) in shard.roots() {
                        let mut stack = vec![root];
                        while let Some(node) = stack.pop() {
                            assert!(node.exclusive_time_nanos() <= node.time_nanos);
                            stack.extend(node.children.iter());
                        }
                    }
                }
            }
        }

        #[test]
        fn test_parent_time_is_not_rederived() {
            let doc = parse_fixture("multi_shard.json");
            let root = &doc.shards[1].searches[0].query_nodes[0];
            assert_eq!(root.time_nanos, 5_100_000);
            assert_eq!(root.children_time_nanos(), 5_500_000);
            assert_eq!(root.exclusive_time_nanos(), 0);
        }

        #[test]
        fn test_node_lookup_by_path() {
            let doc = parse_fixture("multi_shard.json");
            let path = NodePath {
                shard: 0,
                section: NodeKind::Collector,
                search: 0,
                root: 0,
                children: vec![1],
            };
            let node = doc.node_at(&path).unwrap();
            assert!(node.node_type.starts_with("BucketCollectorWrapper"));
            assert_eq!(path.to_string(), "shards[0].searches[0].collector[0].children[1]");

            let fetch = NodePath {
                shard: 0,
                section: NodeKind::Fetch,
                search: 0,
                root: 0,
                children: vec![],
            };
            assert_eq!(doc.node_at(&fetch).unwrap().time_nanos, 600_000);

            let missing = NodePath { shard: 2, ..fetch };
            assert!(doc.node_at(&missing).is_none());
        }
    }

    mod breakdown_tests {
        use super::*;

        #[test]
        fn test_single_shard_breakdown_order() {
            let doc = parse_fixture("single_shard.json");
            let node = &doc.shards[0].searches[0].query_nodes[0];
            let ops: Vec<String> = BreakdownSummarizer::summarize(node)
                .into_iter()
                .map(|e| e.operation)
                .collect();

            assert_eq!(
                ops,
                vec![
                    "build_scorer",
                    "next_doc",
                    "create_weight",
                    "advance",
                    "compute_max_score",
                    "match",
                    "score",
                    "set_min_competitive_score",
                    "shallow_advance",
                ]
            );
        }

        #[test]
        fn test_summarize_selected_node() {
            let doc = parse_fixture("multi_shard.json");
            let path = NodePath {
                shard: 0,
                section: NodeKind::Query,
                search: 0,
                root: 0,
                children: vec![],
            };
            let summary =
                summarize_node(&doc, &path, BreakdownOptions { include_zero: false }).unwrap();

            assert_eq!(summary.node_type, "BooleanQuery");
            assert_eq!(summary.exclusive_time_nanos, 500_000);
            let ops: Vec<&str> = summary.entries.iter().map(|e| e.operation.as_str()).collect();
            assert_eq!(ops, vec!["next_doc", "build_scorer", "score", "advance", "create_weight"]);
            assert_eq!(summary.counts.get("score_count"), Some(&790));
        }

        #[test]
        fn test_summarize_unknown_path() {
            let doc = parse_fixture("single_shard.json");
            let path = NodePath {
                shard: 0,
                section: NodeKind::Aggregation,
                search: 0,
                root: 3,
                children: vec![],
            };
            let err = summarize_node(&doc, &path, BreakdownOptions::default()).unwrap_err();
            assert!(matches!(err, ProfileError::InvalidArgument(_)));
        }
    }

    mod analysis_tests {
        use super::*;

        #[test]
        fn test_analyze_multi_shard() {
            let analysis =
                analyze_profile(&load_profile("multi_shard.json"), &AnalysisOptions::default())
                    .unwrap();

            assert_eq!(analysis.summary.shard_count, 3);
            assert_eq!(analysis.summary.total_took_nanos, Some(18_000_000));
            assert_eq!(analysis.summary.reported_phases.len(), 6);
            assert_eq!(analysis.summary.reported_phases[1].took_ms, 14);
            assert_eq!(analysis.phases.overall_total_nanos, 12_440_000);
            assert_eq!(analysis.shard_ranking.len(), 3);

            let names: Vec<(NodeKind, u64)> = analysis
                .slowest_components
                .iter()
                .map(|c| (c.kind, c.time_nanos))
                .collect();
            assert_eq!(
                names,
                vec![
                    (NodeKind::Query, 5_100_000),
                    (NodeKind::Query, 3_200_000),
                    (NodeKind::Collector, 2_400_000),
                    (NodeKind::Aggregation, 2_100_000),
                    (NodeKind::Aggregation, 1_500_000),
                    (NodeKind::Collector, 1_100_000),
                    (NodeKind::Fetch, 600_000),
                ]
            );

            let shard0 = &analysis.shards[0];
            assert_eq!(shard0.searches[0].collectors[0].exclusive_time_nanos, 200_000);
            assert_eq!(shard0.fetch.as_ref().unwrap().exclusive_time_nanos, 480_000);
            assert_eq!(shard0.total_time_nanos, 5_621_000 + 600_000 + 1_500_000);
        }

        #[test]
        fn test_analyze_respects_options() {
            let options = AnalysisOptions {
                top_n: 1,
                slowest_components: 2,
                include_zero_breakdown: false,
                ..AnalysisOptions::default()
            };
            let analysis = analyze_profile(&load_profile("single_shard.json"), &options).unwrap();

            assert_eq!(analysis.shard_ranking.len(), 1);
            assert_eq!(analysis.slowest_components.len(), 1);
            assert_eq!(analysis.shards[0].searches[0].query[0].breakdown.len(), 3);
            assert!(analysis.summary.reported_phases.is_empty());
        }

        #[test]
        fn test_analyze_rejects_zero_top_n() {
            let doc = parse_fixture("single_shard.json");
            let options = AnalysisOptions { top_n: 0, ..AnalysisOptions::default() };
            assert!(matches!(
                analyze_document(&doc, &options),
                Err(ProfileError::InvalidArgument(_))
            ));
        }

        #[test]
        fn test_analysis_serializes_with_renderer_field_names() {
            let analysis =
                analyze_profile(&load_profile("single_shard.json"), &AnalysisOptions::default())
                    .unwrap();
            let value = serde_json::to_value(&analysis).unwrap();

            assert_eq!(value["phases"]["totals"]["query_nanos"], 1_050_000);
            assert_eq!(value["shards"][0]["searches"][0]["query"][0]["type"], "MatchAllDocsQuery");
            assert_eq!(value["slowest_components"][0]["kind"], "query");
        }
    }
}
