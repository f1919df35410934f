//! Shard parser
//!
//! Reads one entry of `profile.shards`: its identifier, searches, aggregations and fetch.

use crate::services::profile_analyzer::models::{NodeKind, SearchPhaseProfile, ShardId, ShardProfile};
use crate::services::profile_analyzer::parser::core::{TreeBuilder, ValueParser};
use crate::services::profile_analyzer::parser::error::{ProfileError, ProfileResult};
use serde_json::{Map, Value};

/// Identifier keys accepted for a shard, in lookup order
const SHARD_ID_KEYS: [&str; 2] = ["id", "shard_id"];

/// Parser for shard entries
pub struct ShardParser;

impl ShardParser {
    /// Parse the shard at `path` (e.g. `shards[2]`)
    pub fn parse(
        raw: &Value,
        path: &str,
        builder: &mut TreeBuilder,
    ) -> ProfileResult<ShardProfile> {
        let obj = ValueParser::as_object(raw, path)?;

        let shard_id = Self::parse_shard_id(obj, path)?;

        let searches_path = ValueParser::field_path(path, "searches");
        let searches = ValueParser::required_array(obj, "searches", path)?
            .iter()
            .enumerate()
            .map(|(idx, search)| {
                Self::parse_search(search, &ValueParser::index_path(&searches_path, idx), builder)
            })
            .collect::<ProfileResult<Vec<_>>>()?;

        let aggregations = builder.build_all(
            ValueParser::optional_array(obj, "aggregations", path)?,
            NodeKind::Aggregation,
            &ValueParser::field_path(path, "aggregations"),
        )?;

        let fetch = match obj.get("fetch") {
            None | Some(Value::Null) => None,
            Some(raw_fetch) => Some(builder.build(
                raw_fetch,
                NodeKind::Fetch,
                &ValueParser::field_path(path, "fetch"),
            )?),
        };

        Ok(ShardProfile { shard_id, searches, aggregations, fetch })
    }

    fn parse_shard_id(obj: &Map<String, Value>, path: &str) -> ProfileResult<ShardId> {
        for key in SHARD_ID_KEYS {
            if let Some(id) = ValueParser::optional_string(obj, key, path)? {
                return Ok(ShardId::parse(&id));
            }
        }
        Err(ProfileError::schema(
            ValueParser::field_path(path, "id"),
            "missing shard identifier",
        ))
    }

    fn parse_search(
        raw: &Value,
        path: &str,
        builder: &mut TreeBuilder,
    ) -> ProfileResult<SearchPhaseProfile> {
        let obj = ValueParser::as_object(raw, path)?;

        let query_nodes = builder.build_all(
            ValueParser::optional_array(obj, "query", path)?,
            NodeKind::Query,
            &ValueParser::field_path(path, "query"),
        )?;
        let rewrite_time_nanos = ValueParser::optional_u64(obj, "rewrite_time", path)?.unwrap_or(0);
        let collector_nodes = builder.build_all(
            ValueParser::optional_array(obj, "collector", path)?,
            NodeKind::Collector,
            &ValueParser::field_path(path, "collector"),
        )?;

        Ok(SearchPhaseProfile { query_nodes, collector_nodes, rewrite_time_nanos })
    }
}
