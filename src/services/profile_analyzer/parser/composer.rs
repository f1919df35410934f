//! Profile composer - main entry point for profile parsing
//!
//! Validates the response envelope and orchestrates the shard and tree parsers to produce a
//! complete `ProfileDocument`. Parsing is all-or-nothing: the first invalid field aborts the
//! whole document.

use crate::services::profile_analyzer::models::{ProfileDocument, constants};
use crate::services::profile_analyzer::parser::core::{
    ParseLimits, ShardParser, TreeBuilder, ValueParser,
};
use crate::services::profile_analyzer::parser::error::{ProfileError, ProfileResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Path reported for errors in the raw text itself
const INPUT_PATH: &str = "<input>";
/// Path reported for errors on the top-level value
const ROOT_PATH: &str = "<root>";

/// Default ceiling on raw input size (10 MB)
pub const DEFAULT_MAX_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// Main profile composer that orchestrates all parsing
#[derive(Debug, Clone)]
pub struct ProfileComposer {
    limits: ParseLimits,
    max_input_bytes: usize,
}

impl Default for ProfileComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileComposer {
    pub fn new() -> Self {
        Self { limits: ParseLimits::default(), max_input_bytes: DEFAULT_MAX_INPUT_BYTES }
    }

    pub fn with_limits(mut self, limits: ParseLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_max_input_bytes(mut self, max_input_bytes: usize) -> Self {
        self.max_input_bytes = max_input_bytes;
        self
    }

    /// Parse a complete profile response from raw text
    pub fn parse(&self, text: &str) -> ProfileResult<ProfileDocument> {
        if text.len() > self.max_input_bytes {
            return Err(ProfileError::ResourceLimitExceeded {
                limit: "input_bytes",
                actual: text.len(),
                max: self.max_input_bytes,
            });
        }

        let cleaned = ValueParser::normalize_triple_quoted_descriptions(text);
        let value = self.decode(&cleaned)?;

        self.parse_value(&value)
    }

    /// Decode text into a JSON value, leaving tree depth to the builder's `max_depth`
    ///
    /// The decoder's own recursion limit is lifted; the nesting pre-scan bounds it instead.
    fn decode(&self, text: &str) -> ProfileResult<Value> {
        let max_nesting = self.limits.max_json_nesting();
        let nesting = ValueParser::nesting_depth(text);
        if nesting > max_nesting {
            return Err(ProfileError::ResourceLimitExceeded {
                limit: "json_nesting",
                actual: nesting,
                max: max_nesting,
            });
        }

        let invalid =
            |e: serde_json::Error| ProfileError::schema(INPUT_PATH, format!("invalid JSON: {}", e));
        let mut de = serde_json::Deserializer::from_str(text);
        de.disable_recursion_limit();
        let value = Value::deserialize(&mut de).map_err(invalid)?;
        de.end().map_err(invalid)?;
        Ok(value)
    }

    /// Parse a profile response that has already been decoded into a JSON value
    pub fn parse_value(&self, value: &Value) -> ProfileResult<ProfileDocument> {
        let root = ValueParser::as_object(value, ROOT_PATH)?;

        let profile = match root.get("profile") {
            None => return Err(ProfileError::schema("profile", "missing required field")),
            Some(profile) => ValueParser::as_object(profile, "profile")?,
        };

        let raw_shards = ValueParser::required_array(profile, "shards", "profile")?;
        if raw_shards.is_empty() {
            return Err(ProfileError::schema("profile.shards", "profile contains no shards"));
        }

        let mut builder = TreeBuilder::new(self.limits);
        let shards = raw_shards
            .iter()
            .enumerate()
            .map(|(idx, shard)| {
                ShardParser::parse(shard, &ValueParser::index_path("shards", idx), &mut builder)
            })
            .collect::<ProfileResult<Vec<_>>>()?;

        let total_took_nanos = ValueParser::optional_u64(root, "took", "")?
            .map(|ms| ms.saturating_mul(constants::NANOS_PER_MILLI));
        let phase_took_ms = Self::parse_phase_took(root)?;

        tracing::debug!(
            "Parsed profile: {} shards, {} component nodes",
            shards.len(),
            builder.nodes_built()
        );

        Ok(ProfileDocument { shards, total_took_nanos, phase_took_ms })
    }

    /// Read the optional `phase_took` map (milliseconds per phase)
    fn parse_phase_took(
        root: &serde_json::Map<String, Value>,
    ) -> ProfileResult<Option<BTreeMap<String, u64>>> {
        let Some(raw) = ValueParser::optional_object(root, "phase_took", "")? else {
            return Ok(None);
        };

        let mut phases = BTreeMap::new();
        for (phase, value) in raw {
            let ms = ValueParser::expect_u64(value, &ValueParser::field_path("phase_took", phase))?;
            phases.insert(phase.clone(), ms);
        }
        Ok(Some(phases))
    }
}
