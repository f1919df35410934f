//! Component tree builder
//!
//! Converts raw query / collector / aggregation / fetch objects into `ComponentNode` trees.
//! Construction uses an explicit stack, so arbitrarily deep input never grows the call stack;
//! depth and node-count ceilings turn adversarial input into `ResourceLimitExceeded`.

use crate::services::profile_analyzer::models::{ComponentNode, NodeKind, constants};
use crate::services::profile_analyzer::parser::core::ValueParser;
use crate::services::profile_analyzer::parser::error::{ProfileError, ProfileResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Highest `max_depth` accepted from configuration and honoured when decoding text
pub const MAX_DEPTH_CEILING: usize = 256;

/// JSON levels above a root component node (envelope, shard, search, section) plus slack
/// for leaf objects such as `breakdown`
const ENVELOPE_NESTING: usize = 16;

/// Ceilings applied while building trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseLimits {
    /// Maximum nesting depth of a single tree (a root alone has depth 1)
    pub max_depth: usize,
    /// Maximum number of component nodes in the whole document
    pub max_nodes: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self { max_depth: 64, max_nodes: 100_000 }
    }
}

impl ParseLimits {
    /// JSON nesting needed to hold a component tree of `max_depth` levels
    ///
    /// Every component level costs two JSON levels (the node object and its `children`
    /// array). Text nested deeper than this is rejected before it is decoded.
    pub fn max_json_nesting(&self) -> usize {
        2 * self.max_depth.min(MAX_DEPTH_CEILING) + ENVELOPE_NESTING
    }
}

/// Partially built node waiting for its children
struct Frame<'a> {
    node: ComponentNode,
    path: String,
    depth: usize,
    raw_children: &'a [Value],
}

/// Builder for component trees, shared across one document so the node budget is global
pub struct TreeBuilder {
    limits: ParseLimits,
    nodes_built: usize,
}

impl TreeBuilder {
    pub fn new(limits: ParseLimits) -> Self {
        Self { limits, nodes_built: 0 }
    }

    /// Nodes built so far across every tree
    pub fn nodes_built(&self) -> usize {
        self.nodes_built
    }

    /// Build every element of a raw node array
    pub fn build_all(
        &mut self,
        raw_nodes: &[Value],
        kind: NodeKind,
        parent_path: &str,
    ) -> ProfileResult<Vec<ComponentNode>> {
        raw_nodes
            .iter()
            .enumerate()
            .map(|(idx, raw)| self.build(raw, kind, &ValueParser::index_path(parent_path, idx)))
            .collect()
    }

    /// Build one tree rooted at `raw`
    pub fn build(&mut self, raw: &Value, kind: NodeKind, path: &str) -> ProfileResult<ComponentNode> {
        let root = self.open_frame(raw, kind, path.to_string(), 1)?;
        let mut stack = vec![root];

        loop {
            let Some(top) = stack.last_mut() else {
                return Err(ProfileError::schema(path, "empty component stack"));
            };

            let next_child = top.node.children.len();
            if next_child < top.raw_children.len() {
                let raw_children = top.raw_children;
                let raw_child = &raw_children[next_child];
                let child_path = ValueParser::index_path(
                    &ValueParser::field_path(&top.path, "children"),
                    next_child,
                );
                let child_depth = top.depth + 1;
                let frame = self.open_frame(raw_child, kind, child_path, child_depth)?;
                stack.push(frame);
                continue;
            }

            let Some(finished) = stack.pop() else {
                return Err(ProfileError::schema(path, "empty component stack"));
            };
            match stack.last_mut() {
                Some(parent) => parent.node.children.push(finished.node),
                None => return Ok(finished.node),
            }
        }
    }

    /// Validate a raw node, read its own fields and reserve room for its children
    fn open_frame<'a>(
        &mut self,
        raw: &'a Value,
        kind: NodeKind,
        path: String,
        depth: usize,
    ) -> ProfileResult<Frame<'a>> {
        if depth > self.limits.max_depth {
            return Err(ProfileError::ResourceLimitExceeded {
                limit: "depth",
                actual: depth,
                max: self.limits.max_depth,
            });
        }
        self.nodes_built += 1;
        if self.nodes_built > self.limits.max_nodes {
            return Err(ProfileError::ResourceLimitExceeded {
                limit: "nodes",
                actual: self.nodes_built,
                max: self.limits.max_nodes,
            });
        }

        let obj = ValueParser::as_object(raw, &path)?;

        // Collectors carry `name` / `reason`; every other kind uses `type` / `description`
        let (type_key, description_key) = match kind {
            NodeKind::Collector => ("name", "reason"),
            _ => ("type", "description"),
        };
        let node_type = ValueParser::optional_string(obj, type_key, &path)?
            .unwrap_or_else(|| "unknown".to_string());
        let description =
            ValueParser::optional_string(obj, description_key, &path)?.unwrap_or_default();
        let time_nanos = ValueParser::optional_u64(obj, "time_in_nanos", &path)?.unwrap_or(0);
        let (breakdown, breakdown_counts) = Self::parse_breakdown(obj, &path)?;
        let raw_children = ValueParser::optional_array(obj, "children", &path)?;

        Ok(Frame {
            node: ComponentNode {
                kind,
                node_type,
                description,
                time_nanos,
                breakdown,
                breakdown_counts,
                children: Vec::with_capacity(raw_children.len()),
            },
            path,
            depth,
            raw_children,
        })
    }

    /// Split the raw breakdown into timings and invocation counts
    fn parse_breakdown(
        obj: &serde_json::Map<String, Value>,
        path: &str,
    ) -> ProfileResult<(BTreeMap<String, u64>, BTreeMap<String, u64>)> {
        let mut timings = BTreeMap::new();
        let mut counts = BTreeMap::new();

        let Some(raw) = ValueParser::optional_object(obj, "breakdown", path)? else {
            return Ok((timings, counts));
        };

        let breakdown_path = ValueParser::field_path(path, "breakdown");
        for (op, value) in raw {
            let nanos = ValueParser::expect_u64(value, &ValueParser::field_path(&breakdown_path, op))?;
            if op.ends_with(constants::BREAKDOWN_COUNT_SUFFIX) {
                counts.insert(op.clone(), nanos);
            } else {
                timings.insert(op.clone(), nanos);
            }
        }

        Ok((timings, counts))
    }
}
