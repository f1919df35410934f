//! Core parsing components

pub mod shard_parser;
pub mod tree_builder;
pub mod value_parser;

pub use shard_parser::ShardParser;
pub use tree_builder::{MAX_DEPTH_CEILING, ParseLimits, TreeBuilder};
pub use value_parser::ValueParser;
