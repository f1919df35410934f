//! Profile parser module
//!
//! Provides parsing capabilities for search engine profile responses.

pub mod composer;
pub mod core;
pub mod error;

// Re-export commonly used items
pub use composer::ProfileComposer;
pub use self::core::{MAX_DEPTH_CEILING, ParseLimits};
pub use error::{ProfileError, ProfileResult};
