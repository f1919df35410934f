//! Error types for profile parsing and analysis

use thiserror::Error;

/// Errors that can occur while parsing or analyzing a profile response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    /// Input is structurally invalid or a required field is missing / mistyped
    #[error("Schema error at {path}: {message}")]
    Schema { path: String, message: String },

    /// A caller supplied parameter is outside its allowed range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A configured depth / size ceiling was tripped
    #[error("Resource limit exceeded: {limit} is {actual}, maximum is {max}")]
    ResourceLimitExceeded { limit: &'static str, actual: usize, max: usize },
}

impl ProfileError {
    pub fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema { path: path.into(), message: message.into() }
    }

    /// Path of the offending input field, for schema errors
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Schema { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for parser and analyzer operations
pub type ProfileResult<T> = Result<T, ProfileError>;
