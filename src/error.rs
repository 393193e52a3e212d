//! Error types.
//!
//! Pattern compilation is the only fallible step of the engine. Everything that
//! happens per message is infallible by construction, so the errors here are all
//! configuration-time errors: surface them before the extractor accepts traffic.

use std::path::PathBuf;
use thiserror::Error;

/// A composite pattern failed to compile.
///
/// Every variant carries the composite `name` and the raw `pattern` text so a
/// caller loading hundreds of alternatives can point at the offending one.
#[derive(Debug, Error)]
pub enum PatternCompileError {
    #[error("composite '{name}': pattern \"{pattern}\" is not a valid regular expression: {source}")]
    InvalidPattern {
        name: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("composite '{name}': type expression '{expression}' in pattern \"{pattern}\" is invalid: {source}")]
    InvalidTypeExpression {
        name: String,
        pattern: String,
        expression: String,
        #[source]
        source: regex::Error,
    },

    #[error("composite '{name}': unclosed type expression at byte {offset} of pattern \"{pattern}\"")]
    UnbalancedTypeExpression { name: String, pattern: String, offset: usize },

    #[error("composite '{name}': placeholder at byte {offset} of pattern \"{pattern}\" has no valid type expression")]
    InvalidPlaceholder { name: String, pattern: String, offset: usize },
}

impl PatternCompileError {
    /// Name of the composite entity whose pattern failed.
    pub fn name(&self) -> &str {
        match self {
            Self::InvalidPattern { name, .. }
            | Self::InvalidTypeExpression { name, .. }
            | Self::UnbalancedTypeExpression { name, .. }
            | Self::InvalidPlaceholder { name, .. } => name,
        }
    }

    /// Raw text of the failing pattern.
    pub fn pattern(&self) -> &str {
        match self {
            Self::InvalidPattern { pattern, .. }
            | Self::InvalidTypeExpression { pattern, .. }
            | Self::UnbalancedTypeExpression { pattern, .. }
            | Self::InvalidPlaceholder { pattern, .. } => pattern,
        }
    }
}

/// Errors raised while loading or persisting a pattern set.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed pattern set: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Compile(#[from] PatternCompileError),
}
