//! Error types for appscout
//!
//! Catalog construction absorbs its own failures, so the only errors a
//! caller ever sees come from launching and from configuration handling.

use thiserror::Error;

/// Errors that can reach a caller of the catalog
#[derive(Debug, Error)]
pub enum ScoutError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Launch errors (the OS refused to start the artifact)
    #[error("Launch error: {0}")]
    Launch(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias for appscout operations
pub type ScoutResult<T> = Result<T, ScoutError>;
