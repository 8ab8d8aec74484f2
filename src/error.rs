//! WolfStore Error Types

use thiserror::Error;

/// Result type alias for WolfStore operations
pub type Result<T> = std::result::Result<T, Error>;

/// WolfStore error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Configuration serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    // Node errors
    #[error("{node} is DOWN. Cannot store file.")]
    NodeUnavailable { node: String },

    #[error("Invalid node index {index} (cluster has {nodes} nodes)")]
    InvalidIndex { index: usize, nodes: usize },

    // File errors
    #[error("File '{0}' not available (all replicas lost or nodes down)")]
    FileUnavailable(String),

    // Script errors
    #[error("Script error on line {line}: {reason}")]
    Script { line: usize, reason: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Check if this error means the requested file has no live replica
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::FileUnavailable(_))
    }

    /// Check if this error was caused by bad caller input rather than cluster state
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Error::InvalidIndex { .. } | Error::Script { .. })
    }
}
