//! Error types for vb-core

use thiserror::Error;

/// Main error type for vb-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for vb-core
pub type Result<T> = std::result::Result<T, Error>;
