//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// Why the server configuration could not be produced.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested env file could not be read.
    #[error("Failed to read env file {path}: {message}")]
    Dotenv { path: PathBuf, message: String },

    /// A variable is set but does not parse as the expected type.
    #[error("Invalid value {value:?} for {key}: {message}")]
    Parse {
        key: String,
        value: String,
        message: String,
    },

    /// One or more settings are out of bounds; problems are `; `-separated.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
