use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration loading and persistence errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file or its directory could not be written
    #[error("failed to write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON or does not match the schema
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The configuration parsed but breaks a schema constraint
    #[error("invalid config: {0}")]
    Invalid(String),

    /// A provider lookup ran before the configuration was loaded
    #[error("Config not loaded")]
    NotLoaded,

    /// The user's home directory could not be determined
    #[error("unable to determine the home directory for user-scope config")]
    HomeDirUnavailable,
}
