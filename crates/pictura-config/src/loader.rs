use std::path::Path;

use serde_json::{Map, Value};

use crate::{ConfigError, MAX_RETRY_ATTEMPTS, MIN_RETRY_ATTEMPTS, PicturaConfig, Result};

/// A parsed config file: the validated config plus the keys it actually set
#[derive(Debug, Clone)]
pub(crate) struct ConfigDocument {
    pub raw: Map<String, Value>,
    pub config: PicturaConfig,
}

impl PicturaConfig {
    /// Parse and validate a JSON configuration string
    pub fn from_json(input: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(input).map_err(|e| ConfigError::Invalid(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check constraints the type system does not already enforce
    pub fn validate(&self) -> Result<()> {
        if !(MIN_RETRY_ATTEMPTS..=MAX_RETRY_ATTEMPTS).contains(&self.retry_attempts) {
            return Err(ConfigError::Invalid(format!(
                "retryAttempts must be between {MIN_RETRY_ATTEMPTS} and {MAX_RETRY_ATTEMPTS}, got {}",
                self.retry_attempts
            )));
        }

        if self.output_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("outputDir must not be empty".to_owned()));
        }

        Ok(())
    }
}

impl ConfigDocument {
    /// Parse file contents, keeping the raw object for layering
    pub fn parse(path: &Path, contents: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let Value::Object(raw) = value else {
            return Err(ConfigError::Invalid(format!(
                "{} must contain a JSON object",
                path.display()
            )));
        };

        let config: PicturaConfig =
            serde_json::from_value(Value::Object(raw.clone())).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;

        Ok(Self { raw, config })
    }

    /// Document for a config that was just validated and saved
    pub fn from_config(path: &Path, config: PicturaConfig) -> Result<Self> {
        let value = serde_json::to_value(&config).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let raw = match value {
            Value::Object(raw) => raw,
            _ => Map::new(),
        };

        Ok(Self { raw, config })
    }
}
