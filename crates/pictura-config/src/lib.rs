#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod env;
mod error;
mod loader;
mod manager;
pub mod providers;
mod scoped;

use pictura_core::{ImageSize, SupportedRatio};
use serde::{Deserialize, Serialize};

pub use env::{ENV_OVERRIDES, EnvOverride, env_key_for_provider};
pub use error::{ConfigError, Result};
pub use manager::ConfigManager;
pub use providers::*;
pub use scoped::{ConfigScope, ConfigSource, ScopedConfig, ScopedConfigManager};

/// Config file location, relative to the project root or the user's home
pub const CONFIG_RELATIVE_PATH: &str = ".claude/plugins/maccing/pictura/config.json";

/// Project-relative directory generated images are written to
pub const DEFAULT_OUTPUT_DIR: &str = ".claude/plugins/maccing/pictura/output";

/// Lowest accepted `retryAttempts`
pub const MIN_RETRY_ATTEMPTS: u32 = 1;

/// Highest accepted `retryAttempts`
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Top-level Pictura configuration
///
/// Every field has a default, so `{}` is a valid configuration file.
/// Unknown keys are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PicturaConfig {
    /// Generation and upscale provider settings
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Ratio used when a request names none
    #[serde(default = "default_ratio")]
    pub default_ratio: SupportedRatio,
    /// Quality preset
    #[serde(default)]
    pub default_quality: Quality,
    /// Resolution tier used when a request names none
    #[serde(default)]
    pub image_size: ImageSize,
    /// How multi-ratio batches keep a consistent look
    #[serde(default)]
    pub default_consistency: Consistency,
    /// Attempts per generation, including the first
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Directory generated images are saved under
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for PicturaConfig {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig::default(),
            default_ratio: default_ratio(),
            default_quality: Quality::default(),
            image_size: ImageSize::default(),
            default_consistency: Consistency::default(),
            retry_attempts: default_retry_attempts(),
            output_dir: default_output_dir(),
        }
    }
}

/// Quality preset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Draft,
    #[default]
    Pro,
}

/// Consistency strategy for multi-ratio batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    #[default]
    Generate,
    Reference,
    Multiturn,
}

const fn default_ratio() -> SupportedRatio {
    SupportedRatio::Landscape16x9
}

const fn default_retry_attempts() -> u32 {
    3
}

fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_owned()
}
