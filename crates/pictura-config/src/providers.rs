//! Per-provider credentials and defaults

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

/// Provider settings for both roles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub generation: GenerationProviders,
    #[serde(default)]
    pub upscale: UpscaleProviders,
}

impl ProvidersConfig {
    /// Settings blob for a provider, empty when nothing is stored for it
    pub fn settings(&self, role: ProviderRole, name: &str) -> ProviderSettings {
        match (role, name) {
            (ProviderRole::Generation, "gemini") => self.generation.gemini.as_ref().map(ProviderSettings::from),
            (ProviderRole::Generation, "openai") => self.generation.openai.as_ref().map(ProviderSettings::from),
            (ProviderRole::Upscale, "topaz") => self.upscale.topaz.as_ref().map(ProviderSettings::from),
            (ProviderRole::Upscale, "replicate") => self.upscale.replicate.as_ref().map(ProviderSettings::from),
            _ => None,
        }
        .unwrap_or_default()
    }
}

/// Which registry a provider belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderRole {
    Generation,
    Upscale,
}

impl ProviderRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generation => "generation",
            Self::Upscale => "upscale",
        }
    }
}

impl fmt::Display for ProviderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image generation providers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationProviders {
    /// Provider used when a request names none
    #[serde(default)]
    pub default: GenerationProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<GeminiConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<OpenAiConfig>,
}

/// Upscale providers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpscaleProviders {
    /// Provider used when a request names none
    #[serde(default)]
    pub default: UpscaleProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topaz: Option<TopazConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicate: Option<ReplicateConfig>,
}

/// Generation providers the schema recognises
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    #[default]
    Gemini,
    Openai,
}

impl GenerationProvider {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Openai => "openai",
        }
    }
}

/// Upscale providers the schema recognises
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpscaleProvider {
    #[default]
    Topaz,
    Replicate,
}

impl UpscaleProvider {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Topaz => "topaz",
            Self::Replicate => "replicate",
        }
    }
}

/// Gemini model aliases
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeminiModel {
    Flash,
    #[default]
    Pro,
}

impl GeminiModel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flash => "flash",
            Self::Pro => "pro",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiConfig {
    #[serde(serialize_with = "expose_secret")]
    pub api_key: SecretString,
    #[serde(default)]
    pub default_model: GeminiModel,
    /// Endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAiConfig {
    #[serde(serialize_with = "expose_secret")]
    pub api_key: SecretString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopazConfig {
    #[serde(serialize_with = "expose_secret")]
    pub api_key: SecretString,
    #[serde(default = "default_topaz_model")]
    pub default_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicateConfig {
    #[serde(serialize_with = "expose_secret")]
    pub api_key: SecretString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_topaz_model() -> String {
    "Standard V2".to_owned()
}

/// Keys are written in clear text; the file itself is owner-only
fn expose_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Provider-specific settings handed to an adapter on every call
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub api_key: Option<SecretString>,
    pub default_model: Option<String>,
    pub base_url: Option<String>,
}

impl ProviderSettings {
    /// Settings carrying only an API key
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(SecretString::from(api_key.into())),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// The API key, if one is configured and non-empty
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .filter(|key| !key.is_empty())
    }
}

impl From<&GeminiConfig> for ProviderSettings {
    fn from(config: &GeminiConfig) -> Self {
        Self {
            api_key: Some(config.api_key.clone()),
            default_model: Some(config.default_model.as_str().to_owned()),
            base_url: config.base_url.clone(),
        }
    }
}

impl From<&OpenAiConfig> for ProviderSettings {
    fn from(config: &OpenAiConfig) -> Self {
        Self {
            api_key: Some(config.api_key.clone()),
            default_model: None,
            base_url: config.base_url.clone(),
        }
    }
}

impl From<&TopazConfig> for ProviderSettings {
    fn from(config: &TopazConfig) -> Self {
        Self {
            api_key: Some(config.api_key.clone()),
            default_model: Some(config.default_model.clone()),
            base_url: config.base_url.clone(),
        }
    }
}

impl From<&ReplicateConfig> for ProviderSettings {
    fn from(config: &ReplicateConfig) -> Self {
        Self {
            api_key: Some(config.api_key.clone()),
            default_model: None,
            base_url: config.base_url.clone(),
        }
    }
}
