use secrecy::SecretString;

use crate::providers::ProviderRole;

/// An environment variable that replaces one provider's stored API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvOverride {
    pub var: &'static str,
    pub role: ProviderRole,
    pub provider: &'static str,
}

impl EnvOverride {
    /// Dotted config path the override writes to
    pub fn key_path(&self) -> String {
        format!("providers.{}.{}.apiKey", self.role.as_str(), self.provider)
    }
}

/// API key overrides, applied after every file layer
pub const ENV_OVERRIDES: &[EnvOverride] = &[
    EnvOverride {
        var: "PICTURA_GEMINI_API_KEY",
        role: ProviderRole::Generation,
        provider: "gemini",
    },
    EnvOverride {
        var: "PICTURA_OPENAI_API_KEY",
        role: ProviderRole::Generation,
        provider: "openai",
    },
    EnvOverride {
        var: "PICTURA_TOPAZ_API_KEY",
        role: ProviderRole::Upscale,
        provider: "topaz",
    },
    EnvOverride {
        var: "PICTURA_REPLICATE_API_KEY",
        role: ProviderRole::Upscale,
        provider: "replicate",
    },
];

/// Environment variable holding the API key for a provider
pub fn env_key_for_provider(name: &str) -> Option<&'static str> {
    ENV_OVERRIDES
        .iter()
        .find(|entry| entry.provider == name)
        .map(|entry| entry.var)
}

/// Non-empty value of an override variable
pub(crate) fn read_override(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|value| !value.is_empty())
}

/// API key for a provider taken from its environment variable
pub(crate) fn api_key_override(name: &str) -> Option<SecretString> {
    env_key_for_provider(name)
        .and_then(read_override)
        .map(SecretString::from)
}
