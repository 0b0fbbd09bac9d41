//! Configuration access for the CLI, in single-file or merged mode

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use pictura_config::{
    ConfigManager, ConfigScope, ConfigSource, PicturaConfig, ProviderRole, ProviderSettings, ScopedConfigManager,
    env_key_for_provider,
};

use crate::args::Args;

/// Where configuration comes from
pub enum ConfigStore {
    /// `--config` names one file; no layering
    Single(ConfigManager),
    /// User and project files merged with environment overrides
    Scoped(ScopedConfigManager),
}

/// Effective configuration and, in merged mode, where each key came from
pub struct LoadedConfig {
    pub config: PicturaConfig,
    pub sources: Vec<(String, ConfigSource)>,
}

impl ConfigStore {
    pub fn open(args: &Args) -> anyhow::Result<Self> {
        match &args.config {
            Some(path) => Ok(Self::Single(ConfigManager::new(path))),
            None => Ok(Self::Scoped(ScopedConfigManager::new(&args.project)?)),
        }
    }

    pub async fn load(&mut self) -> anyhow::Result<LoadedConfig> {
        self.check_permissions().await;

        match self {
            Self::Single(manager) => {
                if !manager.exists().await {
                    bail!(
                        "no configuration at {}\n  Create it with: pictura --config {} config set \
                         providers.generation.gemini.apiKey <key>",
                        manager.path().display(),
                        manager.path().display()
                    );
                }
                let config = manager.load().await?;
                Ok(LoadedConfig {
                    config,
                    sources: Vec::new(),
                })
            }
            Self::Scoped(manager) => {
                let scoped = manager.load_merged().await?;
                let sources = scoped.sources.iter().map(|(key, source)| (key.clone(), *source)).collect();
                Ok(LoadedConfig {
                    config: scoped.config,
                    sources,
                })
            }
        }
    }

    /// Settings for a provider; [`Self::load`] must have run
    pub fn provider(&self, role: ProviderRole, name: &str) -> pictura_config::Result<ProviderSettings> {
        match self {
            Self::Single(manager) => manager.provider_config(role, name),
            Self::Scoped(manager) => manager.provider_config(role, name),
        }
    }

    /// Settings for a provider, failing with setup instructions when it has no API key
    pub fn provider_with_key(&self, role: ProviderRole, name: &str) -> anyhow::Result<ProviderSettings> {
        let settings = self.provider(role, name)?;
        if settings.api_key().is_none() {
            bail!("{}", missing_key_hint(role, name));
        }
        Ok(settings)
    }

    /// Config files this store reads, existing or not
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            Self::Single(manager) => vec![manager.path()],
            Self::Scoped(manager) => vec![manager.user_config_path(), manager.project_config_path()],
        }
    }

    async fn check_permissions(&self) {
        for path in self.paths() {
            if !ConfigManager::new(path).verify_permissions().await {
                eprintln!(
                    "Warning: {} contains API keys but is readable by others\n  Fix with: chmod 600 {}",
                    path.display(),
                    path.display()
                );
            }
        }
    }

    /// Set one dotted key and write the file back
    ///
    /// In merged mode `scope` picks the file; in single-file mode it is ignored.
    pub async fn set(&mut self, scope: ConfigScope, key: &str, value: serde_json::Value) -> anyhow::Result<PathBuf> {
        let current = match self {
            Self::Single(manager) => {
                if manager.exists().await {
                    manager.load().await?
                } else {
                    PicturaConfig::default()
                }
            }
            Self::Scoped(manager) => {
                if manager.exists_in_scope(scope).await {
                    manager.load_scope(scope).await?
                } else {
                    PicturaConfig::default()
                }
            }
        };

        let mut document = serde_json::to_value(&current).context("failed to encode configuration")?;
        set_dotted(&mut document, key, value)?;
        let updated: PicturaConfig =
            serde_json::from_value(document).with_context(|| format!("invalid value for {key}"))?;

        match self {
            Self::Single(manager) => {
                manager.save(updated).await?;
                Ok(manager.path().to_path_buf())
            }
            Self::Scoped(manager) => {
                manager.save_to_scope(scope, updated).await?;
                Ok(match scope {
                    ConfigScope::User => manager.user_config_path(),
                    ConfigScope::Project => manager.project_config_path(),
                }
                .to_path_buf())
            }
        }
    }
}

fn missing_key_hint(role: ProviderRole, name: &str) -> String {
    let mut hint = format!(
        "{name} API key is not configured\n  Run: pictura config set providers.{role}.{name}.apiKey <key>"
    );
    if let Some(var) = env_key_for_provider(name) {
        hint.push_str(&format!("\n  Or export {var}=<key>"));
    }
    hint
}

/// Assign `value` at a dotted path, creating intermediate objects
fn set_dotted(document: &mut serde_json::Value, key: &str, value: serde_json::Value) -> anyhow::Result<()> {
    let mut segments = key.split('.').peekable();
    let mut node = document;

    while let Some(segment) = segments.next() {
        if segment.is_empty() {
            bail!("invalid config key: {key}");
        }
        let Some(object) = node.as_object_mut() else {
            bail!("cannot set {key}: {segment} is inside a non-object value");
        };

        if segments.peek().is_none() {
            object.insert(segment.to_owned(), value);
            return Ok(());
        }

        node = object
            .entry(segment.to_owned())
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
    }

    bail!("invalid config key: {key}")
}

/// Parse a command-line value as JSON, falling back to a plain string
pub fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_owned()))
}

/// Replace every `apiKey` string with a masked form
pub fn mask_keys(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(object) => {
            for (key, child) in object.iter_mut() {
                match child {
                    serde_json::Value::String(secret) if key == "apiKey" => *secret = mask(secret),
                    _ => mask_keys(child),
                }
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(mask_keys),
        _ => {}
    }
}

fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_owned();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
