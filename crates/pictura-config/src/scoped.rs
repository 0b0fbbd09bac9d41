//! User and project configuration layered into one effective config

use std::{fmt, path::Path};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    CONFIG_RELATIVE_PATH, ConfigError, ConfigManager, DEFAULT_OUTPUT_DIR, ENV_OVERRIDES, PicturaConfig, Result,
    env::read_override,
    loader::ConfigDocument,
    manager::resolve_provider,
    providers::{ProviderRole, ProviderSettings},
};

const OUTPUT_DIR_KEY: &str = "outputDir";

/// A writable configuration scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigScope {
    User,
    Project,
}

impl ConfigScope {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an effective configuration value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    User,
    Project,
    Default,
    Env,
}

impl ConfigSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Default => "default",
            Self::Env => "env",
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ConfigScope> for ConfigSource {
    fn from(scope: ConfigScope) -> Self {
        match scope {
            ConfigScope::User => Self::User,
            ConfigScope::Project => Self::Project,
        }
    }
}

/// The merged configuration and the provenance of each dotted key path
#[derive(Debug, Clone)]
pub struct ScopedConfig {
    pub config: PicturaConfig,
    pub sources: IndexMap<String, ConfigSource>,
}

impl ScopedConfig {
    pub fn source(&self, key: &str) -> Option<ConfigSource> {
        self.sources.get(key).copied()
    }
}

/// Merges user-scope and project-scope config files
///
/// Precedence, lowest first: schema defaults, the user file, the project
/// file, then `PICTURA_*_API_KEY` environment variables. `outputDir` always
/// resolves to the project-local default.
#[derive(Debug)]
pub struct ScopedConfigManager {
    user: ConfigManager,
    project: ConfigManager,
    cached: Option<ScopedConfig>,
}

impl ScopedConfigManager {
    /// Manager for `project_root`, with user scope under the home directory
    pub fn new(project_root: impl AsRef<Path>) -> Result<Self> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeDirUnavailable)?;
        Ok(Self::with_roots(home, project_root))
    }

    /// Manager with an explicit user home, mostly for tests
    pub fn with_roots(user_home: impl AsRef<Path>, project_root: impl AsRef<Path>) -> Self {
        Self {
            user: ConfigManager::new(user_home.as_ref().join(CONFIG_RELATIVE_PATH)),
            project: ConfigManager::new(project_root.as_ref().join(CONFIG_RELATIVE_PATH)),
            cached: None,
        }
    }

    pub fn user_config_path(&self) -> &Path {
        self.user.path()
    }

    pub fn project_config_path(&self) -> &Path {
        self.project.path()
    }

    /// Whether either scope has a config file
    pub async fn exists_any(&self) -> bool {
        self.user.exists().await || self.project.exists().await
    }

    pub async fn exists_in_scope(&self, scope: ConfigScope) -> bool {
        self.manager(scope).exists().await
    }

    /// One scope's config on its own, or defaults when it has no file
    pub async fn load_scope(&mut self, scope: ConfigScope) -> Result<PicturaConfig> {
        let manager = self.manager_mut(scope);
        if !manager.exists().await {
            return Ok(PicturaConfig::default());
        }
        manager.load().await
    }

    /// Build, validate and cache the effective configuration
    pub async fn load_merged(&mut self) -> Result<ScopedConfig> {
        if let Some(cached) = &self.cached {
            return Ok(cached.clone());
        }

        let defaults = serde_json::to_value(PicturaConfig::default())
            .map_err(|e| ConfigError::Invalid(format!("failed to encode defaults: {e}")))?;
        let Value::Object(mut merged) = defaults else {
            return Err(ConfigError::Invalid("defaults must encode as an object".to_owned()));
        };

        let mut sources = IndexMap::new();
        for key in merged.keys() {
            sources.insert(key.clone(), ConfigSource::Default);
        }
        for role in [ProviderRole::Generation, ProviderRole::Upscale] {
            sources.insert(format!("providers.{role}"), ConfigSource::Default);
        }

        for scope in [ConfigScope::User, ConfigScope::Project] {
            if let Some(doc) = self.read_layer(scope).await {
                apply_layer(&mut merged, &mut sources, &doc.raw, scope.into());
            }
        }

        apply_env_overrides(&mut merged, &mut sources);

        let mut config: PicturaConfig = serde_json::from_value(Value::Object(merged))
            .map_err(|e| ConfigError::Invalid(format!("merged config is invalid: {e}")))?;
        config.validate()?;

        config.output_dir = DEFAULT_OUTPUT_DIR.to_owned();
        sources.insert(OUTPUT_DIR_KEY.to_owned(), ConfigSource::Default);

        let scoped = ScopedConfig { config, sources };
        self.cached = Some(scoped.clone());
        Ok(scoped)
    }

    /// Save `config` to one scope and drop the merged cache
    pub async fn save_to_scope(&mut self, scope: ConfigScope, config: PicturaConfig) -> Result<()> {
        self.manager_mut(scope).save(config).await?;
        self.cached = None;
        Ok(())
    }

    /// Provider settings from the merged config; requires [`load_merged`](Self::load_merged)
    pub fn provider_config(&self, role: ProviderRole, name: &str) -> Result<ProviderSettings> {
        let scoped = self.cached.as_ref().ok_or(ConfigError::NotLoaded)?;
        Ok(resolve_provider(&scoped.config, role, name))
    }

    /// Forget the merged result and both scope caches
    pub fn clear_cache(&mut self) {
        self.cached = None;
        self.user.clear_cache();
        self.project.clear_cache();
    }

    async fn read_layer(&mut self, scope: ConfigScope) -> Option<ConfigDocument> {
        let manager = self.manager_mut(scope);
        if !manager.exists().await {
            return None;
        }

        match manager.load_document().await {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(
                    scope = %scope,
                    path = %manager.path().display(),
                    error = %e,
                    "skipping unusable config file"
                );
                None
            }
        }
    }

    const fn manager(&self, scope: ConfigScope) -> &ConfigManager {
        match scope {
            ConfigScope::User => &self.user,
            ConfigScope::Project => &self.project,
        }
    }

    const fn manager_mut(&mut self, scope: ConfigScope) -> &mut ConfigManager {
        match scope {
            ConfigScope::User => &mut self.user,
            ConfigScope::Project => &mut self.project,
        }
    }
}

/// Overlay the keys a scope file actually set
fn apply_layer(
    merged: &mut Map<String, Value>,
    sources: &mut IndexMap<String, ConfigSource>,
    layer: &Map<String, Value>,
    source: ConfigSource,
) {
    for (key, value) in layer {
        if key == "providers" {
            merge_providers(merged, sources, value, source);
        } else {
            merged.insert(key.clone(), value.clone());
        }
        sources.insert(key.clone(), source);
    }
}

/// Provider entries replace whole per-provider objects within a role
fn merge_providers(
    merged: &mut Map<String, Value>,
    sources: &mut IndexMap<String, ConfigSource>,
    layer: &Value,
    source: ConfigSource,
) {
    let Some(layer) = layer.as_object() else {
        return;
    };

    with_object(merged, "providers", |providers| {
        for role in [ProviderRole::Generation, ProviderRole::Upscale] {
            let Some(entries) = layer.get(role.as_str()).and_then(Value::as_object) else {
                continue;
            };

            with_object(providers, role.as_str(), |target| {
                for (name, entry) in entries {
                    target.insert(name.clone(), entry.clone());
                    if entry.get("apiKey").is_some() {
                        sources.insert(format!("providers.{role}.{name}.apiKey"), source);
                    }
                }
            });
            sources.insert(format!("providers.{role}"), source);
        }
    });
}

fn apply_env_overrides(merged: &mut Map<String, Value>, sources: &mut IndexMap<String, ConfigSource>) {
    for entry in ENV_OVERRIDES {
        let Some(key) = read_override(entry.var) else {
            continue;
        };

        with_object(merged, "providers", |providers| {
            with_object(providers, entry.role.as_str(), |role| {
                with_object(role, entry.provider, |provider| {
                    provider.insert("apiKey".to_owned(), Value::String(key));
                });
            });
        });

        tracing::debug!(var = entry.var, "applied API key from environment");
        sources.insert(entry.key_path(), ConfigSource::Env);
    }
}

/// Run `f` on the object stored under `key`
///
/// A missing or non-object value is replaced by an empty object first.
fn with_object<R>(map: &mut Map<String, Value>, key: &str, f: impl FnOnce(&mut Map<String, Value>) -> R) -> R {
    let mut object = match map.remove(key) {
        Some(Value::Object(object)) => object,
        _ => Map::new(),
    };
    let result = f(&mut object);
    map.insert(key.to_owned(), Value::Object(object));
    result
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pictura_core::{ImageSize, SupportedRatio};
    use secrecy::ExposeSecret;

    use super::*;
    use crate::{GeminiModel, GenerationProvider};

    const UNSET: [(&str, Option<&str>); 4] = [
        ("PICTURA_GEMINI_API_KEY", None),
        ("PICTURA_OPENAI_API_KEY", None),
        ("PICTURA_TOPAZ_API_KEY", None),
        ("PICTURA_REPLICATE_API_KEY", None),
    ];

    struct Roots {
        _home: tempfile::TempDir,
        _project: tempfile::TempDir,
        user_file: PathBuf,
        project_file: PathBuf,
        manager: ScopedConfigManager,
    }

    fn roots() -> Roots {
        let home = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let manager = ScopedConfigManager::with_roots(home.path(), project.path());
        Roots {
            user_file: home.path().join(CONFIG_RELATIVE_PATH),
            project_file: project.path().join(CONFIG_RELATIVE_PATH),
            _home: home,
            _project: project,
            manager,
        }
    }

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn no_files_yields_defaults() {
        temp_env::async_with_vars(UNSET, async {
            let mut roots = roots();
            assert!(!roots.manager.exists_any().await);

            let scoped = roots.manager.load_merged().await.unwrap();
            assert_eq!(scoped.config.default_ratio, SupportedRatio::Landscape16x9);
            assert_eq!(scoped.source("defaultRatio"), Some(ConfigSource::Default));
            assert_eq!(scoped.source("providers.generation"), Some(ConfigSource::Default));
        })
        .await;
    }

    #[tokio::test]
    async fn project_overrides_user() {
        temp_env::async_with_vars(UNSET, async {
            let mut roots = roots();
            write(&roots.user_file, r#"{ "defaultRatio": "1:1", "imageSize": "4K" }"#);
            write(&roots.project_file, r#"{ "defaultRatio": "9:16" }"#);

            let scoped = roots.manager.load_merged().await.unwrap();
            assert_eq!(scoped.config.default_ratio, SupportedRatio::Portrait9x16);
            assert_eq!(scoped.config.image_size, ImageSize::FourK);
            assert_eq!(scoped.source("defaultRatio"), Some(ConfigSource::Project));
            assert_eq!(scoped.source("imageSize"), Some(ConfigSource::User));
            assert_eq!(scoped.source("retryAttempts"), Some(ConfigSource::Default));
        })
        .await;
    }

    #[tokio::test]
    async fn output_dir_is_always_project_default() {
        temp_env::async_with_vars(UNSET, async {
            let mut roots = roots();
            write(&roots.user_file, r#"{ "outputDir": "/home/someone/images" }"#);
            write(&roots.project_file, r#"{ "outputDir": "elsewhere" }"#);

            let scoped = roots.manager.load_merged().await.unwrap();
            assert_eq!(scoped.config.output_dir, DEFAULT_OUTPUT_DIR);
            assert_eq!(scoped.source("outputDir"), Some(ConfigSource::Default));
        })
        .await;
    }

    #[tokio::test]
    async fn env_key_wins_over_files() {
        let vars = [
            ("PICTURA_GEMINI_API_KEY", Some("env-key")),
            ("PICTURA_OPENAI_API_KEY", None),
            ("PICTURA_TOPAZ_API_KEY", None),
            ("PICTURA_REPLICATE_API_KEY", None),
        ];

        temp_env::async_with_vars(vars, async {
            let mut roots = roots();
            write(
                &roots.project_file,
                r#"{ "providers": { "generation": { "gemini": { "apiKey": "file-key", "defaultModel": "flash" } } } }"#,
            );

            let scoped = roots.manager.load_merged().await.unwrap();
            let gemini = scoped.config.providers.generation.gemini.as_ref().unwrap();
            assert_eq!(gemini.api_key.expose_secret(), "env-key");
            assert_eq!(gemini.default_model, GeminiModel::Flash);
            assert_eq!(
                scoped.source("providers.generation.gemini.apiKey"),
                Some(ConfigSource::Env)
            );
            assert_eq!(scoped.source("providers.generation"), Some(ConfigSource::Project));

            let settings = roots
                .manager
                .provider_config(ProviderRole::Generation, "gemini")
                .unwrap();
            assert_eq!(settings.api_key(), Some("env-key"));
        })
        .await;
    }

    #[tokio::test]
    async fn env_key_creates_missing_provider_entry() {
        let vars = [
            ("PICTURA_GEMINI_API_KEY", None),
            ("PICTURA_OPENAI_API_KEY", None),
            ("PICTURA_TOPAZ_API_KEY", Some("topaz-env")),
            ("PICTURA_REPLICATE_API_KEY", None),
        ];

        temp_env::async_with_vars(vars, async {
            let mut roots = roots();
            let scoped = roots.manager.load_merged().await.unwrap();

            let topaz = scoped.config.providers.upscale.topaz.as_ref().unwrap();
            assert_eq!(topaz.api_key.expose_secret(), "topaz-env");
            assert_eq!(topaz.default_model, "Standard V2");
        })
        .await;
    }

    #[test]
    fn env_override_replaces_non_object_provider_slots() {
        let mut merged = serde_json::json!({
            "providers": { "generation": "not-an-object", "upscale": { "topaz": { "apiKey": "t" } } },
            "imageSize": "4K"
        });
        let Value::Object(map) = &mut merged else {
            panic!("fixture is an object");
        };

        let mut sources = IndexMap::new();
        let vars = [
            ("PICTURA_GEMINI_API_KEY", Some("env-key")),
            ("PICTURA_OPENAI_API_KEY", None),
            ("PICTURA_TOPAZ_API_KEY", None),
            ("PICTURA_REPLICATE_API_KEY", None),
        ];
        temp_env::with_vars(vars, || {
            apply_env_overrides(map, &mut sources);
        });

        assert_eq!(merged["providers"]["generation"]["gemini"]["apiKey"], "env-key");
        assert_eq!(merged["providers"]["upscale"]["topaz"]["apiKey"], "t");
        assert_eq!(merged["imageSize"], "4K");
        assert_eq!(
            sources.get("providers.generation.gemini.apiKey"),
            Some(&ConfigSource::Env)
        );
    }

    #[tokio::test]
    async fn providers_merge_per_entry() {
        temp_env::async_with_vars(UNSET, async {
            let mut roots = roots();
            write(
                &roots.user_file,
                r#"{ "providers": { "generation": { "gemini": { "apiKey": "user-gemini" } } } }"#,
            );
            write(
                &roots.project_file,
                r#"{ "providers": { "generation": { "default": "openai", "openai": { "apiKey": "project-openai" } } } }"#,
            );

            let scoped = roots.manager.load_merged().await.unwrap();
            let generation = &scoped.config.providers.generation;
            assert_eq!(generation.default, GenerationProvider::Openai);
            assert!(generation.gemini.is_some());
            assert!(generation.openai.is_some());
            assert_eq!(
                scoped.source("providers.generation.gemini.apiKey"),
                Some(ConfigSource::User)
            );
            assert_eq!(
                scoped.source("providers.generation.openai.apiKey"),
                Some(ConfigSource::Project)
            );
            assert_eq!(scoped.source("providers.upscale"), Some(ConfigSource::Default));
        })
        .await;
    }

    #[tokio::test]
    async fn invalid_user_file_is_skipped() {
        temp_env::async_with_vars(UNSET, async {
            let mut roots = roots();
            write(&roots.user_file, "{ this is not json");
            write(&roots.project_file, r#"{ "retryAttempts": 5 }"#);

            let scoped = roots.manager.load_merged().await.unwrap();
            assert_eq!(scoped.config.retry_attempts, 5);
            assert_eq!(scoped.source("retryAttempts"), Some(ConfigSource::Project));
        })
        .await;
    }

    #[tokio::test]
    async fn schema_violation_skips_the_whole_layer() {
        temp_env::async_with_vars(UNSET, async {
            let mut roots = roots();
            write(&roots.project_file, r#"{ "defaultRatio": "1:1", "retryAttempts": 50 }"#);

            let scoped = roots.manager.load_merged().await.unwrap();
            assert_eq!(scoped.config.default_ratio, SupportedRatio::Landscape16x9);
            assert_eq!(scoped.config.retry_attempts, 3);
        })
        .await;
    }

    #[tokio::test]
    async fn save_to_scope_invalidates_merged_cache() {
        temp_env::async_with_vars(UNSET, async {
            let mut roots = roots();
            assert_eq!(roots.manager.load_merged().await.unwrap().config.retry_attempts, 3);

            let config = PicturaConfig {
                retry_attempts: 7,
                ..PicturaConfig::default()
            };
            roots.manager.save_to_scope(ConfigScope::User, config).await.unwrap();

            assert!(roots.manager.exists_in_scope(ConfigScope::User).await);
            assert!(!roots.manager.exists_in_scope(ConfigScope::Project).await);

            let scoped = roots.manager.load_merged().await.unwrap();
            assert_eq!(scoped.config.retry_attempts, 7);
            assert_eq!(scoped.source("retryAttempts"), Some(ConfigSource::User));
        })
        .await;
    }

    #[tokio::test]
    async fn load_scope_reads_one_file() {
        temp_env::async_with_vars(UNSET, async {
            let mut roots = roots();
            write(&roots.user_file, r#"{ "imageSize": "1K" }"#);

            let user = roots.manager.load_scope(ConfigScope::User).await.unwrap();
            let project = roots.manager.load_scope(ConfigScope::Project).await.unwrap();
            assert_eq!(user.image_size, ImageSize::OneK);
            assert_eq!(project.image_size, ImageSize::TwoK);
        })
        .await;
    }

    #[test]
    fn provider_config_requires_merge() {
        let roots = roots();
        assert!(matches!(
            roots.manager.provider_config(ProviderRole::Upscale, "topaz"),
            Err(ConfigError::NotLoaded)
        ));
    }
}
