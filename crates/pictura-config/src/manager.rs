use std::path::{Path, PathBuf};

use crate::{
    ConfigError, PicturaConfig, Result, env,
    loader::ConfigDocument,
    providers::{ProviderRole, ProviderSettings},
};

/// File-backed configuration for a single scope
///
/// The parsed file is cached after the first successful [`load`](Self::load);
/// [`clear_cache`](Self::clear_cache) forces the next load back to disk.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
    cached: Option<ConfigDocument>,
}

impl ConfigManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the config file exists, without reading it
    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Load, validate and cache the config file
    pub async fn load(&mut self) -> Result<PicturaConfig> {
        Ok(self.load_document().await?.config)
    }

    pub(crate) async fn load_document(&mut self) -> Result<ConfigDocument> {
        if let Some(doc) = &self.cached {
            return Ok(doc.clone());
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ConfigError::Read {
                path: self.path.clone(),
                source,
            })?;

        let doc = ConfigDocument::parse(&self.path, &contents)?;
        tracing::debug!(path = %self.path.display(), "loaded config");

        self.cached = Some(doc.clone());
        Ok(doc)
    }

    /// Validate and write `config`, restricting the file to its owner
    pub async fn save(&mut self, config: PicturaConfig) -> Result<()> {
        config.validate()?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.write_error(source))?;
        }

        let json = serde_json::to_string_pretty(&config).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;

        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| self.write_error(source))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|source| self.write_error(source))?;
        }

        tracing::info!(path = %self.path.display(), "saved config");

        self.cached = Some(ConfigDocument::from_config(&self.path, config)?);
        Ok(())
    }

    pub fn clear_cache(&mut self) {
        self.cached = None;
    }

    /// Settings for one provider, with its environment variable taking
    /// precedence over the stored API key
    pub fn provider_config(&self, role: ProviderRole, name: &str) -> Result<ProviderSettings> {
        let doc = self.cached.as_ref().ok_or(ConfigError::NotLoaded)?;
        Ok(resolve_provider(&doc.config, role, name))
    }

    /// Warn when the config file is readable by anyone but its owner
    ///
    /// Returns `false` only when the file exists with a different mode.
    pub async fn verify_permissions(&self) -> bool {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let Ok(metadata) = tokio::fs::metadata(&self.path).await else {
                return true;
            };

            let mode = metadata.permissions().mode() & 0o777;
            if mode != 0o600 {
                tracing::warn!(
                    path = %self.path.display(),
                    mode = %format!("{mode:o}"),
                    "config file contains API keys but is not restricted to mode 600"
                );
                return false;
            }
        }

        true
    }

    fn write_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

pub(crate) fn resolve_provider(config: &PicturaConfig, role: ProviderRole, name: &str) -> ProviderSettings {
    let mut settings = config.providers.settings(role, name);
    if let Some(key) = env::api_key_override(name) {
        settings.api_key = Some(key);
    }
    settings
}

#[cfg(test)]
mod tests {
    use pictura_core::SupportedRatio;
    use secrecy::ExposeSecret;

    use super::*;

    const GEMINI_CONFIG: &str = r#"{
        "providers": {
            "generation": { "gemini": { "apiKey": "file-key", "defaultModel": "flash" } }
        },
        "defaultRatio": "1:1"
    }"#;

    fn manager_in(dir: &tempfile::TempDir) -> ConfigManager {
        ConfigManager::new(dir.path().join("nested").join("config.json"))
    }

    #[tokio::test]
    async fn missing_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(&dir);

        assert!(!manager.exists().await);
        assert!(matches!(manager.load().await, Err(ConfigError::Read { .. })));
    }

    #[tokio::test]
    async fn save_creates_parent_and_restricts_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(&dir);

        manager.save(PicturaConfig::default()).await.unwrap();
        assert!(manager.exists().await);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(manager.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        assert!(manager.verify_permissions().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn loose_permissions_are_reported() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        assert!(!ConfigManager::new(&path).verify_permissions().await);
    }

    #[tokio::test]
    async fn save_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(&dir);

        let config = PicturaConfig {
            retry_attempts: 0,
            ..PicturaConfig::default()
        };

        assert!(matches!(manager.save(config).await, Err(ConfigError::Invalid(_))));
        assert!(!manager.exists().await);
    }

    #[tokio::test]
    async fn load_is_cached_until_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "defaultRatio": "1:1" }"#).unwrap();

        let mut manager = ConfigManager::new(&path);
        assert_eq!(manager.load().await.unwrap().default_ratio, SupportedRatio::Square);

        std::fs::write(&path, r#"{ "defaultRatio": "21:9" }"#).unwrap();
        assert_eq!(manager.load().await.unwrap().default_ratio, SupportedRatio::Square);

        manager.clear_cache();
        assert_eq!(manager.load().await.unwrap().default_ratio, SupportedRatio::Ultrawide21x9);
    }

    #[tokio::test]
    async fn failed_load_caches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut manager = ConfigManager::new(&path);
        assert!(matches!(manager.load().await, Err(ConfigError::Parse { .. })));
        assert!(matches!(
            manager.provider_config(ProviderRole::Generation, "gemini"),
            Err(ConfigError::NotLoaded)
        ));

        std::fs::write(&path, "{}").unwrap();
        assert!(manager.load().await.is_ok());
    }

    #[test]
    fn provider_config_requires_load() {
        let manager = ConfigManager::new("/nonexistent/config.json");
        let err = manager.provider_config(ProviderRole::Generation, "gemini").unwrap_err();
        assert_eq!(err.to_string(), "Config not loaded");
    }

    #[tokio::test]
    async fn provider_config_returns_stored_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, GEMINI_CONFIG).unwrap();

        temp_env::async_with_vars([("PICTURA_GEMINI_API_KEY", None::<&str>)], async {
            let mut manager = ConfigManager::new(&path);
            manager.load().await.unwrap();

            let settings = manager.provider_config(ProviderRole::Generation, "gemini").unwrap();
            assert_eq!(settings.api_key(), Some("file-key"));
            assert_eq!(settings.default_model.as_deref(), Some("flash"));

            let missing = manager.provider_config(ProviderRole::Generation, "openai").unwrap();
            assert!(missing.api_key.is_none());
            assert!(missing.default_model.is_none());
        })
        .await;
    }

    #[tokio::test]
    async fn env_override_replaces_only_the_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, GEMINI_CONFIG).unwrap();

        temp_env::async_with_vars([("PICTURA_GEMINI_API_KEY", Some("env-key"))], async {
            let mut manager = ConfigManager::new(&path);
            manager.load().await.unwrap();

            let settings = manager.provider_config(ProviderRole::Generation, "gemini").unwrap();
            assert_eq!(settings.api_key.unwrap().expose_secret(), "env-key");
            assert_eq!(settings.default_model.as_deref(), Some("flash"));
        })
        .await;
    }
}
