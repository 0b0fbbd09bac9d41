//! Temporary user and project roots with config files

use std::path::{Path, PathBuf};

use pictura_config::{CONFIG_RELATIVE_PATH, ProviderSettings, ScopedConfigManager};
use tempfile::TempDir;

use super::mock_vendor::{MockVendor, TEST_KEY};

/// Environment overrides cleared for the duration of a test
pub const CLEAR_ENV: [(&str, Option<&str>); 4] = [
    ("PICTURA_GEMINI_API_KEY", None),
    ("PICTURA_OPENAI_API_KEY", None),
    ("PICTURA_TOPAZ_API_KEY", None),
    ("PICTURA_REPLICATE_API_KEY", None),
];

pub struct Workspace {
    home: TempDir,
    project: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            home: tempfile::tempdir().expect("temp home"),
            project: tempfile::tempdir().expect("temp project"),
        }
    }

    pub fn project_root(&self) -> &Path {
        self.project.path()
    }

    pub fn write_user(&self, config: &serde_json::Value) -> PathBuf {
        write(self.home.path(), config)
    }

    pub fn write_project(&self, config: &serde_json::Value) -> PathBuf {
        write(self.project.path(), config)
    }

    pub fn manager(&self) -> ScopedConfigManager {
        ScopedConfigManager::with_roots(self.home.path(), self.project.path())
    }
}

fn write(root: &Path, config: &serde_json::Value) -> PathBuf {
    let path = root.join(CONFIG_RELATIVE_PATH);
    std::fs::create_dir_all(path.parent().expect("config has a parent")).expect("create config dir");
    std::fs::write(&path, serde_json::to_vec_pretty(config).expect("encode config")).expect("write config");
    path
}

/// Project config pointing every provider at the mock
pub fn mock_project_config(mock: &MockVendor) -> serde_json::Value {
    serde_json::json!({
        "providers": {
            "generation": {
                "default": "gemini",
                "gemini": { "apiKey": TEST_KEY, "defaultModel": "flash", "baseUrl": mock.gemini_url() },
                "openai": { "apiKey": TEST_KEY, "baseUrl": mock.openai_url() }
            },
            "upscale": {
                "topaz": { "apiKey": TEST_KEY, "baseUrl": mock.topaz_url() }
            }
        },
        "retryAttempts": 2
    })
}

pub fn settings(api_key: &str, base_url: String) -> ProviderSettings {
    ProviderSettings::with_api_key(api_key).base_url(base_url)
}
