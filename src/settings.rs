use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::store::{read_json, write_json, StoreError};

// ── Completion endpoint config ──────────────────────────────────

/// Configuration for the chat-completion endpoint used by the remote
/// resolver.
///
/// The `api_key` field is never written to `settings.json`. It is stored in a
/// separate credentials file and loaded/saved via [`load_api_key`]/[`save_api_key`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API. None = `https://api.openai.com/v1`.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Model override. None = use the default model.
    #[serde(default)]
    pub model: Option<String>,
}

/// Redacted view of the completion config (no raw API key).
#[derive(Debug, Clone, Serialize)]
pub struct CompletionConfigInfo {
    pub has_api_key: bool,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl CompletionConfigInfo {
    #[must_use]
    pub fn from_config(config: &CompletionConfig) -> Self {
        Self {
            has_api_key: config.api_key.as_ref().is_some_and(|k| !k.is_empty()),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        }
    }
}

// ── App settings ─────────────────────────────────────────────────

/// Application-level settings stored in the OS config directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub version: u32,
    #[serde(default)]
    pub completion: CompletionConfig,
    /// Append a JSONL line per invoked action under `action-logs/`.
    #[serde(default)]
    pub audit_invocations: bool,
}

const SETTINGS_VERSION: u32 = 1;

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            completion: CompletionConfig::default(),
            audit_invocations: false,
        }
    }
}

/// Load the API key from the separate credentials file.
pub fn load_api_key(app_config_dir: &Path) -> Option<String> {
    let path = crate::paths::credentials_path(app_config_dir);
    std::fs::read_to_string(path)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Save the API key to the separate credentials file. An empty key removes it.
pub fn save_api_key(app_config_dir: &Path, key: &str) -> Result<(), StoreError> {
    std::fs::create_dir_all(app_config_dir)?;
    let path = crate::paths::credentials_path(app_config_dir);
    if key.is_empty() {
        let _ = std::fs::remove_file(&path);
    } else {
        crate::store::atomic_write(&path, key.as_bytes())?;
    }
    Ok(())
}

/// Load settings from the app config directory. Returns None if no settings
/// file exists or it cannot be parsed. The API key is filled in from the
/// credentials file.
pub fn load_settings(app_config_dir: &Path) -> Option<AppSettings> {
    let path = crate::paths::settings_path(app_config_dir);
    if !path.exists() {
        return None;
    }
    let mut settings = match read_json::<AppSettings>(&path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
            return None;
        }
    };
    if settings.completion.api_key.is_none() {
        settings.completion.api_key = load_api_key(app_config_dir);
    }
    Some(settings)
}

/// Load settings, falling back to defaults (plus any stored key) when absent.
pub fn load_or_default(app_config_dir: &Path) -> AppSettings {
    load_settings(app_config_dir).unwrap_or_else(|| {
        let mut settings = AppSettings::default();
        settings.completion.api_key = load_api_key(app_config_dir);
        settings
    })
}

/// Save settings to the app config directory.
pub fn save_settings(app_config_dir: &Path, settings: &AppSettings) -> Result<(), StoreError> {
    std::fs::create_dir_all(app_config_dir)?;
    write_json(&crate::paths::settings_path(app_config_dir), settings)
}
