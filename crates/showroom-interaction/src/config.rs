//! API key resolution.
//!
//! Keys are read from `~/.config/showroom/secret.json` first, then from the
//! provider's environment variable.

use serde::Deserialize;
use showroom_core::config::{BackendProvider, config_dir};
use showroom_core::error::{Result, ShowroomError};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const SECRET_FILE_NAME: &str = "secret.json";

/// Root structure of secret.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecretConfig {
    #[serde(default)]
    pub gemini: Option<ApiKeyConfig>,
    #[serde(default)]
    pub claude: Option<ApiKeyConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyConfig {
    pub api_key: String,
}

impl SecretConfig {
    fn api_key(&self, provider: BackendProvider) -> Option<&str> {
        let entry = match provider {
            BackendProvider::Gemini => self.gemini.as_ref(),
            BackendProvider::Claude => self.claude.as_ref(),
        };
        entry
            .map(|config| config.api_key.as_str())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Returns the path to the secret file: ~/.config/showroom/secret.json
pub fn secret_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(SECRET_FILE_NAME))
}

/// Loads the secret file. A missing file reads as empty.
pub fn load_secret_config(path: &Path) -> Result<SecretConfig> {
    if !path.exists() {
        return Ok(SecretConfig::default());
    }
    let content = fs::read_to_string(path).map_err(|e| {
        ShowroomError::io(format!(
            "Failed to read secret file at {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(serde_json::from_str(&content)?)
}

pub fn env_var_name(provider: BackendProvider) -> &'static str {
    match provider {
        BackendProvider::Gemini => "GEMINI_API_KEY",
        BackendProvider::Claude => "ANTHROPIC_API_KEY",
    }
}

/// Resolves the API key for `provider` from `secret_file`, then the
/// environment.
pub fn resolve_api_key_from(provider: BackendProvider, secret_file: &Path) -> Result<String> {
    match load_secret_config(secret_file) {
        Ok(secrets) => {
            if let Some(key) = secrets.api_key(provider) {
                return Ok(key.to_string());
            }
        }
        Err(err) => {
            tracing::warn!("[Secrets] Ignoring unreadable {}: {}", secret_file.display(), err);
        }
    }

    let var = env_var_name(provider);
    env::var(var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            ShowroomError::config(format!(
                "{var} not found in {} or environment variables",
                secret_file.display()
            ))
        })
}

/// Resolves the API key for `provider` from the default secret file, then the
/// environment.
pub fn resolve_api_key(provider: BackendProvider) -> Result<String> {
    resolve_api_key_from(provider, &secret_path()?)
}
