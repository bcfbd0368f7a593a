//! Gateway configuration.
//!
//! Loaded from `~/.config/showroom/config.toml` (or an explicit path). Every
//! section is optional; missing keys fall back to the defaults below.

use crate::error::{Result, ShowroomError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "showroom";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Root configuration structure for config.toml
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub retry: RetryConfig,
    pub prompts: PromptConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the WebSocket listener binds to.
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8765".to_string(),
        }
    }
}

/// Which HTTP API the gateway talks to.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    #[default]
    Gemini,
    Claude,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub provider: BackendProvider,
    /// Primary model. `None` uses the provider's default.
    pub model: Option<String>,
    /// Whether a failed stream falls back to a lower-capability model.
    pub fallback: bool,
    /// Fallback model. `None` uses the provider's default fallback.
    pub fallback_model: Option<String>,
    pub max_tokens: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: BackendProvider::Gemini,
            model: None,
            fallback: true,
            fallback_model: None,
            max_tokens: 1024,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Number of user/model turn pairs kept per connection.
    pub max_turn_pairs: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_turn_pairs: 4 }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Fractional jitter applied to each delay (0.25 = ±25%).
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 400,
            max_delay_ms: 8_000,
            jitter: 0.25,
        }
    }
}

/// System prompts shown to the model.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PromptConfig {
    pub chat: String,
    pub product: String,
    pub material: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            chat: DEFAULT_CHAT_PROMPT.to_string(),
            product: DEFAULT_PRODUCT_PROMPT.to_string(),
            material: DEFAULT_MATERIAL_PROMPT.to_string(),
        }
    }
}

const DEFAULT_CHAT_PROMPT: &str = "You are a friendly interior design assistant inside a room \
furnishing game. Keep replies short (two or three sentences) and conversational. \
Messages may start with a bracketed tag from the game UI: [ITEM_SELECTED] means the player \
picked the item described after the tag, [SUGGESTION_SHOWN] means a product suggestion was just \
displayed, [MATERIAL_APPLIED] means a new material was applied to the selected item, and \
[NO_MATCH] means the catalog had nothing matching. Acknowledge these naturally; never repeat the tag.";

const DEFAULT_PRODUCT_PROMPT: &str = "Extract the furniture shopping intent from the player's \
message. Set suggest to true only when the player wants a product recommendation. Use 0 for any \
unknown number and an empty string for an unknown category.";

const DEFAULT_MATERIAL_PROMPT: &str = "Extract the material change the player wants for the \
selected item: the material slot (wood, fabric, leather, metal, stone, glass, plastic, rattan), \
the color and the finish. Set apply to true when any of them should change.";

impl GatewayConfig {
    /// Loads configuration from `path`, or from the default location when
    /// `path` is `None`.
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// file at an explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Self::default_path()?;
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    tracing::debug!(
                        "[Config] No config at {}, using defaults",
                        default_path.display()
                    );
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ShowroomError::io(format!(
                "Failed to read configuration file at {}: {}",
                path.display(),
                e
            ))
        })?;
        tracing::info!("[Config] Loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Returns the default configuration path: ~/.config/showroom/config.toml
    pub fn default_path() -> Result<PathBuf> {
        Ok(config_dir()?.join(CONFIG_FILE_NAME))
    }

    fn validate(&self) -> Result<()> {
        if self.session.max_turn_pairs == 0 {
            return Err(ShowroomError::config(
                "session.max_turn_pairs must be at least 1",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ShowroomError::config("retry.max_attempts must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.retry.jitter) {
            return Err(ShowroomError::config("retry.jitter must be in [0, 1)"));
        }
        Ok(())
    }
}

/// Returns the gateway's configuration directory: ~/.config/showroom
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| ShowroomError::config("Could not determine configuration directory"))?;
    Ok(base.join(CONFIG_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = GatewayConfig::from_toml_str("").unwrap();
        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.session.max_turn_pairs, 4);
        assert_eq!(config.retry.max_attempts, 4);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = GatewayConfig::from_toml_str(
            r#"
            [backend]
            provider = "claude"
            model = "claude-sonnet-4-20250514"

            [session]
            max_turn_pairs = 6
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.provider, BackendProvider::Claude);
        assert_eq!(config.backend.model.as_deref(), Some("claude-sonnet-4-20250514"));
        assert_eq!(config.backend.max_tokens, 1024);
        assert_eq!(config.session.max_turn_pairs, 6);
        assert_eq!(config.server.listen, "127.0.0.1:8765");
    }

    #[test]
    fn test_zero_turn_pairs_rejected() {
        let err = GatewayConfig::from_toml_str("[session]\nmax_turn_pairs = 0").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_malformed_toml_is_serialization_error() {
        let err = GatewayConfig::from_toml_str("[server\nlisten = 1").unwrap_err();
        assert!(err.is_serialization());
    }

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nlisten = \"0.0.0.0:9000\"").unwrap();

        let config = GatewayConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:9000");
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(GatewayConfig::load(Some(&missing)).is_err());
    }
}
