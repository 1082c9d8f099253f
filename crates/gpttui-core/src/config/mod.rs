use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::defaults;
use crate::error::GptError;
use crate::llm::{BackendConfig, BackendKind, ChatSonicConfig, ColossalConfig, OpenAIConfig};
use crate::store::StoreKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub openai: OpenAIConfig,
    #[serde(default)]
    pub chatsonic: ChatSonicConfig,
    #[serde(default)]
    pub colossal: ColossalConfig,
    #[serde(default)]
    pub keybindings: KeyBindings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralSettings {
    pub database_kind: StoreKind,
    pub database: PathBuf,
    pub session: String,
    pub backend: BackendKind,
    pub context: String,
    pub theme: String,
}

/// Key names per action. Names are single characters, `escape`, `enter`,
/// `tab`, `backspace`, or `ctrl+<char>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeyBindings {
    pub insert: String,
    pub normal: String,
    pub yank: String,
    pub paste: String,
    pub clear: String,
    pub quit: String,
    pub send: String,
    pub delete: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            database_kind: StoreKind::Sqlite,
            database: Settings::config_dir().join(defaults::DATABASE_FILE),
            session: defaults::SESSION.to_string(),
            backend: BackendKind::OpenAI,
            context: defaults::CONTEXT.to_string(),
            theme: defaults::THEME.to_string(),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            insert: "i".to_string(),
            normal: "escape".to_string(),
            yank: "y".to_string(),
            paste: "p".to_string(),
            clear: "c".to_string(),
            quit: "q".to_string(),
            send: "enter".to_string(),
            delete: "d".to_string(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            openai: OpenAIConfig::default(),
            chatsonic: ChatSonicConfig::default(),
            colossal: ColossalConfig::default(),
            keybindings: KeyBindings::default(),
        }
    }
}

impl Settings {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(defaults::CONFIG_DIR)
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join(defaults::CONFIG_FILE)
    }

    /// Load from the default location, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Ignoring invalid config {}: {}", config_path.display(), e),
            }
        }
        Self::default()
    }

    pub fn load_from(path: &Path) -> Result<Self, GptError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| GptError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), GptError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| GptError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Write the defaults to `path` unless a file is already there.
    /// Returns whether a file was written.
    pub fn init_at(path: &Path, force: bool) -> Result<bool, GptError> {
        if path.exists() && !force {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }

    /// Resolve the configuration of the selected backend, reading credentials
    /// from the environment variables named in the settings when no inline
    /// key is set. This is the only place credentials are looked up.
    pub fn backend_config(&self) -> BackendConfig {
        match self.general.backend {
            BackendKind::OpenAI => {
                let mut config = self.openai.clone();
                if config.api_key.is_empty() {
                    config.api_key = read_env(&config.api_key_env).unwrap_or_default();
                }
                if config.organization.is_none() {
                    config.organization = read_env(&config.organization_env);
                }
                BackendConfig::OpenAI(config)
            }
            BackendKind::ChatSonic => {
                let mut config = self.chatsonic.clone();
                if config.api_key.is_empty() {
                    config.api_key = read_env(&config.api_key_env).unwrap_or_default();
                }
                BackendConfig::ChatSonic(config)
            }
            BackendKind::Colossal => BackendConfig::Colossal(self.colossal.clone()),
        }
    }
}

fn read_env(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
