//! Configuration models.
//!
//! `config.toml` holds non-secret settings and is optional: every field has a
//! default. API keys live separately in `secret.json`, which this crate only
//! models; loading it is the interaction layer's job.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::build::Roster;
use crate::error::{KilnError, Result};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_HISTORY_WINDOW: usize = 6;
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 24_000;

/// Standard locations under `~/.config/kiln`.
pub struct KilnPaths;

impl KilnPaths {
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| KilnError::config("Could not determine home directory"))?;
        Ok(home.join(".config").join("kiln"))
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn secret_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("secret.json"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub model: String,
    pub base_url: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Number of most recent conversation turns included in a prompt.
    pub history_window: usize,
    /// Initial value of the extended think-mode flag.
    pub think_mode_default: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            think_mode_default: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    /// Cap on the context passed to a single agent; the tail is kept.
    pub max_context_chars: usize,
    /// Replaces the built-in roster when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roster: Option<Roster>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            roster: None,
        }
    }
}

impl OrchestratorSettings {
    pub fn roster(&self) -> Roster {
        self.roster.clone().unwrap_or_default()
    }
}

/// Root of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KilnConfig {
    pub gemini: GeminiSettings,
    pub generation: GenerationSettings,
    pub orchestrator: OrchestratorSettings,
}

impl KilnConfig {
    /// Loads `~/.config/kiln/config.toml`, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&KilnPaths::config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("[Config] {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::info!("[Config] Loaded {}", path.display());
        Ok(config)
    }
}

/// Root of `secret.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecretConfig {
    #[serde(default)]
    pub gemini: Option<GeminiSecret>,
}

/// Gemini credentials.
#[derive(Clone, Deserialize)]
pub struct GeminiSecret {
    pub api_key: String,
    #[serde(default)]
    pub model_name: Option<String>,
}

impl std::fmt::Debug for GeminiSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSecret")
            .field("api_key", &"<redacted>")
            .field("model_name", &self.model_name)
            .finish()
    }
}
