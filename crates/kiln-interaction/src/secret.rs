//! Secret configuration loading.
//!
//! The Gemini API key comes from the `GEMINI_API_KEY` environment variable or,
//! failing that, from `~/.config/kiln/secret.json`:
//!
//! ```json
//! { "gemini": { "api_key": "..." } }
//! ```
//!
//! The file is plaintext and should be readable by its owner only.

use kiln_core::config::{KilnPaths, SecretConfig};
use kiln_core::{GenerationError, KilnError, Result};
use std::path::{Path, PathBuf};

/// Environment variable that overrides secret.json.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Read-only access to secret.json.
#[derive(Debug, Clone)]
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    /// Uses the default path (`~/.config/kiln/secret.json`).
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(KilnPaths::secret_file()?))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<SecretConfig> {
        if !self.exists() {
            return Err(KilnError::config(format!(
                "Configuration file not found at: {}",
                self.path.display()
            )));
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Resolves the API key, preferring the environment.
    ///
    /// A missing file or a file without a key gives
    /// [`GenerationError::MissingApiKey`]; a file that exists but cannot be
    /// read or parsed is reported as such.
    pub fn resolve_api_key(&self) -> Result<String> {
        self.resolve_api_key_with(std::env::var(API_KEY_ENV).ok())
    }

    /// Same as [`Self::resolve_api_key`] with the environment value supplied.
    pub fn resolve_api_key_with(&self, env_value: Option<String>) -> Result<String> {
        if let Some(key) = env_value.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
            tracing::debug!("[Secret] Using API key from {}", API_KEY_ENV);
            return Ok(key);
        }

        if !self.exists() {
            tracing::debug!("[Secret] {} not found", self.path.display());
            return Err(GenerationError::MissingApiKey.into());
        }
        let config = self.load().map_err(|err| {
            tracing::warn!("[Secret] Failed to read {}: {}", self.path.display(), err);
            err
        })?;
        config
            .gemini
            .map(|gemini| gemini.api_key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| GenerationError::MissingApiKey.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_with(content: Option<&str>) -> (tempfile::TempDir, SecretStorage) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.json");
        if let Some(content) = content {
            std::fs::write(&path, content).unwrap();
        }
        (dir, SecretStorage::with_path(path))
    }

    #[test]
    fn test_env_overrides_file() {
        let (_dir, storage) = storage_with(Some(r#"{"gemini":{"api_key":"from-file"}}"#));
        assert_eq!(
            storage.resolve_api_key_with(Some("from-env".into())).unwrap(),
            "from-env"
        );
    }

    #[test]
    fn test_file_used_when_env_blank() {
        let (_dir, storage) = storage_with(Some(r#"{"gemini":{"api_key":"from-file"}}"#));
        assert_eq!(
            storage.resolve_api_key_with(Some("  ".into())).unwrap(),
            "from-file"
        );
    }

    #[test]
    fn test_missing_everything() {
        let (_dir, storage) = storage_with(None);
        assert_eq!(
            storage.resolve_api_key_with(None).unwrap_err(),
            KilnError::Generation(GenerationError::MissingApiKey)
        );
        assert!(storage.load().is_err());
    }

    #[test]
    fn test_file_without_gemini_section() {
        let (_dir, storage) = storage_with(Some("{}"));
        assert_eq!(
            storage.resolve_api_key_with(None).unwrap_err(),
            KilnError::Generation(GenerationError::MissingApiKey)
        );
    }

    #[test]
    fn test_malformed_file_is_not_a_missing_key() {
        let (_dir, storage) = storage_with(Some(r#"{"gemini": {"api_key": }"#));
        match storage.resolve_api_key_with(None).unwrap_err() {
            KilnError::Serialization { format, .. } => assert_eq!(format, "JSON"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
