use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const CONFIG_FILE_PATH: &str = "campaign.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid TOML config {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Runtime settings for generation and batching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Secret credential for the generation service.
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub batch_cap: usize,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub pacing_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            model: None,
            batch_cap: 10,
            max_attempts: 3,
            base_delay_ms: 1000,
            pacing_ms: 150,
            request_timeout_secs: 30,
        }
    }
}

pub fn campaign_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".campaign-synth")
}

fn campaign_config_json_path() -> PathBuf {
    campaign_dir().join("config.json")
}

impl SynthesisConfig {
    /// Load from the user config file (or `./campaign.toml`), then apply
    /// environment overrides. Unreadable files fall back to defaults.
    pub fn new() -> Self {
        let json_path = campaign_config_json_path();
        let base = match Self::from_files(Some(&json_path), Some(Path::new(CONFIG_FILE_PATH))) {
            Ok(config) => config,
            Err(error) => {
                log::warn!("Ignoring config file: {}", error);
                Self::default()
            }
        };
        base.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// The JSON file wins when present; otherwise the TOML file; otherwise defaults.
    pub fn from_files(json: Option<&Path>, toml_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = json.filter(|p| p.exists()) {
            let content = read(path)?;
            let config = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?;
            log::debug!("Loaded config from {:?}", path);
            return Ok(config);
        }

        if let Some(path) = toml_path.filter(|p| p.exists()) {
            let content = read(path)?;
            let config = toml::from_str(&content).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })?;
            log::debug!("Loaded config from {:?}", path);
            return Ok(config);
        }

        Ok(Self::default())
    }

    pub fn with_env_overrides<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = var("API_KEY") {
            self.api_key = Some(api_key);
        }
        if let Some(api_base) = var("API_BASE") {
            self.api_base = Some(api_base);
        }
        if let Some(model) = var("MODEL") {
            self.model = Some(model);
        }
        override_number(&var, "SYNTHESIS_BATCH_CAP", &mut self.batch_cap);
        override_number(&var, "SYNTHESIS_MAX_ATTEMPTS", &mut self.max_attempts);
        override_number(&var, "SYNTHESIS_BASE_DELAY_MS", &mut self.base_delay_ms);
        override_number(&var, "SYNTHESIS_PACING_MS", &mut self.pacing_ms);
        override_number(
            &var,
            "SYNTHESIS_REQUEST_TIMEOUT_SECS",
            &mut self.request_timeout_secs,
        );
        self
    }

    pub fn model_or_default(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MODEL)
    }

    pub fn api_base_or_default(&self) -> &str {
        self.api_base
            .as_deref()
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_API_BASE)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn override_number<F, T>(var: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = var(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *target = value,
        Err(_) => log::warn!("Ignoring {}={:?}: not a valid number", key, raw),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_policy() {
        let config = SynthesisConfig::default();
        assert_eq!(config.batch_cap, 10);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.pacing_ms, 150);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.model_or_default(), DEFAULT_MODEL);
        assert_eq!(config.api_base_or_default(), DEFAULT_API_BASE);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn env_overrides_apply() {
        let config = SynthesisConfig::default().with_env_overrides(env(&[
            ("API_KEY", "secret"),
            ("MODEL", "gemini-custom"),
            ("SYNTHESIS_BATCH_CAP", "5"),
            ("SYNTHESIS_PACING_MS", "0"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.model_or_default(), "gemini-custom");
        assert_eq!(config.batch_cap, 5);
        assert_eq!(config.pacing_ms, 0);
    }

    #[test]
    fn invalid_numeric_override_is_ignored() {
        let config = SynthesisConfig::default()
            .with_env_overrides(env(&[("SYNTHESIS_MAX_ATTEMPTS", "many")]));
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn json_file_takes_precedence_over_toml() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("config.json");
        let toml_path = dir.path().join("campaign.toml");
        std::fs::write(&json, r#"{"batch_cap": 4, "model": "from-json"}"#).unwrap();
        std::fs::write(&toml_path, "batch_cap = 7\n").unwrap();

        let config = SynthesisConfig::from_files(Some(&json), Some(&toml_path)).unwrap();
        assert_eq!(config.batch_cap, 4);
        assert_eq!(config.model.as_deref(), Some("from-json"));
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn toml_file_used_when_json_missing() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("campaign.toml");
        std::fs::write(&toml_path, "pacing_ms = 250\nmax_attempts = 5\n").unwrap();

        let config =
            SynthesisConfig::from_files(Some(&dir.path().join("missing.json")), Some(&toml_path))
                .unwrap();
        assert_eq!(config.pacing_ms, 250);
        assert_eq!(config.max_attempts, 5);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("config.json");
        std::fs::write(&json, "{not json").unwrap();

        let err = SynthesisConfig::from_files(Some(&json), None).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }
}
