use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::constants::*;
use crate::error::{ImportError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub input: InputConfig,
    pub geocoder: GeocoderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub default_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub delay_ms: u64,
    pub country: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATABASE_PATH),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            default_path: PathBuf::from(DEFAULT_INPUT_PATH),
        }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GEOCODER_ENDPOINT.to_string(),
            user_agent: DEFAULT_GEOCODER_USER_AGENT.to_string(),
            delay_ms: DEFAULT_GEOCODER_DELAY_MS,
            country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

impl GeocoderConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Config {
    /// Load the config file if it exists, then apply environment overrides.
    /// A missing file is not an error: every setting has a default.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                ImportError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            Self::from_toml(&content)?
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.geocoder.endpoint.trim().is_empty() {
            return Err(ImportError::Config(
                "geocoder.endpoint must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(path) = env::var(ENV_DATABASE_PATH) {
            if !path.trim().is_empty() {
                self.database.path = PathBuf::from(path);
            }
        }
        if let Ok(endpoint) = env::var(ENV_GEOCODER_ENDPOINT) {
            if !endpoint.trim().is_empty() {
                self.geocoder.endpoint = endpoint;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [geocoder]
            delay_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.geocoder.delay_ms, 0);
        assert_eq!(config.geocoder.endpoint, DEFAULT_GEOCODER_ENDPOINT);
        assert_eq!(config.database.path, PathBuf::from(DEFAULT_DATABASE_PATH));
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        let err = Config::from_toml("[geocoder]\nendpoint = \"  \"\n").unwrap_err();
        assert!(matches!(err, ImportError::Config(_)));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.geocoder.country, DEFAULT_COUNTRY);
    }
}
