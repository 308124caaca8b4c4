// Configuration file loading

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::auth::sessions::DEFAULT_SESSION_MAX_AGE_SECS;

/// Survey server configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SurveyConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Where data is kept
    #[serde(default)]
    pub storage: StorageConfig,
    /// Session settings
    #[serde(default)]
    pub auth: AuthConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Allowed CORS origins; empty allows any origin
    #[serde(rename = "corsOrigins", alias = "cors_origins", default)]
    pub cors_origins: Vec<String>,
}

fn default_port() -> u16 {
    3000
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            cors_origins: Vec::new(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StorageConfig {
    /// Data directory; defaults to the platform data dir
    #[serde(rename = "dataDir", alias = "data_dir", default)]
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// The configured data directory, or `<data dir>/ai-survey`
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ai-survey")
        })
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthConfig {
    /// Lifetime of a sign-in session in seconds
    #[serde(
        rename = "sessionMaxAgeSecs",
        alias = "session_max_age_secs",
        default = "default_session_max_age"
    )]
    pub session_max_age_secs: i64,
}

fn default_session_max_age() -> i64 {
    DEFAULT_SESSION_MAX_AGE_SECS
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_max_age_secs: default_session_max_age(),
        }
    }
}

/// Config loader
pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader for the default config location
    pub fn new() -> Self {
        Self {
            path: Self::get_default_config_path(),
        }
    }

    /// Loader for an explicit config file
    pub fn with_path(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
        }
    }

    /// `<config dir>/ai-survey/config.toml`
    fn get_default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ai-survey").join("config.toml"))
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load the config file, falling back to defaults when there is none
    pub fn load(&self) -> Result<SurveyConfig> {
        match self.path {
            Some(ref path) => Ok(self.load_from_path(path)?.unwrap_or_default()),
            None => Ok(SurveyConfig::default()),
        }
    }

    /// Load config from a specific path
    pub fn load_from_path(&self, path: &Path) -> Result<Option<SurveyConfig>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: SurveyConfig = toml::from_str(&contents)
            .map_err(|e| anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;

        validate_config(&config)?;

        log::debug!("Loaded config from: {}", path.display());
        Ok(Some(config))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate config values
pub fn validate_config(config: &SurveyConfig) -> Result<()> {
    if config.server.port == 0 {
        return Err(anyhow!("port must be greater than 0"));
    }

    if config.server.bind.trim().is_empty() {
        return Err(anyhow!("bind address cannot be empty"));
    }

    if config.auth.session_max_age_secs <= 0 {
        return Err(anyhow!("sessionMaxAgeSecs must be greater than 0"));
    }

    if let Some(origin) = config
        .server
        .cors_origins
        .iter()
        .find(|o| !(o.starts_with("http://") || o.starts_with("https://")))
    {
        return Err(anyhow!("Invalid CORS origin '{}'", origin));
    }

    Ok(())
}
