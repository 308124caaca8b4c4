// Layered configuration: defaults, config file, command line

pub mod loader;

// Re-export main types
pub use loader::{AuthConfig, ConfigLoader, ServerConfig, StorageConfig, SurveyConfig};

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Values given on the command line; `None` keeps the file's value
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub cors_origins: Vec<String>,
}

impl CliOverrides {
    pub fn apply(self, config: &mut SurveyConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(data_dir) = self.data_dir {
            config.storage.data_dir = Some(data_dir);
        }
        if !self.cors_origins.is_empty() {
            config.server.cors_origins = self.cors_origins;
        }
    }
}

/// Load and merge configuration
/// Priority: CLI -> config file -> defaults
pub fn load_config(config_path: Option<&Path>, overrides: CliOverrides) -> Result<SurveyConfig> {
    let loader = match config_path {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };

    let mut config = loader.load()?;
    overrides.apply(&mut config);
    loader::validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[server]\nport = 4000\nbind = \"0.0.0.0\"\n").unwrap();

        let config = load_config(
            Some(&path),
            CliOverrides {
                port: Some(5000),
                data_dir: Some(temp_dir.path().join("data")),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(
            config.storage.resolved_data_dir(),
            temp_dir.path().join("data")
        );
    }

    #[test]
    fn test_overrides_are_validated() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_config(
            Some(&temp_dir.path().join("absent.toml")),
            CliOverrides {
                port: Some(0),
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }
}
