use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("No data directory available on this platform")]
    NoDataDir,
}

/// Application settings, read from a TOML file.
///
/// ```toml
/// log_filter = "tally=debug,info"
/// database_path = "/var/lib/tally/receipts.db"
/// currency_symbol = "€"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// `tracing-subscriber` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// SQLite file. Defaults to `receipts.db` in the platform data directory.
    pub database_path: Option<PathBuf>,
    /// Prefix used when amounts are printed.
    pub currency_symbol: String,
}

impl Default for TallyConfig {
    fn default() -> Self {
        TallyConfig {
            log_filter: "info".to_string(),
            database_path: None,
            currency_symbol: "$".to_string(),
        }
    }
}

impl TallyConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Like [`TallyConfig::from_file`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn data_dir() -> Result<PathBuf, ConfigError> {
        directories::ProjectDirs::from("com", "tally", "Tally")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or(ConfigError::NoDataDir)
    }

    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "Tally")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("receipts.db")),
        }
    }
}
