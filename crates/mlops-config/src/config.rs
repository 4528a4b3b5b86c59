use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backend::BackendConfig;
use crate::error::ConfigError;
use crate::log::LogConfig;

/// Top-level settings for an artifact store client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub project_id: String,
  #[serde(default)]
  pub bucket_id: String,
  #[serde(default)]
  pub backend: BackendConfig,
  #[serde(default)]
  pub log: LogConfig,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
  pub project_id: Option<String>,
  pub bucket_id: Option<String>,
  /// Switches the backend to the filesystem rooted here.
  pub fs_root: Option<PathBuf>,
  pub log_level: Option<String>,
}

impl Config {
  /// Read a config file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::parse(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Read a config file if it exists, otherwise start from defaults.
  pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    if path.exists() {
      Self::load(path)
    } else {
      Ok(Self::default())
    }
  }

  pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(content)
  }

  pub fn apply(&mut self, overrides: Overrides) {
    if let Some(project_id) = overrides.project_id {
      self.project_id = project_id;
    }
    if let Some(bucket_id) = overrides.bucket_id {
      self.bucket_id = bucket_id;
    }
    if let Some(root) = overrides.fs_root {
      self.backend = BackendConfig::Filesystem { root };
    }
    if let Some(level) = overrides.log_level {
      self.log.level = level;
    }
  }

  /// Check that the settings describe a usable client.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.project_id.trim().is_empty() {
      return Err(ConfigError::Invalid("project_id is required".to_string()));
    }
    if self.bucket_id.trim().is_empty() {
      return Err(ConfigError::Invalid("bucket_id is required".to_string()));
    }
    if let BackendConfig::Filesystem { root } = &self.backend
      && root.as_os_str().is_empty()
    {
      return Err(ConfigError::Invalid(
        "filesystem backend requires a root directory".to_string(),
      ));
    }
    if self.log.level.trim().is_empty() {
      return Err(ConfigError::Invalid("log.level must not be empty".to_string()));
    }
    Ok(())
  }
}
