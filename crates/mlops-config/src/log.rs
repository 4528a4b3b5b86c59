use serde::{Deserialize, Serialize};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
  Pretty,
  #[default]
  Compact,
  Json,
}

/// Logging settings handed to the subscriber at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Filter directive, e.g. `info` or `mlops_artifact=debug,info`.
  /// `RUST_LOG` takes precedence when set.
  pub level: String,
  pub format: LogFormat,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      format: LogFormat::default(),
    }
  }
}
