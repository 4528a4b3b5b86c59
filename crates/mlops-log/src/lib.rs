//! Tracing subscriber setup.
//!
//! Libraries in this workspace only emit `tracing` events. Binaries call
//! [`init`] once at startup with the configured [`LogConfig`]; nothing is
//! installed implicitly.

use mlops_config::{LogConfig, LogFormat};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
  #[error("invalid log filter `{directive}`: {source}")]
  InvalidFilter {
    directive: String,
    #[source]
    source: tracing_subscriber::filter::ParseError,
  },

  #[error("a global tracing subscriber is already installed")]
  AlreadyInitialized,
}

/// Build the filter for `config`. `RUST_LOG` wins over the configured level.
pub fn filter(config: &LogConfig) -> Result<EnvFilter, LogError> {
  if let Ok(filter) = EnvFilter::try_from_default_env() {
    return Ok(filter);
  }
  EnvFilter::try_new(&config.level).map_err(|source| LogError::InvalidFilter {
    directive: config.level.clone(),
    source,
  })
}

/// Install the process-wide subscriber. Log output goes to stderr so command
/// output on stdout stays machine readable.
pub fn init(config: &LogConfig) -> Result<(), LogError> {
  let filter = filter(config)?;
  let registry = tracing_subscriber::registry().with(filter);

  let result = match config.format {
    LogFormat::Pretty => registry
      .with(
        tracing_subscriber::fmt::layer()
          .pretty()
          .with_writer(std::io::stderr),
      )
      .try_init(),
    LogFormat::Compact => registry
      .with(
        tracing_subscriber::fmt::layer()
          .compact()
          .with_writer(std::io::stderr),
      )
      .try_init(),
    LogFormat::Json => registry
      .with(
        tracing_subscriber::fmt::layer()
          .json()
          .with_writer(std::io::stderr),
      )
      .try_init(),
  };

  result.map_err(|_| LogError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_invalid_level_rejected() {
    // Only meaningful when RUST_LOG is not overriding the configured level.
    if std::env::var_os("RUST_LOG").is_some() {
      return;
    }
    let config = LogConfig {
      level: "mlops=notalevel".to_string(),
      format: LogFormat::Compact,
    };
    assert!(matches!(
      filter(&config),
      Err(LogError::InvalidFilter { .. })
    ));
  }

  #[test]
  fn test_second_init_fails() {
    let config = LogConfig::default();
    let first = init(&config);
    let second = init(&config);
    // Another test in this binary may have won the race for the global slot.
    assert!(first.is_ok() || matches!(first, Err(LogError::AlreadyInitialized)));
    assert!(matches!(second, Err(LogError::AlreadyInitialized)));
  }
}
