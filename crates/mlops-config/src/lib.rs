//! mlops Config
//!
//! Serializable settings for the artifact store client and its binaries.
//! Configuration is loaded from a JSON file and then adjusted by command line
//! overrides before it is validated:
//!
//! ```json
//! {
//!   "project_id": "mozdata",
//!   "bucket_id": "mozdata-tmp",
//!   "backend": { "type": "filesystem", "root": "/var/lib/mlops" },
//!   "log": { "level": "debug", "format": "json" }
//! }
//! ```
//!
//! `backend` defaults to Google Cloud Storage and `log` to `info`-level
//! compact output.

mod backend;
mod config;
mod error;
mod log;

pub use backend::BackendConfig;
pub use config::{Config, Overrides};
pub use error::ConfigError;
pub use log::{LogConfig, LogFormat};
