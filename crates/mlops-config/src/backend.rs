use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which object storage service the client talks to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
  /// Google Cloud Storage with ambient credentials.
  #[default]
  Gcs,
  /// Buckets are directories under `root`.
  Filesystem { root: PathBuf },
}
