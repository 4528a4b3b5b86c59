//! Artifact client errors.

use std::path::PathBuf;

use crate::service::{ServiceError, Status};

/// Errors returned by [`ArtifactClient`](crate::ArtifactClient) operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// `store` found an object already present at the target path.
  #[error(
    "an object already exists at `{path}` in bucket `{bucket}`; \
     store never overwrites existing objects, so pick a new path or delete the existing object first"
  )]
  AlreadyExists { bucket: String, path: String },

  /// No object exists at the requested path.
  #[error("no object found at `{path}` in bucket `{bucket}`")]
  NotFound { bucket: String, path: String },

  /// Any other failure from the storage service. The service error is
  /// rendered inline rather than exposed as the error source.
  #[error("storage backend error: {0}")]
  Backend(ServiceError),

  /// The storage path was rejected before contacting the service.
  #[error("invalid storage path: {0}")]
  InvalidPath(String),

  /// The client was constructed with unusable settings.
  #[error("invalid configuration: {0}")]
  Config(String),

  /// Writing the fetched object to the local filesystem failed.
  #[error("local io error at {}: {source}", path.display())]
  LocalIo {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The blocking client could not start its runtime.
  #[error("failed to start runtime: {0}")]
  Runtime(#[source] std::io::Error),
}

/// Which client operation a service error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
  Connect,
  Store,
  Fetch,
  Delete,
}

impl Error {
  /// Translate a backend status into the client's error kinds.
  ///
  /// `PreconditionFailed` only means "already exists" for the create-if-absent
  /// write issued by `store`; `NotFound` only means a missing object for reads
  /// and deletes. Everything else passes through as [`Error::Backend`].
  pub(crate) fn from_service(op: Operation, bucket: &str, path: &str, err: ServiceError) -> Self {
    match (op, err.status()) {
      (Operation::Store, Status::PreconditionFailed) => Self::AlreadyExists {
        bucket: bucket.to_string(),
        path: path.to_string(),
      },
      (Operation::Fetch | Operation::Delete, Status::NotFound) => Self::NotFound {
        bucket: bucket.to_string(),
        path: path.to_string(),
      },
      _ => Self::Backend(err),
    }
  }

  pub fn is_already_exists(&self) -> bool {
    matches!(self, Self::AlreadyExists { .. })
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound { .. })
  }
}
