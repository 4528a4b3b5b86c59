//! The object storage service port.
//!
//! A [`Connector`] opens one short-lived [`Session`] per client operation.
//! Sessions are dropped when the operation returns, whether it succeeded or
//! not, so no connection state outlives a call.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;

/// Outcome signal reported by a storage backend.
///
/// Every backend maps its native failure signal (HTTP status, `io::ErrorKind`,
/// SDK error variant) onto exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
  /// No object exists at the requested key.
  NotFound,
  /// A conditional request's precondition did not hold. For create-if-absent
  /// writes this means an object already exists at the key.
  PreconditionFailed,
  /// The caller is authenticated but not allowed to perform the operation.
  PermissionDenied,
  /// No usable credentials were found.
  Unauthenticated,
  /// The backend rejected the request itself (malformed key, bad bucket name).
  InvalidArgument,
  /// Anything else.
  Other,
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Self::NotFound => "not found",
      Self::PreconditionFailed => "precondition failed",
      Self::PermissionDenied => "permission denied",
      Self::Unauthenticated => "unauthenticated",
      Self::InvalidArgument => "invalid argument",
      Self::Other => "backend failure",
    };
    f.write_str(s)
  }
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error reported by a storage backend.
#[derive(Debug, thiserror::Error)]
#[error("{status}: {message}")]
pub struct ServiceError {
  status: Status,
  message: String,
  #[source]
  source: Option<BoxError>,
}

impl ServiceError {
  pub fn new(status: Status, message: impl Into<String>) -> Self {
    Self {
      status,
      message: message.into(),
      source: None,
    }
  }

  /// Attach the backend's native error.
  pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
    self.source = Some(source.into());
    self
  }

  pub fn status(&self) -> Status {
    self.status
  }

  pub fn message(&self) -> &str {
    &self.message
  }
}

/// Opens sessions against one storage service.
#[async_trait]
pub trait Connector: Send + Sync {
  type Session: Session;

  /// Open a session scoped to `bucket_id` within `project_id`.
  async fn connect(
    &self,
    project_id: &str,
    bucket_id: &str,
  ) -> Result<Self::Session, ServiceError>;
}

/// A single open session against a bucket.
#[async_trait]
pub trait Session: Send + Sync {
  /// Create an object at `path`.
  ///
  /// With `if_absent` set the write must be atomic and fail with
  /// [`Status::PreconditionFailed`] when an object already exists.
  async fn create_object(
    &self,
    path: &str,
    data: Bytes,
    if_absent: bool,
  ) -> Result<(), ServiceError>;

  /// Read the full contents of the object at `path`.
  async fn read_object(&self, path: &str) -> Result<Bytes, ServiceError>;

  /// Remove the object at `path`.
  async fn delete_object(&self, path: &str) -> Result<(), ServiceError>;
}
