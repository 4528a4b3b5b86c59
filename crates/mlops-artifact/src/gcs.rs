//! Google Cloud Storage backend.
//!
//! Credentials come from the ambient environment: `GOOGLE_SERVICE_ACCOUNT`,
//! `GOOGLE_APPLICATION_CREDENTIALS`, or the metadata server when running on
//! GCP. Create-if-absent writes are issued with `ifGenerationMatch=0`.

use async_trait::async_trait;
use bytes::Bytes;
use object_store::gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutMode, PutPayload};
use tracing::debug;

use crate::service::{Connector, ServiceError, Session, Status};

/// Opens a fresh GCS client per session.
#[derive(Debug, Clone, Copy, Default)]
pub struct GcsConnector;

impl GcsConnector {
  pub fn new() -> Self {
    Self
  }
}

#[async_trait]
impl Connector for GcsConnector {
  type Session = GcsSession;

  async fn connect(
    &self,
    project_id: &str,
    bucket_id: &str,
  ) -> Result<Self::Session, ServiceError> {
    debug!(project = %project_id, bucket = %bucket_id, "building gcs client");

    let store = GoogleCloudStorageBuilder::from_env()
      .with_bucket_name(bucket_id)
      .build()
      .map_err(map_error)?;

    Ok(GcsSession { store })
  }
}

/// Session over one GCS bucket.
#[derive(Debug)]
pub struct GcsSession {
  store: GoogleCloudStorage,
}

fn object_path(key: &str) -> Result<ObjectPath, ServiceError> {
  ObjectPath::parse(key).map_err(|e| {
    ServiceError::new(Status::InvalidArgument, format!("invalid key {}: {}", key, e)).with_source(e)
  })
}

fn map_error(e: object_store::Error) -> ServiceError {
  use object_store::Error as E;

  let status = match &e {
    E::NotFound { .. } => Status::NotFound,
    E::AlreadyExists { .. } | E::Precondition { .. } => Status::PreconditionFailed,
    E::InvalidPath { .. } => Status::InvalidArgument,
    E::PermissionDenied { .. } => Status::PermissionDenied,
    E::Unauthenticated { .. } => Status::Unauthenticated,
    _ => Status::Other,
  };
  ServiceError::new(status, e.to_string()).with_source(e)
}

#[async_trait]
impl Session for GcsSession {
  async fn create_object(
    &self,
    key: &str,
    data: Bytes,
    if_absent: bool,
  ) -> Result<(), ServiceError> {
    let location = object_path(key)?;
    let mode = if if_absent {
      PutMode::Create
    } else {
      PutMode::Overwrite
    };

    self
      .store
      .put_opts(&location, PutPayload::from(data), mode.into())
      .await
      .map(|_| ())
      .map_err(map_error)
  }

  async fn read_object(&self, key: &str) -> Result<Bytes, ServiceError> {
    let location = object_path(key)?;
    let result = self.store.get(&location).await.map_err(map_error)?;
    result.bytes().await.map_err(map_error)
  }

  async fn delete_object(&self, key: &str) -> Result<(), ServiceError> {
    let location = object_path(key)?;
    self.store.delete(&location).await.map_err(map_error)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn status_of(e: object_store::Error) -> Status {
    map_error(e).status()
  }

  #[test]
  fn test_map_error_statuses() {
    use object_store::Error as E;

    assert_eq!(
      status_of(E::NotFound {
        path: "k".to_string(),
        source: "404".into(),
      }),
      Status::NotFound
    );
    assert_eq!(
      status_of(E::AlreadyExists {
        path: "k".to_string(),
        source: "412".into(),
      }),
      Status::PreconditionFailed
    );
    assert_eq!(
      status_of(E::Precondition {
        path: "k".to_string(),
        source: "412".into(),
      }),
      Status::PreconditionFailed
    );
    assert_eq!(
      status_of(E::PermissionDenied {
        path: "k".to_string(),
        source: "403".into(),
      }),
      Status::PermissionDenied
    );
    assert_eq!(
      status_of(E::Unauthenticated {
        path: "k".to_string(),
        source: "401".into(),
      }),
      Status::Unauthenticated
    );
    assert_eq!(
      status_of(E::Generic {
        store: "GCS",
        source: "connection reset".into(),
      }),
      Status::Other
    );
  }

  #[test]
  fn test_object_path_rejects_bad_keys() {
    assert!(object_path("people/ada.txt").is_ok());
    let err = object_path("a//b").unwrap_err();
    assert_eq!(err.status(), Status::InvalidArgument);
  }
}
