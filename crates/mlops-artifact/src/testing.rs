//! Test fixtures. Only compiled for this crate's tests or with the
//! `test-util` feature.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::client::ArtifactClient;
use crate::error::Error;
use crate::service::{Connector, ServiceError, Session, Status};

/// A backend that answers every request with a fixed status.
#[derive(Debug, Clone, Copy)]
pub struct StatusConnector {
  status: Status,
  fail_connect: bool,
}

impl StatusConnector {
  /// Sessions open fine, every object operation fails with `status`.
  pub fn new(status: Status) -> Self {
    Self {
      status,
      fail_connect: false,
    }
  }

  /// Opening the session itself fails with `status`.
  pub fn failing_connect(status: Status) -> Self {
    Self {
      status,
      fail_connect: true,
    }
  }
}

#[async_trait]
impl Connector for StatusConnector {
  type Session = StatusSession;

  async fn connect(
    &self,
    _project_id: &str,
    bucket_id: &str,
  ) -> Result<Self::Session, ServiceError> {
    if self.fail_connect {
      return Err(ServiceError::new(
        self.status,
        format!("injected connect failure for {}", bucket_id),
      ));
    }
    Ok(StatusSession {
      status: self.status,
    })
  }
}

#[derive(Debug)]
pub struct StatusSession {
  status: Status,
}

impl StatusSession {
  fn fail<T>(&self, op: &str, path: &str) -> Result<T, ServiceError> {
    Err(ServiceError::new(
      self.status,
      format!("injected {} failure for {}", op, path),
    ))
  }
}

#[async_trait]
impl Session for StatusSession {
  async fn create_object(
    &self,
    path: &str,
    _data: Bytes,
    _if_absent: bool,
  ) -> Result<(), ServiceError> {
    self.fail("create", path)
  }

  async fn read_object(&self, path: &str) -> Result<Bytes, ServiceError> {
    self.fail("read", path)
  }

  async fn delete_object(&self, path: &str) -> Result<(), ServiceError> {
    self.fail("delete", path)
  }
}

/// A client wrapper that remembers what it stored so tests can clean up.
pub struct ScratchClient<C> {
  client: ArtifactClient<C>,
  stored: Mutex<Vec<String>>,
}

impl<C: Connector> ScratchClient<C> {
  pub fn new(client: ArtifactClient<C>) -> Self {
    Self {
      client,
      stored: Mutex::new(Vec::new()),
    }
  }

  pub fn client(&self) -> &ArtifactClient<C> {
    &self.client
  }

  /// Store through the wrapped client and record the path on success.
  pub async fn store(&self, data: impl Into<Bytes>, storage_path: &str) -> Result<String, Error> {
    let path = self.client.store(data, storage_path).await?;
    self.tracked().push(path.clone());
    Ok(path)
  }

  pub async fn fetch(&self, remote_path: &str, local: impl AsRef<Path>) -> Result<(), Error> {
    self.client.fetch(remote_path, local).await
  }

  /// Test-only removal of an object, tracked or not.
  pub async fn remove_for_test(&self, remote_path: &str) -> Result<(), Error> {
    self.client.delete(remote_path).await?;
    self.tracked().retain(|p| p != remote_path);
    Ok(())
  }

  /// Paths stored through this wrapper and not yet removed.
  pub fn stored_paths(&self) -> Vec<String> {
    self.tracked().clone()
  }

  /// Delete every tracked object. Objects that are already gone are skipped.
  ///
  /// Returns how many objects were actually deleted.
  pub async fn cleanup(&self) -> Result<usize, Error> {
    let paths = std::mem::take(&mut *self.tracked());
    let mut removed = 0;
    for path in paths {
      match self.client.delete(&path).await {
        Ok(()) => removed += 1,
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
      }
    }
    Ok(removed)
  }

  fn tracked(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
    self
      .stored
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}
