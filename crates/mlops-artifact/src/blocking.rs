//! Synchronous wrapper around [`ArtifactClient`].

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::runtime::{Builder, Runtime};

use crate::client::ArtifactClient;
use crate::error::Error;
use crate::path::RunContext;
use crate::service::Connector;

/// Blocking artifact client for callers without an async runtime.
///
/// Owns a current-thread runtime and drives each call to completion on it.
/// Calling any method from inside an async context panics, as with any
/// `block_on`.
pub struct BlockingArtifactClient<C> {
  inner: ArtifactClient<C>,
  rt: Runtime,
}

impl<C: Connector> BlockingArtifactClient<C> {
  pub fn new(
    project_id: impl Into<String>,
    bucket_id: impl Into<String>,
    connector: C,
  ) -> Result<Self, Error> {
    Self::from_async(ArtifactClient::new(project_id, bucket_id, connector)?)
  }

  /// Wrap an existing async client.
  pub fn from_async(inner: ArtifactClient<C>) -> Result<Self, Error> {
    let rt = Builder::new_current_thread()
      .enable_all()
      .build()
      .map_err(Error::Runtime)?;
    Ok(Self { inner, rt })
  }

  pub fn inner(&self) -> &ArtifactClient<C> {
    &self.inner
  }

  pub fn store(&self, data: impl Into<Bytes>, storage_path: &str) -> Result<String, Error> {
    self.rt.block_on(self.inner.store(data, storage_path))
  }

  pub fn fetch(&self, remote_path: &str, local_destination: impl AsRef<Path>) -> Result<(), Error> {
    self
      .rt
      .block_on(self.inner.fetch(remote_path, local_destination))
  }

  pub fn delete(&self, remote_path: &str) -> Result<(), Error> {
    self.rt.block_on(self.inner.delete(remote_path))
  }

  pub fn store_run_artifact(
    &self,
    run: &RunContext,
    file_name: &str,
    data: impl Into<Bytes>,
  ) -> Result<String, Error> {
    self
      .rt
      .block_on(self.inner.store_run_artifact(run, file_name, data))
  }

  pub fn fetch_run_artifact(
    &self,
    run: &RunContext,
    file_name: &str,
    local_root: impl AsRef<Path>,
  ) -> Result<PathBuf, Error> {
    self
      .rt
      .block_on(self.inner.fetch_run_artifact(run, file_name, local_root))
  }
}
