//! The artifact client.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs;
use tracing::{debug, error, info, instrument};

use crate::error::{Error, Operation};
use crate::path::RunContext;
use crate::service::{Connector, Session};

/// Stores, fetches and deletes blobs in one bucket.
///
/// The client holds only its `(project, bucket)` identity and a connector.
/// Every operation opens its own session, issues a single request and drops
/// the session before returning. Consistency guarantees, in particular the
/// create-if-absent check behind [`store`](Self::store), are enforced by the
/// storage service, so any number of clients may share a bucket.
#[derive(Debug, Clone)]
pub struct ArtifactClient<C> {
  project_id: String,
  bucket_id: String,
  connector: C,
}

impl<C: Connector> ArtifactClient<C> {
  /// Create a client for `bucket_id` within `project_id`.
  ///
  /// Performs no I/O. Fails with [`Error::Config`] when either identifier is
  /// empty.
  pub fn new(
    project_id: impl Into<String>,
    bucket_id: impl Into<String>,
    connector: C,
  ) -> Result<Self, Error> {
    let project_id = project_id.into();
    let bucket_id = bucket_id.into();

    if project_id.trim().is_empty() {
      return Err(Error::Config("project id must not be empty".to_string()));
    }
    if bucket_id.trim().is_empty() {
      return Err(Error::Config("bucket id must not be empty".to_string()));
    }

    Ok(Self {
      project_id,
      bucket_id,
      connector,
    })
  }

  pub fn project_id(&self) -> &str {
    &self.project_id
  }

  pub fn bucket_id(&self) -> &str {
    &self.bucket_id
  }

  pub fn connector(&self) -> &C {
    &self.connector
  }

  /// Write `data` to a new object at `storage_path` and return the path.
  ///
  /// Never overwrites: if an object already exists at `storage_path` the call
  /// fails with [`Error::AlreadyExists`] and the existing object is left as
  /// it was.
  #[instrument(
    name = "artifact_store",
    skip(self, data),
    fields(project = %self.project_id, bucket = %self.bucket_id, path = %storage_path)
  )]
  pub async fn store(&self, data: impl Into<Bytes>, storage_path: &str) -> Result<String, Error> {
    let data = data.into();
    let size = data.len();
    check_path(storage_path)?;

    let result = async {
      let session = self.session(storage_path).await?;
      session
        .create_object(storage_path, data, true)
        .await
        .map_err(|e| Error::from_service(Operation::Store, &self.bucket_id, storage_path, e))
    }
    .await;

    match result {
      Ok(()) => {
        info!(bytes = size, "artifact stored");
        Ok(storage_path.to_string())
      }
      Err(e) => {
        error!(error = %e, "artifact store failed");
        Err(e)
      }
    }
  }

  /// Download the object at `remote_path` into `local_destination`.
  ///
  /// Missing parent directories of `local_destination` are created and an
  /// existing file there is overwritten. The object is read in full before
  /// anything touches the local filesystem, so a missing object leaves no
  /// local file behind.
  #[instrument(
    name = "artifact_fetch",
    skip(self, local_destination),
    fields(
      project = %self.project_id,
      bucket = %self.bucket_id,
      path = %remote_path,
      local = %local_destination.as_ref().display(),
    )
  )]
  pub async fn fetch(
    &self,
    remote_path: &str,
    local_destination: impl AsRef<Path>,
  ) -> Result<(), Error> {
    check_path(remote_path)?;
    let local = local_destination.as_ref();

    let result = async {
      let data = {
        let session = self.session(remote_path).await?;
        session
          .read_object(remote_path)
          .await
          .map_err(|e| Error::from_service(Operation::Fetch, &self.bucket_id, remote_path, e))?
      };
      write_local(local, &data).await?;
      Ok::<_, Error>(data.len())
    }
    .await;

    match result {
      Ok(size) => {
        info!(bytes = size, "artifact fetched");
        Ok(())
      }
      Err(e) => {
        error!(error = %e, "artifact fetch failed");
        Err(e)
      }
    }
  }

  /// Remove the object at `remote_path`.
  #[instrument(
    name = "artifact_delete",
    skip(self),
    fields(project = %self.project_id, bucket = %self.bucket_id, path = %remote_path)
  )]
  pub async fn delete(&self, remote_path: &str) -> Result<(), Error> {
    check_path(remote_path)?;

    let result = async {
      let session = self.session(remote_path).await?;
      session
        .delete_object(remote_path)
        .await
        .map_err(|e| Error::from_service(Operation::Delete, &self.bucket_id, remote_path, e))
    }
    .await;

    match &result {
      Ok(()) => info!("artifact deleted"),
      Err(e) => error!(error = %e, "artifact delete failed"),
    }

    result
  }

  /// Store `data` under the run-scoped path for `file_name` and return it.
  pub async fn store_run_artifact(
    &self,
    run: &RunContext,
    file_name: &str,
    data: impl Into<Bytes>,
  ) -> Result<String, Error> {
    let path = run.artifact_path(file_name);
    self.store(data, &path).await
  }

  /// Fetch a run-scoped artifact into `local_root/{flow}/{run}/{file_name}`.
  ///
  /// Returns the local path written.
  pub async fn fetch_run_artifact(
    &self,
    run: &RunContext,
    file_name: &str,
    local_root: impl AsRef<Path>,
  ) -> Result<PathBuf, Error> {
    let remote = run.artifact_path(file_name);
    let local = run.local_path(local_root.as_ref(), file_name)?;
    self.fetch(&remote, &local).await?;
    Ok(local)
  }

  async fn session(&self, path: &str) -> Result<C::Session, Error> {
    debug!("opening storage session");
    self
      .connector
      .connect(&self.project_id, &self.bucket_id)
      .await
      .map_err(|e| Error::from_service(Operation::Connect, &self.bucket_id, path, e))
  }
}

fn check_path(path: &str) -> Result<(), Error> {
  if path.is_empty() {
    return Err(Error::InvalidPath("storage path must not be empty".to_string()));
  }
  Ok(())
}

async fn write_local(path: &Path, data: &[u8]) -> Result<(), Error> {
  let local_io = |source| Error::LocalIo {
    path: path.to_path_buf(),
    source,
  };

  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent).await.map_err(local_io)?;
  }
  fs::write(path, data).await.map_err(local_io)
}
