use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::service::{Connector, ServiceError, Session, Status};

/// Filesystem-backed object storage.
///
/// Each bucket is a directory under the root and each object is stored at
/// `{root}/{bucket}/{key}`. Parent directories are created on write. Keys must
/// be relative and may not contain `.`, `..` or empty segments.
#[derive(Debug, Clone)]
pub struct FsConnector {
  root: PathBuf,
}

impl FsConnector {
  /// Create a connector rooted at `root`.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }
}

#[async_trait]
impl Connector for FsConnector {
  type Session = FsSession;

  async fn connect(
    &self,
    _project_id: &str,
    bucket_id: &str,
  ) -> Result<Self::Session, ServiceError> {
    check_segment(bucket_id)
      .map_err(|reason| ServiceError::new(Status::InvalidArgument, reason))?;

    Ok(FsSession {
      bucket_path: self.root.join(bucket_id),
    })
  }
}

/// Session over one bucket directory.
#[derive(Debug)]
pub struct FsSession {
  bucket_path: PathBuf,
}

impl FsSession {
  fn key_to_path(&self, key: &str) -> Result<PathBuf, ServiceError> {
    if key.starts_with('/') {
      return Err(ServiceError::new(
        Status::InvalidArgument,
        format!("key {} must be relative", key),
      ));
    }

    let mut path = self.bucket_path.clone();
    for segment in key.split('/') {
      check_segment(segment).map_err(|reason| {
        ServiceError::new(Status::InvalidArgument, format!("key {}: {}", key, reason))
      })?;
      path.push(segment);
    }
    Ok(path)
  }
}

fn check_segment(segment: &str) -> Result<(), String> {
  if segment.is_empty() {
    return Err("empty path segment".to_string());
  }
  let mut components = Path::new(segment).components();
  match (components.next(), components.next()) {
    (Some(Component::Normal(_)), None) => Ok(()),
    _ => Err(format!("segment {:?} is not a plain name", segment)),
  }
}

fn io_error(key: &str, status: Status, e: io::Error) -> ServiceError {
  ServiceError::new(status, format!("{}: {}", key, e)).with_source(e)
}

fn common_status(e: &io::Error) -> Status {
  match e.kind() {
    io::ErrorKind::NotFound => Status::NotFound,
    io::ErrorKind::PermissionDenied => Status::PermissionDenied,
    _ => Status::Other,
  }
}

// An object and a directory cannot share a name on disk, so a key that runs
// through an existing object, or that names a directory of other objects,
// cannot be written here.
fn layout_conflict(key: &str, e: io::Error) -> ServiceError {
  match e.kind() {
    io::ErrorKind::AlreadyExists | io::ErrorKind::NotADirectory | io::ErrorKind::IsADirectory => {
      ServiceError::new(
        Status::InvalidArgument,
        format!("{}: conflicts with an object or prefix already in the bucket", key),
      )
      .with_source(e)
    }
    _ => {
      let status = common_status(&e);
      io_error(key, status, e)
    }
  }
}

async fn is_dir(path: &Path) -> bool {
  fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

// Reads and deletes treat "a parent is an object" and "the key is a
// directory" the same as a missing object.
async fn lookup_error(key: &str, path: &Path, e: io::Error) -> ServiceError {
  let missing = matches!(
    e.kind(),
    io::ErrorKind::NotFound | io::ErrorKind::NotADirectory | io::ErrorKind::IsADirectory
  ) || is_dir(path).await;

  if missing {
    io_error(key, Status::NotFound, e)
  } else {
    let status = common_status(&e);
    io_error(key, status, e)
  }
}

async fn write_file(path: &Path, data: &[u8]) -> io::Result<()> {
  let mut file = File::create(path).await?;
  file.write_all(data).await?;
  file.sync_all().await
}

#[async_trait]
impl Session for FsSession {
  async fn create_object(
    &self,
    key: &str,
    data: Bytes,
    if_absent: bool,
  ) -> Result<(), ServiceError> {
    let path = self.key_to_path(key)?;

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)
        .await
        .map_err(|e| layout_conflict(key, e))?;
    }

    if !if_absent {
      return write_file(&path, &data)
        .await
        .map_err(|e| layout_conflict(key, e));
    }

    // Write the full contents under a private name, then hard-link it into
    // place. Linking fails if the target exists, so readers never observe a
    // partial object and an existing one is never replaced.
    let staging = path.with_file_name(format!(".{}.tmp", uuid::Uuid::new_v4()));
    if let Err(e) = write_file(&staging, &data).await {
      let _ = fs::remove_file(&staging).await;
      let status = common_status(&e);
      return Err(io_error(key, status, e));
    }
    let linked = fs::hard_link(&staging, &path).await;
    let _ = fs::remove_file(&staging).await;

    match linked {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
        if is_dir(&path).await {
          Err(layout_conflict(key, e))
        } else {
          Err(io_error(key, Status::PreconditionFailed, e))
        }
      }
      Err(e) => Err(layout_conflict(key, e)),
    }
  }

  async fn read_object(&self, key: &str) -> Result<Bytes, ServiceError> {
    let path = self.key_to_path(key)?;
    match fs::read(&path).await {
      Ok(data) => Ok(Bytes::from(data)),
      Err(e) => Err(lookup_error(key, &path, e).await),
    }
  }

  async fn delete_object(&self, key: &str) -> Result<(), ServiceError> {
    let path = self.key_to_path(key)?;
    match fs::remove_file(&path).await {
      Ok(()) => Ok(()),
      Err(e) => Err(lookup_error(key, &path, e).await),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  async fn session(root: &Path) -> FsSession {
    FsConnector::new(root).connect("p", "bucket").await.unwrap()
  }

  #[tokio::test]
  async fn test_create_writes_under_bucket_dir() {
    let dir = tempfile::tempdir().unwrap();
    let session = session(dir.path()).await;

    session
      .create_object("people/ada.txt", Bytes::from_static(b"Ada Lovelace"), true)
      .await
      .unwrap();

    let on_disk = std::fs::read(dir.path().join("bucket/people/ada.txt")).unwrap();
    assert_eq!(on_disk, b"Ada Lovelace");
  }

  #[tokio::test]
  async fn test_create_if_absent_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let session = session(dir.path()).await;

    session
      .create_object("a", Bytes::from_static(b"one"), true)
      .await
      .unwrap();
    let err = session
      .create_object("a", Bytes::from_static(b"two"), true)
      .await
      .unwrap_err();

    assert_eq!(err.status(), Status::PreconditionFailed);
    assert_eq!(session.read_object("a").await.unwrap(), Bytes::from_static(b"one"));
  }

  #[tokio::test]
  async fn test_no_staging_files_left_behind() {
    let dir = tempfile::tempdir().unwrap();
    let session = session(dir.path()).await;

    session
      .create_object("a", Bytes::from_static(b"one"), true)
      .await
      .unwrap();
    let _ = session
      .create_object("a", Bytes::from_static(b"two"), true)
      .await;

    let names: Vec<_> = std::fs::read_dir(dir.path().join("bucket"))
      .unwrap()
      .map(|e| e.unwrap().file_name())
      .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("a")]);
  }

  #[tokio::test]
  async fn test_missing_objects_are_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let session = session(dir.path()).await;

    assert_eq!(
      session.read_object("nope").await.unwrap_err().status(),
      Status::NotFound
    );
    assert_eq!(
      session.delete_object("nope").await.unwrap_err().status(),
      Status::NotFound
    );
  }

  #[tokio::test]
  async fn test_rejects_keys_outside_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let session = session(dir.path()).await;

    for key in ["../escape", "/abs", "a//b", "a/./b", "a/"] {
      let err = session
        .create_object(key, Bytes::from_static(b"x"), true)
        .await
        .unwrap_err();
      assert_eq!(err.status(), Status::InvalidArgument, "key {key}");
    }
    assert!(!dir.path().join("escape").exists());
  }

  #[tokio::test]
  async fn test_rejects_bad_bucket_names() {
    let dir = tempfile::tempdir().unwrap();
    let err = FsConnector::new(dir.path())
      .connect("p", "..")
      .await
      .unwrap_err();
    assert_eq!(err.status(), Status::InvalidArgument);
  }

  #[tokio::test]
  async fn test_concurrent_creates_have_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let connector = FsConnector::new(dir.path());
    let mut handles = Vec::new();

    for i in 0..8u8 {
      let connector = connector.clone();
      handles.push(tokio::spawn(async move {
        let session = connector.connect("p", "bucket").await.unwrap();
        session
          .create_object("contended", Bytes::from(vec![i; 1024]), true)
          .await
      }));
    }

    let mut successes = 0;
    for handle in handles {
      if handle.await.unwrap().is_ok() {
        successes += 1;
      }
    }
    assert_eq!(successes, 1);
  }

  #[tokio::test]
  async fn test_nested_keys_never_report_existing_object() {
    let dir = tempfile::tempdir().unwrap();
    let session = session(dir.path()).await;

    session
      .create_object("people/ada.txt", Bytes::from_static(b"Ada Lovelace"), true)
      .await
      .unwrap();

    // Nothing lives at these keys; the on-disk layout just cannot hold them.
    for key in ["people/ada.txt/v2", "people"] {
      let err = session
        .create_object(key, Bytes::from_static(b"x"), true)
        .await
        .unwrap_err();
      assert_eq!(err.status(), Status::InvalidArgument, "key {key}");
    }

    // The same goes for overwriting writes.
    let err = session
      .create_object("people", Bytes::from_static(b"x"), false)
      .await
      .unwrap_err();
    assert_eq!(err.status(), Status::InvalidArgument);

    for key in ["people/ada.txt/v2", "people/ada.txt/v2/deeper", "people"] {
      assert_eq!(
        session.read_object(key).await.unwrap_err().status(),
        Status::NotFound,
        "read {key}"
      );
      assert_eq!(
        session.delete_object(key).await.unwrap_err().status(),
        Status::NotFound,
        "delete {key}"
      );
    }

    assert_eq!(
      session.read_object("people/ada.txt").await.unwrap(),
      Bytes::from_static(b"Ada Lovelace")
    );
  }
}
