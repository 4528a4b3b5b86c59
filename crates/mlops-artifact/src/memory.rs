use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;

use crate::service::{Connector, ServiceError, Session, Status};

type Buckets = HashMap<String, HashMap<String, Bytes>>;

/// In-process object storage.
///
/// Clones share the same buckets, so several clients built from clones of one
/// connector see each other's objects. Buckets spring into existence on first
/// use.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
  buckets: Arc<Mutex<Buckets>>,
}

impl MemoryConnector {
  pub fn new() -> Self {
    Self::default()
  }

  /// Read an object directly, bypassing the session API.
  pub fn get(&self, bucket_id: &str, path: &str) -> Option<Bytes> {
    lock(&self.buckets).get(bucket_id)?.get(path).cloned()
  }

  /// Number of objects currently held in `bucket_id`.
  pub fn len(&self, bucket_id: &str) -> usize {
    lock(&self.buckets).get(bucket_id).map_or(0, HashMap::len)
  }

  pub fn is_empty(&self, bucket_id: &str) -> bool {
    self.len(bucket_id) == 0
  }
}

#[async_trait]
impl Connector for MemoryConnector {
  type Session = MemorySession;

  async fn connect(
    &self,
    _project_id: &str,
    bucket_id: &str,
  ) -> Result<Self::Session, ServiceError> {
    Ok(MemorySession {
      bucket_id: bucket_id.to_string(),
      buckets: Arc::clone(&self.buckets),
    })
  }
}

/// Session over a [`MemoryConnector`] bucket.
#[derive(Debug)]
pub struct MemorySession {
  bucket_id: String,
  buckets: Arc<Mutex<Buckets>>,
}

// A poisoned lock only means another test thread panicked mid-call; the map
// itself is never left half-updated.
fn lock(buckets: &Mutex<Buckets>) -> MutexGuard<'_, Buckets> {
  buckets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Session for MemorySession {
  async fn create_object(
    &self,
    path: &str,
    data: Bytes,
    if_absent: bool,
  ) -> Result<(), ServiceError> {
    let mut buckets = lock(&self.buckets);
    let bucket = buckets.entry(self.bucket_id.clone()).or_default();

    if if_absent && bucket.contains_key(path) {
      return Err(ServiceError::new(
        Status::PreconditionFailed,
        format!("object {} already exists", path),
      ));
    }

    bucket.insert(path.to_string(), data);
    Ok(())
  }

  async fn read_object(&self, path: &str) -> Result<Bytes, ServiceError> {
    lock(&self.buckets)
      .get(&self.bucket_id)
      .and_then(|bucket| bucket.get(path))
      .cloned()
      .ok_or_else(|| ServiceError::new(Status::NotFound, format!("no such object: {}", path)))
  }

  async fn delete_object(&self, path: &str) -> Result<(), ServiceError> {
    lock(&self.buckets)
      .get_mut(&self.bucket_id)
      .and_then(|bucket| bucket.remove(path))
      .map(|_| ())
      .ok_or_else(|| ServiceError::new(Status::NotFound, format!("no such object: {}", path)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_memory_session_crud() {
    let connector = MemoryConnector::new();
    let session = connector.connect("p", "b").await.unwrap();

    session
      .create_object("k", Bytes::from_static(b"v1"), true)
      .await
      .unwrap();
    assert_eq!(session.read_object("k").await.unwrap(), Bytes::from_static(b"v1"));

    let err = session
      .create_object("k", Bytes::from_static(b"v2"), true)
      .await
      .unwrap_err();
    assert_eq!(err.status(), Status::PreconditionFailed);

    session
      .create_object("k", Bytes::from_static(b"v3"), false)
      .await
      .unwrap();
    assert_eq!(connector.get("b", "k"), Some(Bytes::from_static(b"v3")));

    session.delete_object("k").await.unwrap();
    let err = session.delete_object("k").await.unwrap_err();
    assert_eq!(err.status(), Status::NotFound);
    assert!(connector.is_empty("b"));
  }

  #[tokio::test]
  async fn test_buckets_are_isolated() {
    let connector = MemoryConnector::new();
    let a = connector.connect("p", "a").await.unwrap();
    let b = connector.connect("p", "b").await.unwrap();

    a.create_object("k", Bytes::from_static(b"x"), true)
      .await
      .unwrap();
    let err = b.read_object("k").await.unwrap_err();
    assert_eq!(err.status(), Status::NotFound);
  }

  #[tokio::test]
  async fn test_concurrent_creates_have_one_winner() {
    let connector = MemoryConnector::new();
    let mut handles = Vec::new();

    for i in 0..16u8 {
      let connector = connector.clone();
      handles.push(tokio::spawn(async move {
        let session = connector.connect("p", "b").await.unwrap();
        session
          .create_object("contended", Bytes::from(vec![i]), true)
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
    assert_eq!(connector.len("b"), 1);
  }
}
