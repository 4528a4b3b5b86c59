//! mlops Artifact
//!
//! This crate provides a client for storing pipeline artifacts (model
//! checkpoints, datasets, reports) as byte blobs in an object store bucket.
//!
//! [`ArtifactClient`] exposes three operations:
//! - [`store`](ArtifactClient::store) creates a new object and never
//!   overwrites an existing one,
//! - [`fetch`](ArtifactClient::fetch) downloads an object to a local file,
//! - [`delete`](ArtifactClient::delete) removes an object.
//!
//! The storage service sits behind the [`Connector`] / [`Session`] port.
//! Backends: [`GcsConnector`] (feature `gcs`), [`FsConnector`] and
//! [`MemoryConnector`]. Backend failures arrive as a [`ServiceError`] with a
//! [`Status`]; the client maps statuses to [`Error`] kinds.
//!
//! Artifacts from a pipeline run are conventionally stored under
//! `{flow_name}/{run_id}/{file_name}`; see [`run_scoped_path`] and
//! [`RunContext`].

mod blocking;
mod client;
mod error;
mod fs;
#[cfg(feature = "gcs")]
mod gcs;
mod memory;
mod path;
mod service;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use blocking::BlockingArtifactClient;
pub use client::ArtifactClient;
pub use error::Error;
pub use fs::{FsConnector, FsSession};
#[cfg(feature = "gcs")]
pub use gcs::{GcsConnector, GcsSession};
pub use memory::{MemoryConnector, MemorySession};
pub use path::{RunContext, run_scoped_path};
pub use service::{Connector, ServiceError, Session, Status};
