//! Run-scoped storage paths.
//!
//! Artifacts produced by a pipeline run are namespaced as
//! `{flow_name}/{run_id}/{file_name}` so that runs never collide. The layout
//! is a convention only; [`ArtifactClient`](crate::ArtifactClient) accepts any
//! key.

use std::path::{Component, Path, PathBuf};

use crate::error::Error;

/// Assemble the storage key for `file_name` produced by a run of `flow_name`.
pub fn run_scoped_path(flow_name: &str, run_id: &str, file_name: &str) -> String {
  format!("{}/{}/{}", flow_name, run_id, file_name)
}

/// Identity of the pipeline run that produced a set of artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunContext {
  pub flow_name: String,
  pub run_id: String,
}

impl RunContext {
  pub fn new(flow_name: impl Into<String>, run_id: impl Into<String>) -> Self {
    Self {
      flow_name: flow_name.into(),
      run_id: run_id.into(),
    }
  }

  /// Storage key for `file_name` within this run.
  pub fn artifact_path(&self, file_name: &str) -> String {
    run_scoped_path(&self.flow_name, &self.run_id, file_name)
  }

  /// Local mirror of [`artifact_path`](Self::artifact_path) under `root`.
  ///
  /// Every part must be a relative path made of plain names, so the result
  /// always stays inside `root`.
  pub fn local_path(&self, root: &Path, file_name: &str) -> Result<PathBuf, Error> {
    let mut path = root.to_path_buf();
    for (what, part) in [
      ("flow name", self.flow_name.as_str()),
      ("run id", self.run_id.as_str()),
      ("file name", file_name),
    ] {
      check_relative(what, part)?;
      path.push(part);
    }
    Ok(path)
  }
}

fn check_relative(what: &str, part: &str) -> Result<(), Error> {
  let plain = !part.is_empty()
    && Path::new(part)
      .components()
      .all(|c| matches!(c, Component::Normal(_)));
  if plain {
    Ok(())
  } else {
    Err(Error::InvalidPath(format!(
      "{} {:?} must be a relative path of plain names",
      what, part
    )))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_run_scoped_path() {
    assert_eq!(
      run_scoped_path("TrainFlow", "1742", "model.pt"),
      "TrainFlow/1742/model.pt"
    );
  }

  #[test]
  fn test_run_scoped_path_keeps_nested_file_names() {
    assert_eq!(
      run_scoped_path("TrainFlow", "1742", "checkpoints/epoch-3.pt"),
      "TrainFlow/1742/checkpoints/epoch-3.pt"
    );
  }

  #[test]
  fn test_run_context_paths_agree() {
    let run = RunContext::new("TrainFlow", "1742");
    assert_eq!(run.artifact_path("model.pt"), "TrainFlow/1742/model.pt");
    assert_eq!(
      run.local_path(Path::new("/tmp/out"), "model.pt").unwrap(),
      PathBuf::from("/tmp/out/TrainFlow/1742/model.pt")
    );
    assert_eq!(
      run
        .local_path(Path::new("/tmp/out"), "checkpoints/epoch-3.pt")
        .unwrap(),
      PathBuf::from("/tmp/out/TrainFlow/1742/checkpoints/epoch-3.pt")
    );
  }

  #[test]
  fn test_local_path_stays_under_root() {
    let root = Path::new("/tmp/out");
    let cases = [
      RunContext::new("Flow", "/etc").local_path(root, "x"),
      RunContext::new("/abs", "1").local_path(root, "x"),
      RunContext::new("Flow", "..").local_path(root, "x"),
      RunContext::new("Flow", "1").local_path(root, "../../escape"),
      RunContext::new("Flow", "1").local_path(root, "/etc/passwd"),
      RunContext::new("Flow", "1").local_path(root, "a/../../b"),
      RunContext::new("", "1").local_path(root, "x"),
    ];
    for result in cases {
      assert!(matches!(result, Err(Error::InvalidPath(_))), "got {result:?}");
    }
  }
}
