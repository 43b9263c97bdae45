//! On-disk storage for dependency records.
//!
//! # Storage Layout
//!
//! ```text
//! {base_dir}/.cake/deps/
//! └── <hash of primary target path>.json   # one DependencyInfo per target
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::types::{DepInfoError, DependencyInfo};
use crate::util::hash::ObjectHash;

/// Reads and writes dependency records under one directory.
#[derive(Debug, Clone)]
pub struct DependencyStore {
  dir: PathBuf,
}

impl DependencyStore {
  pub fn new(dir: PathBuf) -> Self {
    Self { dir }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// Path of the record for an absolute target path.
  pub fn record_path(&self, target: &str) -> PathBuf {
    let hash = ObjectHash::of(target.as_bytes());
    self.dir.join(format!("{}.json", hash))
  }

  /// Load the record keyed by `target`.
  pub fn load(&self, target: &str) -> Result<DependencyInfo, DepInfoError> {
    let path = self.record_path(target);
    let content = fs::read_to_string(&path).map_err(|source| {
      if source.kind() == io::ErrorKind::NotFound {
        DepInfoError::NotFound(PathBuf::from(target))
      } else {
        DepInfoError::Read { path: path.clone(), source }
      }
    })?;
    serde_json::from_str(&content).map_err(DepInfoError::Parse)
  }

  /// Store `info` under its first target.
  ///
  /// Written to a temporary file in the same directory and then moved into
  /// place, so readers never observe a partial record.
  pub fn store(&self, info: &DependencyInfo) -> Result<(), DepInfoError> {
    let target = info.targets.first().ok_or(DepInfoError::NoTargets)?;
    let path = self.record_path(target);
    let write_err = |source| DepInfoError::Write {
      path: path.clone(),
      source,
    };

    fs::create_dir_all(&self.dir).map_err(write_err)?;
    let content = serde_json::to_string_pretty(info).map_err(DepInfoError::Serialize)?;
    let mut file = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
    file.write_all(content.as_bytes()).map_err(write_err)?;
    file.persist(&path).map_err(|e| write_err(e.error))?;

    debug!(path = %target, record = %path.display(), "stored dependency record");
    Ok(())
  }

  /// Remove every record. Returns how many were removed.
  pub fn clear(&self) -> Result<usize, DepInfoError> {
    let entries = match fs::read_dir(&self.dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
      Err(source) => {
        return Err(DepInfoError::Read {
          path: self.dir.clone(),
          source,
        });
      }
    };

    let mut removed = 0;
    for entry in entries {
      let entry = entry.map_err(|source| DepInfoError::Read {
        path: self.dir.clone(),
        source,
      })?;
      let path = entry.path();
      if path.extension().is_some_and(|ext| ext == "json") {
        fs::remove_file(&path).map_err(|source| DepInfoError::Write { path, source })?;
        removed += 1;
      }
    }
    Ok(removed)
  }
}
