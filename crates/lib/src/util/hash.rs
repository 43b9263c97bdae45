//! Hashing utilities for dependency tracking.
//!
//! This module provides:
//! - `ObjectHash`: a truncated 20-character hash used to name records on disk
//! - `ContentHash`: a full 64-character hash recorded for each dependency
//! - `hash_file()`: single file hashing
//! - `hash_bytes()`: arbitrary byte hashing

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::OBJ_HASH_PREFIX_LEN;

/// A short, path-friendly hash identifying an object.
///
/// The hash is a lowercase hexadecimal string, e.g., `"a1b2c3d4e5f6789012ab"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHash(pub String);

impl std::fmt::Display for ObjectHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl ObjectHash {
  /// Hash arbitrary bytes down to an object hash.
  pub fn of(data: &[u8]) -> Self {
    let full = hash_bytes(data);
    ObjectHash(full.0[..OBJ_HASH_PREFIX_LEN].to_string())
  }
}

/// A full 64-character SHA256 hash for content verification.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Error while hashing a file.
#[derive(Debug, thiserror::Error)]
#[error("failed to read file {path}: {source}")]
pub struct FileHashError {
  pub path: PathBuf,
  #[source]
  pub source: io::Error,
}

impl FileHashError {
  /// True when the file simply does not exist.
  pub fn is_not_found(&self) -> bool {
    self.source.kind() == io::ErrorKind::NotFound
  }
}

/// Hash a file's contents.
///
/// Returns the full 64-character SHA256 hash of the file.
pub fn hash_file(path: &Path) -> Result<ContentHash, FileHashError> {
  let wrap = |source| FileHashError {
    path: path.to_path_buf(),
    source,
  };
  let mut file = fs::File::open(path).map_err(wrap)?;

  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(wrap)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Hash a file if it exists.
///
/// Returns `Ok(None)` for a missing file so callers can record absence.
pub fn hash_file_if_exists(path: &Path) -> Result<Option<ContentHash>, FileHashError> {
  match hash_file(path) {
    Ok(hash) => Ok(Some(hash)),
    Err(e) if e.is_not_found() => Ok(None),
    Err(e) => Err(e),
  }
}

/// Hash arbitrary bytes.
///
/// Returns the full 64-character SHA256 hash.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(format!("{:x}", hasher.finalize()))
}
