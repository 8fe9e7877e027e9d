//! Failure taxonomy for a packing run.
//!
//! Only genuine I/O failures are errors. A pattern that matches nothing and an entry file
//! that does not exist are ordinary outcomes and are recorded in [`crate::models`] instead.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while preparing a project for bundling.
#[derive(Error, Debug)]
pub enum PackError {
  /// The project root could not be listed, so no source units can be discovered.
  #[error("failed to read project root {}: {source}", path.display())]
  RootUnreadable {
    /// Project root that failed to list.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },

  /// A read, stat or write for one source unit failed for a reason other than absence.
  #[error("I/O failure for {}: {source}", path.display())]
  UnitIo {
    /// File that caused the error.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },

  /// Listing a directory failed while matching a wildcard pattern.
  #[error("failed to walk {}: {source}", dir.display())]
  Walk {
    /// Directory that failed to list.
    dir: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },

  /// A pattern has no absolute directory to resolve from, as when a join starts with a
  /// runtime value.
  #[error("pattern {pattern} has no absolute base directory")]
  UnanchoredPattern {
    /// The pattern as extracted.
    pattern: String,
  },

  /// The generated registry file could not be written.
  #[error("failed to write registry {}: {source}", path.display())]
  RegistryWrite {
    /// Destination of the registry file.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },

  /// Rewritten files would land on top of the sources they were generated from.
  #[error("output root {} is the project root", path.display())]
  OutputOverlapsRoot {
    /// Offending output root.
    path: PathBuf,
  },
}

/// Result alias used throughout the packing engine.
pub type Result<T> = std::result::Result<T, PackError>;
