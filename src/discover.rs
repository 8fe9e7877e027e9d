//! Discovery of per-folder source units under the project root.

use std::path::PathBuf;

use tokio::fs;
use tracing::debug;

use crate::error::{PackError, Result};
use crate::project::PackLayout;

/// List the entry file of every top-level folder that is not excluded.
///
/// Folders are returned in name order. The entry file itself is not checked: a folder
/// without one becomes a skipped unit rather than an error.
pub async fn discover_units(layout: &PackLayout) -> Result<Vec<PathBuf>> {
  let unreadable = |source| PackError::RootUnreadable {
    path: layout.root.clone(),
    source,
  };

  let mut listing = fs::read_dir(&layout.root).await.map_err(unreadable)?;
  let mut units = Vec::new();

  while let Some(entry) = listing.next_entry().await.map_err(unreadable)? {
    let name = entry.file_name();
    let name = name.to_string_lossy();
    if layout.is_excluded(&name) {
      continue;
    }

    let path = entry.path();
    let is_dir = fs::metadata(&path)
      .await
      .is_ok_and(|metadata| metadata.is_dir());
    if is_dir {
      units.push(path.join(&layout.entry_file));
    }
  }

  units.sort();
  debug!(count = units.len(), root = %layout.root.display(), "discovered source units");
  Ok(units)
}
