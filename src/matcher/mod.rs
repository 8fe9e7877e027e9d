//! Concurrent filesystem walk that resolves wildcard patterns to concrete files.
//!
//! Every directory listing fans out one task per entry and joins on all of them before the
//! directory's own result is produced. Sibling branches share nothing but the pattern.

mod segments;

use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use futures::future::{BoxFuture, FutureExt, try_join_all};
use tokio::fs;
use tracing::debug;

pub use segments::segment_matches;

use crate::error::{PackError, Result};
use crate::models::WILDCARD;

/// Longest literal directory before the first wildcard of `pattern`.
///
/// `None` when that prefix is not an absolute directory; such a pattern has nowhere to start.
pub fn base_directory(pattern: &str) -> Option<PathBuf> {
  let literal = pattern
    .find(WILDCARD)
    .map_or(pattern, |position| &pattern[..position]);

  let base = match literal.rfind(MAIN_SEPARATOR)? {
    0 => PathBuf::from(MAIN_SEPARATOR.to_string()),
    position => PathBuf::from(&literal[..position]),
  };
  base.is_absolute().then_some(base)
}

/// Collect every file under the pattern's base directory that satisfies `pattern`.
///
/// Entries are visited in file-name order, so the result is deterministic for a given tree.
/// A directory that cannot be listed fails the whole match with [`PackError::Walk`]; a
/// pattern without an absolute base fails with [`PackError::UnanchoredPattern`].
pub async fn find_matching_files(pattern: &str) -> Result<Vec<PathBuf>> {
  let base = base_directory(pattern).ok_or_else(|| PackError::UnanchoredPattern {
    pattern: pattern.to_string(),
  })?;
  debug!(%pattern, base = %base.display(), "walking for wildcard pattern");
  walk(base, pattern).await
}

fn walk(dir: PathBuf, pattern: &str) -> BoxFuture<'_, Result<Vec<PathBuf>>> {
  async move {
    let mut entries = Vec::new();
    let mut listing = fs::read_dir(&dir)
      .await
      .map_err(|source| PackError::Walk {
        dir: dir.clone(),
        source,
      })?;
    while let Some(entry) = listing
      .next_entry()
      .await
      .map_err(|source| PackError::Walk {
        dir: dir.clone(),
        source,
      })?
    {
      entries.push(entry.path());
    }
    entries.sort();

    let children = try_join_all(entries.into_iter().map(|path| visit(path, pattern))).await?;
    Ok(children.into_iter().flatten().collect())
  }
  .boxed()
}

async fn visit(path: PathBuf, pattern: &str) -> Result<Vec<PathBuf>> {
  let metadata = match fs::metadata(&path).await {
    Ok(metadata) => metadata,
    Err(err) => {
      debug!(path = %path.display(), error = %err, "skipping unreadable entry");
      return Ok(Vec::new());
    }
  };

  let is_dir = metadata.is_dir();
  if !segment_matches(&path.to_string_lossy(), pattern, is_dir) {
    return Ok(Vec::new());
  }

  if is_dir {
    walk(path, pattern).await
  } else {
    Ok(vec![path])
  }
}

/// Match a pattern written relative to `root`.
pub async fn find_matching_files_under(root: &Path, relative_pattern: &str) -> Result<Vec<PathBuf>> {
  let pattern = root.join(relative_pattern);
  find_matching_files(&pattern.to_string_lossy()).await
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use std::fs as std_fs;
  use tempfile::tempdir;

  fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    std_fs::create_dir_all(path.parent().unwrap()).unwrap();
    std_fs::write(path, "module.exports = {};").unwrap();
  }

  #[test]
  fn base_directory_stops_before_the_first_wildcard() {
    assert_eq!(
      base_directory("/srv/app/handlers/*/index.js"),
      Some(PathBuf::from("/srv/app/handlers"))
    );
    assert_eq!(base_directory("/srv/app/hand*/index.js"), Some(PathBuf::from("/srv/app")));
    assert_eq!(base_directory("/*.js"), Some(PathBuf::from("/")));
  }

  #[test]
  fn relative_prefixes_have_no_base_directory() {
    assert_eq!(base_directory("*/*.js"), None);
    assert_eq!(base_directory("lib/*.js"), None);
  }

  #[tokio::test]
  async fn unanchored_patterns_never_walk_the_working_directory() {
    let result = find_matching_files("*/*.js").await;
    assert!(matches!(result, Err(PackError::UnanchoredPattern { .. })));
  }

  #[tokio::test]
  async fn finds_every_matching_index_in_name_order() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "handlers/foo/index.js");
    touch(dir.path(), "handlers/bar/index.js");
    touch(dir.path(), "handlers/bar/helper.js");
    touch(dir.path(), "other/baz/index.js");

    let files = find_matching_files_under(dir.path(), "handlers/*/index.js")
      .await
      .unwrap();

    assert_eq!(files, vec![
      dir.path().join("handlers/bar/index.js"),
      dir.path().join("handlers/foo/index.js"),
    ]);
  }

  #[tokio::test]
  async fn suffix_restricts_matches_to_scripts() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "models/user.js");
    touch(dir.path(), "models/README.md");

    let files = find_matching_files_under(dir.path(), "models/*.js").await.unwrap();
    assert_eq!(files, vec![dir.path().join("models/user.js")]);
  }

  #[tokio::test]
  async fn empty_match_is_not_an_error() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "models/user.json");

    let files = find_matching_files_under(dir.path(), "models/*.js").await.unwrap();
    assert!(files.is_empty());
  }

  #[tokio::test]
  async fn missing_base_directory_is_a_walk_error() {
    let dir = tempdir().unwrap();
    let result = find_matching_files_under(dir.path(), "absent/*.js").await;
    assert!(matches!(result, Err(PackError::Walk { .. })));
  }
}
