//! Resolution of extracted patterns to concrete files.
//!
//! Plain paths go through existence, extension and directory-index fallbacks. Wildcard
//! patterns are handed to the filesystem matcher. Failing to find anything is a normal
//! outcome; only I/O errors unrelated to existence escape as errors.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{PackError, Result};
use crate::matcher::find_matching_files;
use crate::models::{PathPattern, PatternKind, ResolutionStatus, WILDCARD};
use crate::paths::registry_key;
use crate::project::PackLayout;
use crate::registry::{js_string, lookup_expression};

/// Resolve every pattern of a unit concurrently, settling all of them before returning.
pub async fn resolve_patterns(layout: &PackLayout, patterns: Vec<PathPattern>) -> Result<Vec<PathPattern>> {
  join_all(
    patterns
      .into_iter()
      .map(|pattern| resolve_pattern(layout, pattern)),
  )
  .await
  .into_iter()
  .collect()
}

/// Fill in `resolved_files`, `status` and `replacement_expr` for one pattern.
///
/// Only a pattern that can actually be rewritten ends up `Resolved`. A pattern without an
/// absolute base, or whose wildcards were folded away by `..`, is `Failed`.
pub async fn resolve_pattern(layout: &PackLayout, mut pattern: PathPattern) -> Result<PathPattern> {
  if pattern.status == ResolutionStatus::External {
    return Ok(pattern);
  }

  if !Path::new(&pattern.pattern_string).is_absolute() {
    let err = PackError::UnanchoredPattern {
      pattern: pattern.pattern_string.clone(),
    };
    warn!(error = %err, "pattern cannot be resolved");
    pattern.status = ResolutionStatus::Failed {
      reason: err.to_string(),
    };
    return Ok(pattern);
  }

  if pattern.has_wildcard() {
    match find_matching_files(&pattern.pattern_string).await {
      Ok(files) => pattern.resolved_files = files,
      Err(err) => {
        warn!(pattern = %pattern.pattern_string, error = %err, "wildcard walk failed");
        pattern.status = ResolutionStatus::Failed {
          reason: err.to_string(),
        };
        return Ok(pattern);
      }
    }
  } else {
    pattern.resolved_files =
      resolve_literal_path(Path::new(&pattern.pattern_string), &layout.entry_file).await?;
  }

  if pattern.resolved_files.is_empty() {
    debug!(pattern = %pattern.pattern_string, "pattern matched no files");
    pattern.status = ResolutionStatus::NotFound;
  } else if let Some(replacement) = replacement_for(layout, &pattern) {
    pattern.status = ResolutionStatus::Resolved;
    pattern.replacement_expr = Some(replacement);
  } else {
    warn!(pattern = %pattern.pattern_string, "no registry lookup fits the expression");
    pattern.status = ResolutionStatus::Failed {
      reason: "runtime expressions no longer line up with the matched path".into(),
    };
  }

  Ok(pattern)
}

/// Apply the existence fallbacks for a path without wildcards.
///
/// - an existing file resolves to itself
/// - an existing directory resolves to its entry file, if present
/// - a missing path without an extension is retried with `.js`
pub async fn resolve_literal_path(path: &Path, entry_file: &str) -> Result<Vec<PathBuf>> {
  match fs::metadata(path).await {
    Ok(metadata) if metadata.is_dir() => {
      let entry = path.join(entry_file);
      Ok(existing_file(&entry).await?.into_iter().collect())
    }
    Ok(_) => Ok(vec![path.to_path_buf()]),
    Err(err) if err.kind() == ErrorKind::NotFound => {
      if path.extension().is_some() {
        return Ok(Vec::new());
      }
      let mut with_extension = OsString::from(path.as_os_str());
      with_extension.push(".js");
      Ok(existing_file(Path::new(&with_extension)).await?.into_iter().collect())
    }
    Err(source) => Err(PackError::UnitIo {
      path: path.to_path_buf(),
      source,
    }),
  }
}

async fn existing_file(path: &Path) -> Result<Option<PathBuf>> {
  match fs::metadata(path).await {
    Ok(metadata) if metadata.is_file() => Ok(Some(path.to_path_buf())),
    Ok(_) => Ok(None),
    Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
    Err(source) => Err(PackError::UnitIo {
      path: path.to_path_buf(),
      source,
    }),
  }
}

/// Registry lookup that replaces every occurrence of a resolved pattern.
///
/// A plain path looks up the key of the file it resolved to. A wildcard pattern becomes a
/// runtime key built from the pattern's literal pieces and the original expressions; the
/// `.js` appended for matching is dropped again so the registry aliases answer for both
/// `name.js` and `name/index.js`.
pub fn replacement_for(layout: &PackLayout, pattern: &PathPattern) -> Option<String> {
  match &pattern.kind {
    PatternKind::Join {
      wildcard_exprs,
      suffix_appended,
    } if !wildcard_exprs.is_empty() => {
      let matched = if *suffix_appended {
        pattern.pattern_string.strip_suffix(".js")?
      } else {
        pattern.pattern_string.as_str()
      };
      let key = registry_key(&layout.root, Path::new(matched));
      let key_expr = interleave(&key, wildcard_exprs)?;
      Some(lookup_expression(&layout.registry_global, &key_expr))
    }
    _ => match pattern.resolved_files.as_slice() {
      [file] => Some(lookup_expression(
        &layout.registry_global,
        &js_string(&registry_key(&layout.root, file)),
      )),
      _ => None,
    },
  }
}

/// Splice runtime expressions into the wildcard slots of `key`.
///
/// Returns `None` when normalisation left a different number of slots than expressions.
fn interleave(key: &str, expressions: &[String]) -> Option<String> {
  let pieces: Vec<&str> = key.split(WILDCARD).collect();
  if pieces.len() != expressions.len() + 1 {
    return None;
  }

  let mut parts = Vec::with_capacity(pieces.len() * 2);
  for (index, piece) in pieces.iter().enumerate() {
    if !piece.is_empty() {
      parts.push(js_string(piece));
    }
    if let Some(expression) = expressions.get(index) {
      parts.push(expression.clone());
    }
  }
  Some(parts.join(" + "))
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use crate::config::PackConfig;
  use crate::extract::extract_patterns;
  use std::fs as std_fs;
  use tempfile::tempdir;

  fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    std_fs::create_dir_all(path.parent().unwrap()).unwrap();
    std_fs::write(path, "module.exports = {};").unwrap();
  }

  fn layout(root: &Path) -> PackLayout {
    PackConfig::default().into_layout(root)
  }

  async fn resolve_one(root: &Path, text: &str) -> PathPattern {
    let unit = root.join("api/index.js");
    let mut patterns = extract_patterns(&unit, text);
    assert_eq!(patterns.len(), 1);
    resolve_pattern(&layout(root), patterns.remove(0)).await.unwrap()
  }

  #[tokio::test]
  async fn existing_files_resolve_to_themselves() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "lib/util.js");

    let pattern = resolve_one(dir.path(), "require('../lib/util.js')").await;
    assert_eq!(pattern.resolved_files, vec![dir.path().join("lib/util.js")]);
    assert_eq!(pattern.status, ResolutionStatus::Resolved);
    assert_eq!(
      pattern.replacement_expr.as_deref(),
      Some("global.bundleDeps[\"lib/util.js\"]")
    );
  }

  #[tokio::test]
  async fn missing_paths_retry_with_script_extension() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "a/b.js");

    let pattern = resolve_one(dir.path(), "require('../a/b')").await;
    assert_eq!(pattern.resolved_files, vec![dir.path().join("a/b.js")]);
    assert_eq!(
      pattern.replacement_expr.as_deref(),
      Some("global.bundleDeps[\"a/b.js\"]")
    );
  }

  #[tokio::test]
  async fn missing_paths_with_extensions_are_not_found() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "a/b.js.js");

    let pattern = resolve_one(dir.path(), "require('../a/b.js')").await;
    assert!(pattern.resolved_files.is_empty());
    assert_eq!(pattern.status, ResolutionStatus::NotFound);
    assert!(pattern.replacement_expr.is_none());
  }

  #[tokio::test]
  async fn directories_resolve_to_their_entry_file() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "shared/index.js");
    std_fs::create_dir_all(dir.path().join("empty")).unwrap();

    let pattern = resolve_one(dir.path(), "require('../shared')").await;
    assert_eq!(pattern.resolved_files, vec![dir.path().join("shared/index.js")]);

    let pattern = resolve_one(dir.path(), "require('../empty')").await;
    assert!(pattern.resolved_files.is_empty());
  }

  #[tokio::test]
  async fn wildcards_build_a_runtime_lookup() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "api/handlers/foo/index.js");
    touch(dir.path(), "api/handlers/bar/index.js");

    let pattern = resolve_one(
      dir.path(),
      "require(path.join(__dirname, 'handlers', name, 'index.js'))",
    )
    .await;

    assert_eq!(pattern.resolved_files, vec![
      dir.path().join("api/handlers/bar/index.js"),
      dir.path().join("api/handlers/foo/index.js"),
    ]);
    assert_eq!(
      pattern.replacement_expr.as_deref(),
      Some("global.bundleDeps[\"api/handlers/\" + name + \"/index.js\"]")
    );
  }

  #[tokio::test]
  async fn appended_suffix_is_dropped_from_the_lookup() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "api/models/user.js");

    let pattern = resolve_one(dir.path(), "require(path.join(__dirname, 'models', kind))").await;
    assert_eq!(pattern.resolved_files, vec![dir.path().join("api/models/user.js")]);
    assert_eq!(
      pattern.replacement_expr.as_deref(),
      Some("global.bundleDeps[\"api/models/\" + kind]")
    );
  }

  #[tokio::test]
  async fn walk_failures_are_recorded_on_the_pattern() {
    let dir = tempdir().unwrap();

    let pattern = resolve_one(dir.path(), "require(path.join(__dirname, 'absent', kind))").await;
    assert!(matches!(pattern.status, ResolutionStatus::Failed { .. }));
    assert!(pattern.resolved_files.is_empty());
  }

  #[tokio::test]
  async fn joins_starting_with_a_runtime_value_fail_without_walking() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "api/models/user.js");

    let pattern = resolve_one(dir.path(), "require(path.join(base, name))").await;
    assert_eq!(pattern.pattern_string, "*/*.js");
    assert!(matches!(pattern.status, ResolutionStatus::Failed { .. }));
    assert!(pattern.resolved_files.is_empty());
    assert!(pattern.replacement_expr.is_none());
  }

  #[tokio::test]
  async fn relative_literal_joins_are_not_resolved_against_the_working_directory() {
    let dir = tempdir().unwrap();
    let pattern = resolve_one(dir.path(), "require(path.join('src', 'lib.rs'))").await;
    assert!(matches!(pattern.status, ResolutionStatus::Failed { .. }));
    assert!(pattern.resolved_files.is_empty());
  }

  #[tokio::test]
  async fn wildcards_folded_away_by_parent_segments_fail() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "api/lib.js");

    let pattern = resolve_one(dir.path(), "require(path.join(__dirname, name, '..', 'lib'))").await;
    assert!(pattern.pattern_string.ends_with("/api/lib.js"));
    assert!(matches!(pattern.status, ResolutionStatus::Failed { .. }));
    assert!(pattern.replacement_expr.is_none());
  }

  #[tokio::test]
  async fn external_modules_are_left_alone() {
    let dir = tempdir().unwrap();
    let pattern = resolve_one(dir.path(), "require('crypto')").await;
    assert_eq!(pattern.status, ResolutionStatus::External);
    assert!(pattern.replacement_expr.is_none());
  }

  #[test]
  fn interleave_rejects_slot_mismatches() {
    assert_eq!(
      interleave("a/*/b", &["x".to_string()]).as_deref(),
      Some("\"a/\" + x + \"/b\"")
    );
    assert_eq!(interleave("*", &["x".to_string()]).as_deref(), Some("x"));
    assert!(interleave("a/b", &["x".to_string()]).is_none());
  }
}
