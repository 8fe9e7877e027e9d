//! Resolved filesystem layout for a single packing run.

use std::path::{Component, Path, PathBuf};

use same_file::is_same_file;

use crate::error::{PackError, Result};

/// Owned description of where sources, rewritten units and the registry live.
#[derive(Debug, Clone)]
pub struct PackLayout {
  /// Project root every registry key is relative to.
  pub root: PathBuf,
  /// Root that mirrors the project for rewritten entry files.
  pub output_root: PathBuf,
  /// File name of the generated registry.
  pub registry_file: String,
  /// Global object the registry populates.
  pub registry_global: String,
  /// Entry file inside each top-level folder.
  pub entry_file: String,
  /// Top-level names never treated as source units.
  pub excluded_items: Vec<String>,
  /// Modules the bundler leaves external.
  pub ignored_modules: Vec<String>,
}

impl PackLayout {
  /// Where the generated registry is written. It doubles as the bundler entry point.
  pub fn registry_path(&self) -> PathBuf {
    self.root.join(&self.registry_file)
  }

  /// Mirror of `unit` under the output root.
  pub fn output_path_for(&self, unit: &Path) -> PathBuf {
    match unit.strip_prefix(&self.root) {
      Ok(relative) => self.output_root.join(relative),
      Err(_) => self
        .output_root
        .join(unit.file_name().unwrap_or_else(|| unit.as_os_str())),
    }
  }

  /// Module specifier a rewritten `unit` uses to load the bundled registry.
  ///
  /// The bundled registry lands directly under the output root, so the specifier climbs one
  /// level per directory between the rewritten file and that root.
  pub fn registry_import_for(&self, unit: &Path) -> String {
    let depth = self
      .output_path_for(unit)
      .strip_prefix(&self.output_root)
      .map(|relative| {
        relative
          .parent()
          .map(|parent| {
            parent
              .components()
              .filter(|component| matches!(component, Component::Normal(_)))
              .count()
          })
          .unwrap_or(0)
      })
      .unwrap_or(0);

    if depth == 0 {
      format!("./{}", self.registry_file)
    } else {
      format!("{}{}", "../".repeat(depth), self.registry_file)
    }
  }

  /// Reject layouts that would overwrite the sources being packed.
  pub fn validate(&self) -> Result<()> {
    let overlaps = self.output_root == self.root
      || is_same_file(&self.root, &self.output_root).unwrap_or(false);
    if overlaps {
      return Err(PackError::OutputOverlapsRoot {
        path: self.output_root.clone(),
      });
    }
    Ok(())
  }

  /// Whether a top-level directory name is excluded from unit discovery.
  pub fn is_excluded(&self, name: &str) -> bool {
    self.excluded_items.iter().any(|item| item == name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::PackConfig;
  use tempfile::tempdir;

  fn layout(root: &Path) -> PackLayout {
    PackConfig::default().into_layout(root)
  }

  #[test]
  fn mirrors_units_under_output_root() {
    let layout = layout(Path::new("/srv/app"));
    assert_eq!(
      layout.output_path_for(Path::new("/srv/app/orders/index.js")),
      PathBuf::from("/srv/app/dist/orders/index.js")
    );
  }

  #[test]
  fn registry_import_climbs_to_output_root() {
    let layout = layout(Path::new("/srv/app"));
    assert_eq!(
      layout.registry_import_for(Path::new("/srv/app/orders/index.js")),
      "../bundle.deps.js"
    );
    assert_eq!(
      layout.registry_import_for(Path::new("/srv/app/api/v1/index.js")),
      "../../bundle.deps.js"
    );
    assert_eq!(
      layout.registry_import_for(Path::new("/srv/app/index.js")),
      "./bundle.deps.js"
    );
  }

  #[test]
  fn rejects_output_root_equal_to_project_root() {
    let dir = tempdir().unwrap();
    let mut layout = layout(dir.path());
    assert!(layout.validate().is_ok());

    layout.output_root = dir.path().join(".");
    assert!(matches!(
      layout.validate(),
      Err(PackError::OutputOverlapsRoot { .. })
    ));
  }
}
