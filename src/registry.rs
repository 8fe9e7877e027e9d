//! Deduplicated registry of every file the rewritten units load.
//!
//! The registry is built once per run after all units have settled, then rendered into a
//! single script that loads each canonical file exactly once and points aliases at the
//! already-loaded binding.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tracing::debug;

use crate::error::{PackError, Result};
use crate::models::{ResolutionStatus, SourceUnit};
use crate::paths::{registry_key, strip_script_extension};
use crate::project::PackLayout;

/// What a registry key is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
  /// Load the canonical file.
  Load(PathBuf),
  /// Reuse the binding registered under another key.
  Alias(String),
}

/// One key of the generated registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
  /// Normalised key relative to the project root.
  pub key: String,
  /// Target of the key.
  pub binding: Binding,
}

/// Append-only map from normalised keys to canonical files.
#[derive(Debug, Clone)]
pub struct DependencyRegistry {
  root: PathBuf,
  global: String,
  entry_file: String,
  entries: Vec<RegistryEntry>,
  index: BTreeMap<String, usize>,
  canonical: BTreeSet<PathBuf>,
}

impl DependencyRegistry {
  /// Create an empty registry for `layout`.
  pub fn new(layout: &PackLayout) -> Self {
    Self {
      root: layout.root.clone(),
      global: layout.registry_global.clone(),
      entry_file: layout.entry_file.clone(),
      entries: Vec::new(),
      index: BTreeMap::new(),
      canonical: BTreeSet::new(),
    }
  }

  /// Register every resolved file of a unit, in pattern order.
  pub fn merge_unit(&mut self, unit: &SourceUnit) {
    let resolved = unit
      .patterns
      .iter()
      .filter(|pattern| pattern.status == ResolutionStatus::Resolved);
    for pattern in resolved {
      for file in &pattern.resolved_files {
        self.register(file);
      }
    }
  }

  /// Register a canonical file and its alias.
  ///
  /// Returns `false` when the file was already registered; re-registration changes nothing.
  pub fn register(&mut self, file: &Path) -> bool {
    if !self.canonical.insert(file.to_path_buf()) {
      return false;
    }

    let key = registry_key(&self.root, file);
    self.bind(key.clone(), Binding::Load(file.to_path_buf()));

    if let Some(alias) = self.alias_for(file, &key) {
      if !alias.is_empty() && !self.index.contains_key(&alias) {
        self.push(alias, Binding::Alias(key));
      }
    }
    true
  }

  fn alias_for(&self, file: &Path, key: &str) -> Option<String> {
    let is_entry = file
      .file_name()
      .is_some_and(|name| name.to_string_lossy() == self.entry_file);
    if is_entry {
      return file.parent().map(|dir| registry_key(&self.root, dir));
    }
    strip_script_extension(key).map(String::from)
  }

  fn bind(&mut self, key: String, binding: Binding) {
    match self.index.get(&key) {
      // A canonical file takes over a key previously claimed by an alias.
      Some(&position) => self.entries[position].binding = binding,
      None => self.push(key, binding),
    }
  }

  fn push(&mut self, key: String, binding: Binding) {
    debug!(%key, ?binding, "registering dependency");
    self.index.insert(key.clone(), self.entries.len());
    self.entries.push(RegistryEntry { key, binding });
  }

  /// Entries in insertion order.
  pub fn entries(&self) -> &[RegistryEntry] {
    &self.entries
  }

  /// Number of keys, aliases included.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Whether nothing has been registered.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Number of distinct physical files.
  pub fn canonical_count(&self) -> usize {
    self.canonical.len()
  }

  /// Render the registry as a script declaring one binding per key.
  pub fn render(&self) -> String {
    let global = format!("global.{}", self.global);
    let mut script = format!("'use strict';\n{global} = {global} || {{}};\n");

    for entry in &self.entries {
      let target = match &entry.binding {
        Binding::Load(file) => format!("require({})", js_string(&file.to_string_lossy())),
        Binding::Alias(canonical) => format!("{global}[{}]", js_string(canonical)),
      };
      script.push_str(&format!("{global}[{}] = {target};\n", js_string(&entry.key)));
    }

    script
  }

  /// Write the rendered registry to `path`.
  pub async fn write(&self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)
        .await
        .map_err(|source| PackError::RegistryWrite {
          path: path.to_path_buf(),
          source,
        })?;
    }
    fs::write(path, self.render())
      .await
      .map_err(|source| PackError::RegistryWrite {
        path: path.to_path_buf(),
        source,
      })
  }
}

/// Quote `value` as a double-quoted script string literal.
pub fn js_string(value: &str) -> String {
  Value::String(value.to_owned()).to_string()
}

/// Expression reading `key_expr` out of the registry global.
pub fn lookup_expression(global: &str, key_expr: &str) -> String {
  format!("global.{global}[{key_expr}]")
}
