//! Project configuration loader describing where packed output and the registry live.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::project::PackLayout;

const CONFIG_CANDIDATES: [&str; 3] = ["require-packer.json", "require-packer.yaml", "require-packer.yml"];

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "REQUIRE_PACKER_";

/// Discoverable project configuration describing output paths and exclusions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PackConfig {
  /// Folder, relative to the project root, that receives rewritten entry files.
  pub output_folder: String,
  /// File name of the generated dependency registry.
  pub registry_file: String,
  /// Global object the registry populates and rewritten files read from.
  pub registry_global: String,
  /// Entry file inside each top-level folder.
  pub entry_file: String,
  /// Top-level names that are never treated as source units.
  pub excluded_items: Vec<String>,
  /// Modules the bundler should leave external.
  pub ignored_modules: Vec<String>,
}

impl Default for PackConfig {
  fn default() -> Self {
    Self {
      output_folder: "dist".into(),
      registry_file: "bundle.deps.js".into(),
      registry_global: "bundleDeps".into(),
      entry_file: "index.js".into(),
      excluded_items: default_excluded_items("dist"),
      ignored_modules: vec!["crypto".into(), "openpgp".into()],
    }
  }
}

fn default_excluded_items(output_folder: &str) -> Vec<String> {
  [
    ".git",
    ".deploy",
    ".idea",
    "node_modules",
    output_folder,
    "package.json",
    ".deployment",
    ".gitignore",
    ".gitmodules",
    ".npmignore",
  ]
  .into_iter()
  .map(String::from)
  .collect()
}

impl PackConfig {
  /// Attempt to load configuration from the provided project root.
  ///
  /// Missing or malformed files fall back to defaults so a bare project still packs.
  pub fn discover(root: &Path) -> Self {
    CONFIG_CANDIDATES
      .iter()
      .map(|name| root.join(name))
      .find(|candidate| candidate.exists())
      .and_then(|candidate| Self::from_path(&candidate))
      .unwrap_or_default()
  }

  /// Read configuration from a JSON or YAML file, chosen by extension.
  pub fn from_path(path: &Path) -> Option<Self> {
    let content = fs::read_to_string(path).ok()?;
    let parsed: Result<Self, String> = match path.extension().and_then(|ext| ext.to_str()) {
      Some("yaml" | "yml") => serde_yaml::from_str(&content).map_err(|err| err.to_string()),
      _ => serde_json::from_str(&content).map_err(|err| err.to_string()),
    };

    match parsed {
      Ok(config) => Some(config),
      Err(err) => {
        warn!(path = %path.display(), error = %err, "ignoring unparseable configuration");
        None
      }
    }
  }

  /// Apply `REQUIRE_PACKER_*` overrides from the process environment.
  pub fn with_env_overrides(self) -> Self {
    self.apply_env_overrides(std::env::vars())
  }

  /// Apply overrides from arbitrary key/value pairs.
  ///
  /// List values are JSON arrays; single quotes are accepted in place of double quotes.
  /// An unparseable or empty list keeps the current value.
  pub fn apply_env_overrides<I, K, V>(mut self, vars: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
  {
    for (key, value) in vars {
      let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
        continue;
      };
      let value = value.as_ref().trim();
      if value.is_empty() {
        continue;
      }

      match name {
        "OUTPUT_FOLDER" => self.output_folder = value.to_string(),
        "REGISTRY_FILE" => self.registry_file = value.to_string(),
        "REGISTRY_GLOBAL" => self.registry_global = value.to_string(),
        "ENTRY_FILE" => self.entry_file = value.to_string(),
        "EXCLUDED_ITEMS" => {
          if let Some(items) = parse_list(name, value) {
            self.excluded_items = items;
          }
        }
        "IGNORED_MODULES" => {
          if let Some(items) = parse_list(name, value) {
            self.ignored_modules = items;
          }
        }
        _ => {}
      }
    }
    self
  }

  /// Ensure the output folder itself is never discovered as a source unit.
  pub fn exclude_output_folder(mut self) -> Self {
    if !self.excluded_items.contains(&self.output_folder) {
      self.excluded_items.push(self.output_folder.clone());
    }
    self
  }

  /// Convert the configuration into a layout rooted at `root`.
  pub fn into_layout(self, root: &Path) -> PackLayout {
    PackLayout {
      root: root.to_path_buf(),
      output_root: root.join(&self.output_folder),
      registry_file: self.registry_file,
      registry_global: self.registry_global,
      entry_file: self.entry_file,
      excluded_items: self.excluded_items,
      ignored_modules: self.ignored_modules,
    }
  }
}

/// Parse a JSON list, tolerating single-quoted strings.
pub fn parse_list(name: &str, value: &str) -> Option<Vec<String>> {
  match serde_json::from_str::<Vec<String>>(&value.replace('\'', "\"")) {
    Ok(items) if !items.is_empty() => Some(items),
    Ok(_) => {
      warn!(setting = name, "empty list ignored, keeping previous value");
      None
    }
    Err(err) => {
      warn!(setting = name, error = %err, "list is not a JSON array, keeping previous value");
      None
    }
  }
}
