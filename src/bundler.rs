//! Seam to the external bundler and the copy-exclusion list derived from its output.

use std::collections::BTreeSet;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;

use crate::models::PackReport;
use crate::project::PackLayout;

/// What a bundler run produced.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundleOutput {
  /// The single bundled file.
  pub output_file: PathBuf,
  /// Identifiers of every module the bundle includes.
  pub modules: Vec<String>,
}

/// A static bundler able to bundle the generated registry.
pub trait Bundler {
  /// Bundle `entry`, leaving `externals` to be loaded at runtime.
  fn bundle(&self, entry: &Path, externals: &[String]) -> Result<BundleOutput>;
}

impl<F> Bundler for F
where
  F: Fn(&Path, &[String]) -> Result<BundleOutput>,
{
  fn bundle(&self, entry: &Path, externals: &[String]) -> Result<BundleOutput> {
    self(entry, externals)
  }
}

/// Bundle the registry written by a packing run and compute the copy exclusions.
pub fn bundle_registry<B: Bundler>(
  bundler: &B,
  layout: &PackLayout,
  report: &PackReport,
) -> Result<(BundleOutput, BTreeSet<PathBuf>)> {
  let output = bundler
    .bundle(&report.registry_file, &layout.ignored_modules)
    .with_context(|| format!("failed to bundle {}", report.registry_file.display()))?;
  let excluded = copy_exclusions(report, &output);
  Ok((output, excluded))
}

/// Files a secondary copy of the project may skip.
///
/// These are the processed entry files, which were rewritten, plus every local module the
/// bundle already contains. Packages under `node_modules` are never excluded.
pub fn copy_exclusions(report: &PackReport, bundle: &BundleOutput) -> BTreeSet<PathBuf> {
  let mut excluded: BTreeSet<PathBuf> = report.entry_files.iter().cloned().collect();
  excluded.extend(
    bundle
      .modules
      .iter()
      .filter_map(|identifier| local_module_path(identifier)),
  );
  excluded
}

/// Filesystem path of a bundled module identifier, if it names a local file.
///
/// Identifiers may carry a loader chain (`json-loader!/srv/app/data.json`); only the final
/// resource is considered.
pub fn local_module_path(identifier: &str) -> Option<PathBuf> {
  let resource = identifier.rsplit('!').next().unwrap_or(identifier);
  let is_path = resource.contains(MAIN_SEPARATOR) && !resource.contains("node_modules");
  is_path.then(|| PathBuf::from(resource))
}

/// Read module identifiers out of a bundler's JSON stats (`{"modules": [{"identifier": ...}]}`).
pub fn modules_from_stats(stats: &str) -> Result<Vec<String>> {
  let stats: Value = serde_json::from_str(stats).context("failed to parse bundler stats JSON")?;
  let modules = stats
    .get("modules")
    .and_then(|value| value.as_array())
    .ok_or_else(|| anyhow!("missing `modules` field in bundler stats"))?;

  Ok(
    modules
      .iter()
      .filter_map(|module| module.get("identifier").and_then(|value| value.as_str()))
      .map(String::from)
      .collect(),
  )
}
