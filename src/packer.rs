//! Packing orchestrator: extract, resolve, register and rewrite every source unit.

use std::io::ErrorKind;
use std::path::Path;

use futures::future::join_all;
use tokio::fs;
use tracing::{info, warn};

use crate::discover::discover_units;
use crate::error::{PackError, Result};
use crate::extract::extract_patterns;
use crate::models::{
  PackReport, ResolutionStatus, RewrittenUnit, SourceUnit, UnitFailure, UnitOutcome,
  UnresolvedPattern,
};
use crate::project::PackLayout;
use crate::registry::DependencyRegistry;
use crate::resolve::resolve_patterns;
use crate::rewrite::write_rewritten;

/// High-level helper that prepares a project for static bundling.
pub struct Packer<'a> {
  layout: &'a PackLayout,
}

impl<'a> Packer<'a> {
  /// Create a packer for the provided layout.
  pub fn new(layout: &'a PackLayout) -> Self {
    Self { layout }
  }

  /// Discover every top-level folder's entry file and pack them.
  pub async fn pack_project(&self) -> Result<PackReport> {
    let entry_files = discover_units(self.layout).await?;
    self.pack(&entry_files).await
  }

  /// Pack the given entry files.
  ///
  /// Every unit is extracted and resolved concurrently and all of them settle before the
  /// registry is built. A missing entry file is skipped and a unit that hits an I/O error is
  /// reported as a failure; neither stops the others. Only a failure to write the registry
  /// aborts the run.
  pub async fn pack(&self, entry_files: &[impl AsRef<Path>]) -> Result<PackReport> {
    self.layout.validate()?;

    let outcomes = join_all(
      entry_files
        .iter()
        .map(|path| self.process_unit(path.as_ref())),
    )
    .await;

    let mut units = Vec::new();
    let mut skipped = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
      match outcome {
        UnitOutcome::Resolved(unit) => units.push(unit),
        UnitOutcome::Missing(path) => {
          info!(unit = %path.display(), "entry file missing, skipping unit");
          skipped.push(path);
        }
        UnitOutcome::Failed { path, error } => {
          warn!(unit = %path.display(), %error, "unit failed");
          failures.push(UnitFailure {
            path,
            error: error.to_string(),
          });
        }
      }
    }

    let mut registry = DependencyRegistry::new(self.layout);
    let mut unresolved = Vec::new();
    for unit in &units {
      registry.merge_unit(unit);
      unresolved.extend(unresolved_patterns(unit));
    }

    let registry_file = self.layout.registry_path();
    registry.write(&registry_file).await?;
    info!(
      path = %registry_file.display(),
      keys = registry.len(),
      files = registry.canonical_count(),
      "wrote dependency registry"
    );

    let entry_files = units.iter().map(|unit| unit.path.clone()).collect();
    let writes = join_all(
      units
        .iter_mut()
        .map(|unit| write_rewritten(self.layout, unit)),
    )
    .await;

    let mut rewritten = Vec::new();
    for (unit, written) in units.iter().zip(writes) {
      match written {
        Ok(output) => rewritten.push(RewrittenUnit {
          source: unit.path.clone(),
          output,
        }),
        Err(error) => {
          warn!(unit = %unit.path.display(), %error, "failed to write rewritten unit");
          failures.push(UnitFailure {
            path: unit.path.clone(),
            error: error.to_string(),
          });
        }
      }
    }

    info!(
      rewritten = rewritten.len(),
      skipped = skipped.len(),
      failed = failures.len(),
      unresolved = unresolved.len(),
      "packing finished"
    );

    Ok(PackReport {
      registry_file,
      registry_keys: registry.len(),
      entry_files,
      rewritten,
      skipped,
      failures,
      unresolved,
    })
  }

  async fn process_unit(&self, path: &Path) -> UnitOutcome {
    let raw_text = match fs::read_to_string(path).await {
      Ok(text) => text,
      Err(err) if err.kind() == ErrorKind::NotFound => return UnitOutcome::Missing(path.to_path_buf()),
      Err(source) => {
        return UnitOutcome::Failed {
          path: path.to_path_buf(),
          error: PackError::UnitIo {
            path: path.to_path_buf(),
            source,
          },
        };
      }
    };

    info!(unit = %path.display(), "cataloguing dependencies");
    let patterns = extract_patterns(path, &raw_text);
    match resolve_patterns(self.layout, patterns).await {
      Ok(patterns) => UnitOutcome::Resolved(SourceUnit {
        path: path.to_path_buf(),
        raw_text,
        patterns,
        rewritten_text: None,
      }),
      Err(error) => UnitOutcome::Failed {
        path: path.to_path_buf(),
        error,
      },
    }
  }
}

fn unresolved_patterns(unit: &SourceUnit) -> impl Iterator<Item = UnresolvedPattern> + '_ {
  unit
    .patterns
    .iter()
    .filter(|pattern| {
      matches!(
        pattern.status,
        ResolutionStatus::NotFound | ResolutionStatus::Failed { .. }
      )
    })
    .map(|pattern| {
      warn!(
        unit = %unit.path.display(),
        pattern = %pattern.pattern_string,
        "dependency left unresolved"
      );
      UnresolvedPattern {
        unit: unit.path.clone(),
        matched_text: pattern.matched_text.clone(),
        pattern: pattern.pattern_string.clone(),
        status: pattern.status.clone(),
      }
    })
}
