//! Data structures produced while preparing a project for static bundling.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::PackError;

/// Marker standing in for a path segment only known at runtime.
pub const WILDCARD: char = '*';

/// How a load expression was written in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternKind {
  /// A quoted string argument such as `require('./lib/thing')`.
  Literal,
  /// A path assembled from a `path.join(...)` argument list.
  Join {
    /// Source text of every runtime expression, in the order its wildcard appears.
    wildcard_exprs: Vec<String>,
    /// Whether `.js` was appended to the pattern so wildcards only match scripts.
    suffix_appended: bool,
  },
}

/// Outcome of resolving a single pattern against the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ResolutionStatus {
  /// Not resolved yet.
  Pending,
  /// Bare module specifier left for the bundler to handle.
  External,
  /// At least one file satisfied the pattern.
  Resolved,
  /// Nothing on disk satisfied the pattern.
  NotFound,
  /// Walking for a wildcard match failed.
  Failed {
    /// Rendered walk error.
    reason: String,
  },
}

/// One discovered dependency reference.
#[derive(Debug, Clone)]
pub struct PathPattern {
  /// How the reference was written.
  pub kind: PatternKind,
  /// Exact substring that gets replaced, quote style included.
  pub matched_text: String,
  /// Other spellings in the same unit that normalised to the same pattern.
  pub extra_occurrences: Vec<String>,
  /// Normalised absolute path, runtime segments replaced by [`WILDCARD`].
  pub pattern_string: String,
  /// Files satisfying the pattern, in traversal order.
  pub resolved_files: Vec<PathBuf>,
  /// Resolution state.
  pub status: ResolutionStatus,
  /// Registry lookup substituted for every occurrence, when one could be built.
  pub replacement_expr: Option<String>,
}

impl PathPattern {
  /// Create an unresolved pattern.
  pub fn new(kind: PatternKind, matched_text: impl Into<String>, pattern_string: impl Into<String>) -> Self {
    Self {
      kind,
      matched_text: matched_text.into(),
      extra_occurrences: Vec::new(),
      pattern_string: pattern_string.into(),
      resolved_files: Vec::new(),
      status: ResolutionStatus::Pending,
      replacement_expr: None,
    }
  }

  /// Whether the pattern contains a runtime segment.
  ///
  /// Decided by how the expression was written, so a literal `*` inside a quoted path does
  /// not turn a plain require into a filesystem walk.
  pub fn has_wildcard(&self) -> bool {
    matches!(&self.kind, PatternKind::Join { wildcard_exprs, .. } if !wildcard_exprs.is_empty())
  }

  /// Every spelling of this reference that should be rewritten.
  pub fn occurrences(&self) -> impl Iterator<Item = &str> {
    std::iter::once(self.matched_text.as_str()).chain(self.extra_occurrences.iter().map(String::as_str))
  }
}

/// One folder's entry file and the patterns discovered inside it.
#[derive(Debug, Clone)]
pub struct SourceUnit {
  /// Absolute path of the entry file.
  pub path: PathBuf,
  /// Original file contents.
  pub raw_text: String,
  /// Patterns discovered in `raw_text`, deduplicated by pattern string.
  pub patterns: Vec<PathPattern>,
  /// Rewritten contents, present once the rewriter ran.
  pub rewritten_text: Option<String>,
}

impl SourceUnit {
  /// Directory containing the entry file.
  pub fn dir(&self) -> &Path {
    self.path.parent().unwrap_or_else(|| Path::new(""))
  }
}

/// Settled result of extracting and resolving one unit.
#[derive(Debug)]
pub enum UnitOutcome {
  /// Extraction and resolution completed.
  Resolved(SourceUnit),
  /// The entry file does not exist.
  Missing(PathBuf),
  /// An I/O error made the unit unusable.
  Failed {
    /// Entry file of the failed unit.
    path: PathBuf,
    /// Underlying failure.
    error: PackError,
  },
}

/// A unit written to the output root.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewrittenUnit {
  /// Original entry file.
  pub source: PathBuf,
  /// Rewritten copy under the output root.
  pub output: PathBuf,
}

/// A unit excluded from the run because of an I/O error.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitFailure {
  /// Entry file of the failed unit.
  pub path: PathBuf,
  /// Rendered error.
  pub error: String,
}

/// A pattern left untouched because nothing resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedPattern {
  /// Unit the pattern belongs to.
  pub unit: PathBuf,
  /// Expression as written.
  pub matched_text: String,
  /// Normalised pattern.
  pub pattern: String,
  /// Why it did not resolve.
  #[serde(flatten)]
  pub status: ResolutionStatus,
}

/// Combined result of a packing run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackReport {
  /// Generated registry file.
  pub registry_file: PathBuf,
  /// Number of keys (canonical and alias) in the registry.
  pub registry_keys: usize,
  /// Entry files whose patterns made it into the registry.
  pub entry_files: Vec<PathBuf>,
  /// Units written to the output root.
  pub rewritten: Vec<RewrittenUnit>,
  /// Units skipped because their entry file is absent.
  pub skipped: Vec<PathBuf>,
  /// Units excluded because of I/O errors.
  pub failures: Vec<UnitFailure>,
  /// Patterns that resolved to nothing.
  pub unresolved: Vec<UnresolvedPattern>,
}

impl PackReport {
  /// True when every unit either completed or was absent.
  pub fn is_success(&self) -> bool {
    self.failures.is_empty()
  }
}
