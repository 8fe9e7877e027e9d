//! Discovery of module-load expressions in raw source text.
//!
//! The extractor works on pattern-matched text rather than a syntax tree. It recognises a
//! quoted `require('...')` argument and a `require(path.join(...))` call whose arguments are
//! classified segment by segment. Anything it cannot make sense of degrades to a wildcard.

mod join;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Match, Regex};
use tracing::debug;

pub use join::{DIRNAME, JoinSegment, classify_arguments, unquote};

use crate::models::{PathPattern, PatternKind, ResolutionStatus};
use crate::paths::{is_external_specifier, join_segments, normalize_lexically};

fn literal_require() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#).expect("invalid literal require regex")
  })
}

fn join_require() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"require\s*\(\s*\(*\s*path\.join\s*\(([^)]+)\)\s*\)*\s*\)")
      .expect("invalid path.join require regex")
  })
}

/// Find every literal and `path.join` load expression in `text`.
///
/// `unit_path` is the absolute path of the file the text came from; relative specifiers and
/// `__dirname` resolve against its directory. Patterns are returned in discovery order with
/// duplicates (same normalised pattern) merged.
pub fn extract_patterns(unit_path: &Path, text: &str) -> Vec<PathPattern> {
  let unit_dir = unit_path.parent().unwrap_or_else(|| Path::new(""));
  let mut collector = PatternCollector::default();

  for captures in literal_require().captures_iter(text) {
    if let (Some(matched), Some(specifier)) = (captures.get(0), captures.get(1)) {
      collector.push(literal_pattern(unit_dir, matched, specifier.as_str()));
    }
  }

  for captures in join_require().captures_iter(text) {
    if let (Some(matched), Some(arguments)) = (captures.get(0), captures.get(1)) {
      collector.push(join_pattern(unit_dir, matched, arguments.as_str()));
    }
  }

  let patterns = collector.finish();
  debug!(unit = %unit_path.display(), count = patterns.len(), "extracted load patterns");
  patterns
}

fn literal_pattern(unit_dir: &Path, matched: Match<'_>, specifier: &str) -> PathPattern {
  if is_external_specifier(specifier) {
    let mut pattern = PathPattern::new(PatternKind::Literal, matched.as_str(), specifier);
    pattern.status = ResolutionStatus::External;
    return pattern;
  }

  let normalized = if Path::new(specifier).is_absolute() {
    normalize_lexically(Path::new(specifier))
  } else {
    join_segments([&*unit_dir.to_string_lossy(), specifier])
  };

  PathPattern::new(
    PatternKind::Literal,
    matched.as_str(),
    normalized.to_string_lossy(),
  )
}

fn join_pattern(unit_dir: &Path, matched: Match<'_>, arguments: &str) -> PathPattern {
  let unit_dir = unit_dir.to_string_lossy();
  let segments = classify_arguments(arguments, &unit_dir);
  let mut pattern_string = join_segments(segments.iter().map(|segment| segment.pattern.as_str()))
    .to_string_lossy()
    .into_owned();
  let wildcard_exprs: Vec<String> = segments
    .into_iter()
    .flat_map(|segment| segment.expressions)
    .collect();

  let mut suffix_appended = false;
  if !wildcard_exprs.is_empty() && !looks_like_script(&pattern_string) {
    pattern_string.push_str(".js");
    suffix_appended = true;
  }

  PathPattern::new(
    PatternKind::Join {
      wildcard_exprs,
      suffix_appended,
    },
    matched.as_str(),
    pattern_string,
  )
}

fn looks_like_script(pattern: &str) -> bool {
  let lower = pattern.to_ascii_lowercase();
  lower.ends_with(".js") || lower.ends_with(".json")
}

#[derive(Default)]
struct PatternCollector {
  index: BTreeMap<String, usize>,
  result: Vec<PathPattern>,
}

impl PatternCollector {
  fn push(&mut self, pattern: PathPattern) {
    match self.index.get(&pattern.pattern_string) {
      Some(&position) => {
        let existing = &mut self.result[position];
        if existing.occurrences().all(|text| text != pattern.matched_text) {
          existing.extra_occurrences.push(pattern.matched_text);
        }
      }
      None => {
        self
          .index
          .insert(pattern.pattern_string.clone(), self.result.len());
        self.result.push(pattern);
      }
    }
  }

  fn finish(self) -> Vec<PathPattern> {
    self.result
  }
}
