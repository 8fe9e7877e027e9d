//! Textual substitution of resolved load expressions with registry lookups.

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::{NoExpand, Regex};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{PackError, Result};
use crate::models::SourceUnit;
use crate::project::PackLayout;
use crate::registry::js_string;

fn use_strict_directive() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"^\s*['"]use strict['"]\s*;?"#).expect("invalid use strict regex")
  })
}

/// Build a matcher for `text` that accepts either quote character wherever it had one.
pub fn occurrence_matcher(text: &str) -> std::result::Result<Regex, regex::Error> {
  let escaped = regex::escape(text).replace(['\'', '"'], r#"['"]"#);
  Regex::new(&escaped)
}

/// Produce the rewritten text of a unit.
///
/// Every occurrence of a pattern with a replacement is substituted. Patterns without one
/// (external, unresolved or failed) are left exactly as written. The registry import is
/// placed at the top, after a leading `use strict` directive or shebang.
pub fn rewrite_text(layout: &PackLayout, unit: &SourceUnit) -> String {
  let mut text = unit.raw_text.clone();

  for pattern in &unit.patterns {
    let Some(replacement) = pattern.replacement_expr.as_deref() else {
      continue;
    };

    for occurrence in pattern.occurrences() {
      match occurrence_matcher(occurrence) {
        Ok(matcher) => {
          text = matcher
            .replace_all(&text, NoExpand(replacement))
            .into_owned();
        }
        Err(err) => {
          warn!(%occurrence, error = %err, "could not build matcher, occurrence left as written");
        }
      }
    }
  }

  let import = format!("require({});\n", js_string(&layout.registry_import_for(&unit.path)));
  inject_import(&text, &import)
}

/// Insert `import` at the top of `text`, keeping a shebang and `use strict` ahead of it.
pub fn inject_import(text: &str, import: &str) -> String {
  let (shebang, rest) = split_shebang(text);
  let mut head = shebang.to_string();
  if !head.is_empty() && !head.ends_with('\n') {
    head.push('\n');
  }

  match use_strict_directive().find(rest) {
    Some(directive) => format!("{head}'use strict';\n{import}{}", &rest[directive.end()..]),
    None => format!("{head}{import}{rest}"),
  }
}

fn split_shebang(text: &str) -> (&str, &str) {
  if !text.starts_with("#!") {
    return ("", text);
  }
  match text.find('\n') {
    Some(end) => text.split_at(end + 1),
    None => (text, ""),
  }
}

/// Rewrite a unit and write it to its mirror under the output root.
pub async fn write_rewritten(layout: &PackLayout, unit: &mut SourceUnit) -> Result<PathBuf> {
  let text = rewrite_text(layout, unit);
  let output = layout.output_path_for(&unit.path);

  if let Some(parent) = output.parent() {
    fs::create_dir_all(parent)
      .await
      .map_err(|source| PackError::UnitIo {
        path: output.clone(),
        source,
      })?;
  }
  fs::write(&output, &text)
    .await
    .map_err(|source| PackError::UnitIo {
      path: output.clone(),
      source,
    })?;

  debug!(source = %unit.path.display(), output = %output.display(), "wrote rewritten unit");
  unit.rewritten_text = Some(text);
  Ok(output)
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use crate::config::PackConfig;
  use crate::models::{PathPattern, PatternKind, ResolutionStatus};
  use std::path::Path;
  use tempfile::tempdir;

  fn layout(root: &Path) -> PackLayout {
    PackConfig::default().into_layout(root)
  }

  fn unit(text: &str, patterns: Vec<PathPattern>) -> SourceUnit {
    SourceUnit {
      path: PathBuf::from("/srv/app/api/index.js"),
      raw_text: text.to_string(),
      patterns,
      rewritten_text: None,
    }
  }

  fn resolved(matched: &str, replacement: &str) -> PathPattern {
    let mut pattern = PathPattern::new(PatternKind::Literal, matched, "/srv/app/lib");
    pattern.status = ResolutionStatus::Resolved;
    pattern.replacement_expr = Some(replacement.to_string());
    pattern
  }

  #[test]
  fn matcher_accepts_either_quote_style() {
    let matcher = occurrence_matcher("require('./lib')").unwrap();
    assert!(matcher.is_match("require(\"./lib\")"));
    assert!(matcher.is_match("require('./lib')"));
    assert!(!matcher.is_match("require('./lib2')"));
  }

  #[test]
  fn matcher_escapes_regex_syntax() {
    let matcher = occurrence_matcher("require(path.join(a, 'x*'))").unwrap();
    assert!(matcher.is_match("require(path.join(a, \"x*\"))"));
    assert!(!matcher.is_match("require(pathXjoin(a, 'xx'))"));
  }

  #[test]
  fn replaces_every_occurrence_and_injects_import() {
    let unit = unit(
      "const a = require('./lib');\nconst b = require(\"./lib\");\n",
      vec![resolved("require('./lib')", "global.bundleDeps[\"lib/index.js\"]")],
    );

    let text = rewrite_text(&layout(Path::new("/srv/app")), &unit);
    assert_eq!(
      text,
      "require(\"../bundle.deps.js\");\n\
const a = global.bundleDeps[\"lib/index.js\"];\n\
const b = global.bundleDeps[\"lib/index.js\"];\n"
    );
  }

  #[test]
  fn replacement_dollar_signs_are_literal() {
    let unit = unit(
      "require('./lib')",
      vec![resolved("require('./lib')", "global.$deps[\"lib\"]")],
    );
    let text = rewrite_text(&layout(Path::new("/srv/app")), &unit);
    assert!(text.ends_with("global.$deps[\"lib\"]"));
  }

  #[test]
  fn unresolved_patterns_are_left_as_written() {
    let mut pattern = PathPattern::new(PatternKind::Literal, "require('./gone')", "/srv/app/api/gone");
    pattern.status = ResolutionStatus::NotFound;
    let unit = unit("require('./gone');", vec![pattern]);

    let text = rewrite_text(&layout(Path::new("/srv/app")), &unit);
    assert!(text.ends_with("require('./gone');"));
  }

  #[test]
  fn use_strict_stays_first() {
    let text = inject_import("\"use strict\";\nmodule.exports = 1;\n", "require(\"../deps.js\");\n");
    assert_eq!(
      text,
      "'use strict';\nrequire(\"../deps.js\");\n\nmodule.exports = 1;\n"
    );
  }

  #[test]
  fn shebang_stays_first() {
    let text = inject_import("#!/usr/bin/env node\nrun();\n", "require(\"./deps.js\");\n");
    assert_eq!(text, "#!/usr/bin/env node\nrequire(\"./deps.js\");\nrun();\n");
  }

  #[tokio::test]
  async fn writes_to_the_mirrored_output_path() {
    let dir = tempdir().unwrap();
    let layout = layout(dir.path());
    let mut unit = SourceUnit {
      path: dir.path().join("orders/index.js"),
      raw_text: "module.exports = 1;\n".into(),
      patterns: Vec::new(),
      rewritten_text: None,
    };

    let output = write_rewritten(&layout, &mut unit).await.unwrap();
    assert_eq!(output, dir.path().join("dist/orders/index.js"));
    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written, "require(\"../bundle.deps.js\");\nmodule.exports = 1;\n");
    assert_eq!(unit.rewritten_text.as_deref(), Some(written.as_str()));
  }
}
