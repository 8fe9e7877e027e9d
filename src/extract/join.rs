//! Classification of `path.join(...)` argument lists.

use crate::models::WILDCARD;

/// Identifier that evaluates to the requiring file's directory.
pub const DIRNAME: &str = "__dirname";

/// One argument of a join call after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSegment {
  /// Literal text with a [`WILDCARD`] for each runtime section.
  pub pattern: String,
  /// Source text of each runtime section, in order.
  pub expressions: Vec<String>,
}

/// Classify every comma-separated argument of a join call.
///
/// Each argument may concatenate several sections with `+`. Quoted sections contribute their
/// contents, `__dirname` contributes `unit_dir`, and anything else becomes a wildcard.
pub fn classify_arguments(arguments: &str, unit_dir: &str) -> Vec<JoinSegment> {
  split_top_level(arguments, ',')
    .into_iter()
    .map(|argument| classify_argument(argument, unit_dir))
    .collect()
}

fn classify_argument(argument: &str, unit_dir: &str) -> JoinSegment {
  let mut pattern = String::new();
  let mut expressions = Vec::new();

  for section in split_top_level(argument, '+') {
    let section = section.trim();
    if section == DIRNAME {
      pattern.push_str(unit_dir);
    } else if let Some(literal) = unquote(section) {
      pattern.push_str(literal);
    } else {
      pattern.push(WILDCARD);
      expressions.push(section.to_string());
    }
  }

  JoinSegment { pattern, expressions }
}

/// Contents of a single- or double-quoted string, or a backtick string without interpolation.
pub fn unquote(section: &str) -> Option<&str> {
  let mut chars = section.chars();
  let open = chars.next()?;
  if !matches!(open, '\'' | '"' | '`') || section.len() < 2 || !section.ends_with(open) {
    return None;
  }
  let inner = &section[1..section.len() - 1];
  if open == '`' && inner.contains("${") {
    return None;
  }
  Some(inner)
}

/// Split on `separator` outside of quoted strings.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
  let mut parts = Vec::new();
  let mut quote: Option<char> = None;
  let mut escaped = false;
  let mut start = 0;

  for (index, ch) in text.char_indices() {
    if escaped {
      escaped = false;
      continue;
    }
    match (quote, ch) {
      (Some(_), '\\') => escaped = true,
      (Some(open), ch) if ch == open => quote = None,
      (None, '\'' | '"' | '`') => quote = Some(ch),
      (None, ch) if ch == separator => {
        parts.push(&text[start..index]);
        start = index + ch.len_utf8();
      }
      _ => {}
    }
  }
  parts.push(&text[start..]);
  parts
}
