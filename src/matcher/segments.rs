//! Segment matching of candidate paths against wildcard patterns.

use std::path::MAIN_SEPARATOR;

use crate::models::WILDCARD;

/// Decide whether `path` satisfies `pattern`.
///
/// The pattern is split on wildcards into literal fragments. The first fragment must prefix
/// the path and interior fragments must appear in order. For a file the last fragment must be
/// a suffix. A directory is judged on whether it could still contain a match, so shallow
/// directories and interior misses are accepted where the remaining depth cannot rule a match
/// out.
pub fn segment_matches(path: &str, pattern: &str, is_dir: bool) -> bool {
  let fragments: Vec<&str> = pattern.split(WILDCARD).collect();
  let last = fragments.len() - 1;
  let mut remaining = path;

  for (index, fragment) in fragments.iter().enumerate() {
    if index == last {
      return tail_matches(remaining, fragment, is_dir);
    }

    if index == 0 {
      match remaining.strip_prefix(fragment) {
        Some(rest) => remaining = rest,
        None => return false,
      }
      continue;
    }

    match remaining.find(fragment) {
      Some(position) => remaining = &remaining[position + fragment.len()..],
      None if is_dir => return directory_may_contain(remaining, fragment),
      None => return false,
    }
  }

  false
}

fn tail_matches(remaining: &str, fragment: &str, is_dir: bool) -> bool {
  if remaining.ends_with(fragment) {
    return true;
  }
  is_dir && separator_count(remaining) < 2
}

/// Fallback for a directory whose remaining path does not contain an interior fragment.
///
/// Only the part of the fragment before its last separator is required. Without a separator
/// the fragment fits inside a deeper entry name, so the directory is kept.
fn directory_may_contain(remaining: &str, fragment: &str) -> bool {
  let Some(cut) = fragment.rfind(MAIN_SEPARATOR) else {
    return true;
  };
  let directory_part = &fragment[..cut];
  if directory_part.is_empty() {
    return true;
  }

  match remaining.find(directory_part) {
    Some(position) => remaining[position + directory_part.len()..].trim().is_empty(),
    // The directory is still inside the span of the current wildcard segment.
    None => !remaining.contains(MAIN_SEPARATOR),
  }
}

fn separator_count(text: &str) -> usize {
  text.matches(MAIN_SEPARATOR).count()
}
