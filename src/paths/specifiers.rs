use std::path::Path;

use regex::Regex;

fn relative_specifier() -> &'static Regex {
  use std::sync::OnceLock;

  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"^\.+[\\/]").expect("invalid relative specifier regex"))
}

/// Whether a module specifier is written relative to the requiring file (`./x`, `../x`).
pub fn is_relative_specifier(specifier: &str) -> bool {
  relative_specifier().is_match(specifier)
}

/// Determine whether a literal specifier names a package rather than a file.
///
/// Anything that is neither relative nor absolute is left to the bundler's own module
/// resolution, since it lives under `node_modules` or is a runtime builtin.
pub fn is_external_specifier(specifier: &str) -> bool {
  !is_relative_specifier(specifier) && !Path::new(specifier).is_absolute()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn recognises_relative_specifiers() {
    assert!(is_relative_specifier("./lib"));
    assert!(is_relative_specifier("../lib/util"));
    assert!(is_relative_specifier(".\\lib"));
    assert!(!is_relative_specifier(".hidden"));
  }

  #[test]
  fn packages_and_builtins_are_external() {
    assert!(is_external_specifier("fs"));
    assert!(is_external_specifier("lodash/fp"));
    assert!(is_external_specifier("@scope/pkg"));
  }

  #[test]
  fn absolute_and_relative_paths_are_local() {
    assert!(!is_external_specifier("/srv/app/lib"));
    assert!(!is_external_specifier("./lib"));
  }
}
