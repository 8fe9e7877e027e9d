use std::path::Path;

/// Produce the registry key for an absolute file path.
///
/// Keys are relative to the project root and always use forward slashes so the generated
/// registry works on every platform. Paths outside the root keep their absolute spelling.
pub fn registry_key(root: &Path, file: &Path) -> String {
  let relative = file.strip_prefix(root).unwrap_or(file);
  relative.to_string_lossy().replace('\\', "/")
}

/// Drop a trailing `.js` (any case) from a key, if present.
pub fn strip_script_extension(key: &str) -> Option<&str> {
  let split = key.len().checked_sub(3)?;
  let (stem, extension) = key.split_at_checked(split)?;
  extension.eq_ignore_ascii_case(".js").then_some(stem)
}
