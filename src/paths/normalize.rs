use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};

/// Resolve `.` and `..` components without touching the filesystem.
///
/// `..` never climbs above the root of an absolute path; on a relative path it is kept once
/// there is nothing left to pop.
pub fn normalize_lexically(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => match normalized.components().next_back() {
        Some(Component::Normal(_)) => {
          normalized.pop();
        }
        Some(Component::RootDir | Component::Prefix(_)) => {}
        _ => normalized.push(".."),
      },
      other => normalized.push(other.as_os_str()),
    }
  }
  normalized
}

/// Join path segments the way a runtime `path.join` does: by concatenation, so a later
/// absolute segment does not discard earlier ones.
pub fn join_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> PathBuf {
  let separator = MAIN_SEPARATOR.to_string();
  let joined = segments.into_iter().collect::<Vec<_>>().join(&separator);
  normalize_lexically(Path::new(&joined))
}
