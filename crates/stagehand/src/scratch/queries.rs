//! Pure path helpers for the scratch registry.
//!
//! Registry membership is checked by normalized absolute path, so every path
//! entering the registry passes through [`normalize`] first.

use std::path::{Component, Path, PathBuf};

use super::types::ResourceKind;

/// Expand a leading `~` component against the user's home directory.
///
/// Paths without a leading `~`, and environments without a resolvable home,
/// pass through unchanged.
pub(crate) fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    directories::BaseDirs::new().map_or_else(
        || path.to_path_buf(),
        |base| base.home_dir().join(rest),
    )
}

/// Normalize a path to the absolute, tilde-expanded form used for registry
/// identity. Relative paths are resolved against the current directory.
///
/// Symlinks are not resolved: resources are tracked under the name the
/// caller handed out, not the name the filesystem stores them under.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let expanded = expand_tilde(path);
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    };
    collapse_dots(&absolute)
}

/// Lexically resolve `.` and `..` components so that `/tmp/x/../a` and
/// `/tmp/a` share one registry identity. `..` at the root collapses to the
/// root itself.
fn collapse_dots(path: &Path) -> PathBuf {
    let mut collapsed = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Returns false only at the root, where `..` is a no-op.
                let _ = collapsed.pop();
            }
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                collapsed.push(component.as_os_str());
            }
        }
    }
    collapsed
}

/// Probe the filesystem kind of a path. `None` if it does not exist.
pub(crate) fn kind_of(path: &Path) -> Option<ResourceKind> {
    if path.is_dir() {
        Some(ResourceKind::Directory)
    } else if path.exists() {
        Some(ResourceKind::File)
    } else {
        None
    }
}
