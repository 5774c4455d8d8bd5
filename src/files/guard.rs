//! Path confinement for the file tools.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Resolves caller-supplied paths and keeps them under the allowed roots.
///
/// `.` and `..` are folded lexically. The containment check then runs on
/// the real location: the deepest existing ancestor is canonicalized and the
/// missing tail rejoined, so symlinks cannot lead out of a root while paths
/// that do not exist yet (write targets) still resolve.
#[derive(Debug, Clone, Default)]
pub struct PathGuard {
    roots: Vec<PathBuf>,
}

impl PathGuard {
    /// Guard confining paths to `roots`. An empty list allows everything.
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots
                .into_iter()
                .map(|r| {
                    let r = normalize(&r);
                    fs::canonicalize(&r).unwrap_or(r)
                })
                .collect(),
        }
    }

    /// Guard that allows any path.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Whether any roots are configured.
    pub fn is_restricted(&self) -> bool {
        !self.roots.is_empty()
    }

    /// Resolve `raw` to an absolute path the tools may use.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::InvalidParams("path must not be empty".into()));
        }

        let path = normalize(Path::new(raw));
        if !self.is_restricted() {
            return Ok(path);
        }

        let inside = real_location(&path)
            .map(|real| self.roots.iter().any(|root| real.starts_with(root)))
            .unwrap_or(false);
        if !inside {
            return Err(Error::PermissionDenied(format!(
                "'{}' is outside the allowed directories",
                raw
            )));
        }
        Ok(path)
    }
}

/// Where `path` actually points: its deepest existing ancestor canonicalized,
/// with the not-yet-existing tail appended. `None` for a dangling symlink.
fn real_location(path: &Path) -> Option<PathBuf> {
    for ancestor in path.ancestors() {
        match fs::canonicalize(ancestor) {
            Ok(real) => {
                let tail = path.strip_prefix(ancestor).ok()?;
                return Some(real.join(tail));
            }
            // Exists as a link but its target does not.
            Err(_) if fs::symlink_metadata(ancestor).is_ok() => return None,
            Err(_) => {}
        }
    }
    None
}

/// Absolute, lexically normalized form of `path`.
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_dots() {
        assert_eq!(
            normalize(Path::new("/srv/data/./a/../b.txt")),
            PathBuf::from("/srv/data/b.txt")
        );
        assert_eq!(normalize(Path::new("/../..")), PathBuf::from("/"));
    }

    #[test]
    fn test_unrestricted_allows_anything() {
        let guard = PathGuard::unrestricted();
        assert_eq!(guard.resolve("/etc/hosts").unwrap(), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn test_restricted_blocks_escape() {
        let root = tempfile::TempDir::new().unwrap();
        let base = root.path().to_string_lossy().into_owned();
        let guard = PathGuard::new([root.path().to_path_buf()]);
        assert!(guard.resolve(&format!("{}/notes.md", base)).is_ok());
        assert!(matches!(
            guard.resolve(&format!("{}/../secrets.txt", base)),
            Err(Error::PermissionDenied(_))
        ));
        // Prefix match is per component, not per character.
        assert!(guard.resolve(&format!("{}2/x", base)).is_err());
    }

    #[test]
    fn test_empty_path_is_invalid() {
        let guard = PathGuard::unrestricted();
        assert!(matches!(guard.resolve("  "), Err(Error::InvalidParams(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_out_of_root_is_denied() {
        let root = tempfile::TempDir::new().unwrap();
        let outside = tempfile::TempDir::new().unwrap();
        fs::write(outside.path().join("secret.txt"), "top secret").unwrap();
        std::os::unix::fs::symlink(outside.path(), root.path().join("link")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("missing"),
            root.path().join("dangling"),
        )
        .unwrap();

        let guard = PathGuard::new([root.path().to_path_buf()]);
        let secret = root.path().join("link/secret.txt");
        assert!(matches!(
            guard.resolve(&secret.to_string_lossy()),
            Err(Error::PermissionDenied(_))
        ));
        let through_link = root.path().join("link/new.txt");
        assert!(guard.resolve(&through_link.to_string_lossy()).is_err());
        let dangling = root.path().join("dangling");
        assert!(guard.resolve(&dangling.to_string_lossy()).is_err());
    }

    #[test]
    fn test_missing_write_target_inside_root_resolves() {
        let root = tempfile::TempDir::new().unwrap();
        let guard = PathGuard::new([root.path().to_path_buf()]);
        let target = root.path().join("notes/2024/today.md");
        assert_eq!(
            guard.resolve(&target.to_string_lossy()).unwrap(),
            normalize(&target)
        );
    }
}
