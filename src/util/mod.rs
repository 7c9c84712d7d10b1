//! Path helpers shared by the config loader and the executor.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolves `path` against `base` and normalizes it lexically.
///
/// Absolute paths ignore `base`. `.` components are dropped and `..` pops the
/// previous component but never climbs above the root. The filesystem is not
/// consulted, so the result may name a path that does not exist.
///
/// # Examples
///
/// ```
/// use long_run_command_mcp::util::resolve_path;
/// use std::path::{Path, PathBuf};
///
/// # #[cfg(unix)]
/// # {
/// let resolved = resolve_path(Path::new("/srv/app"), Path::new("../logs/./out"));
/// assert_eq!(resolved, PathBuf::from("/srv/logs/out"));
///
/// let absolute = resolve_path(Path::new("/srv/app"), Path::new("/tmp"));
/// assert_eq!(absolute, PathBuf::from("/tmp"));
/// # }
/// ```
#[must_use]
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if normalized.file_name().is_some() {
                    normalized.pop();
                }
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Resolves `path` against the process's current directory.
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined.
pub fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(resolve_path(&cwd, path))
}
