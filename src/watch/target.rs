// src/watch/target.rs

use std::path::{Path, PathBuf};

use crate::errors::{Result, WatchError};

/// The resolved target of a watch: an absolute file path split into its
/// parent directory and final file-name component.
///
/// OS change notifications are registered on the *directory* and carry the
/// file name of the changed entry, so both halves are needed and neither
/// changes after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    directory: PathBuf,
    file_name: PathBuf,
}

impl WatchTarget {
    /// Split `path` into parent directory + file name.
    ///
    /// Fails for paths that have no usable parent (`/`, `""`) or no final
    /// component, and for bare relative names like `hosts` whose parent
    /// would be empty.
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let file_name = path
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| WatchError::InvalidTarget(path.to_path_buf()))?;

        let directory = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .ok_or_else(|| WatchError::InvalidTarget(path.to_path_buf()))?;

        Ok(Self {
            directory,
            file_name,
        })
    }

    /// Directory to register with the watch backend.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File-name component compared against event contexts.
    pub fn file_name(&self) -> &Path {
        &self.file_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn resolves_absolute_file_path() {
        let target = WatchTarget::resolve("/etc/hosts").unwrap();
        assert_eq!(target.directory(), Path::new("/etc"));
        assert_eq!(target.file_name(), Path::new("hosts"));
    }

    #[test]
    fn resolves_nested_path() {
        let target = WatchTarget::resolve("/tmp/t/hosts").unwrap();
        assert_eq!(target.directory(), Path::new("/tmp/t"));
        assert_eq!(target.file_name(), Path::new("hosts"));
    }

    #[test]
    fn rejects_root() {
        assert!(WatchTarget::resolve("/").is_err());
    }

    #[test]
    fn rejects_empty_path() {
        assert!(WatchTarget::resolve("").is_err());
    }

    #[test]
    fn rejects_bare_file_name() {
        // No parent directory to register on.
        assert!(WatchTarget::resolve("hosts").is_err());
    }
}
