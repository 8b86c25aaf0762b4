//! Abstractions for filesystem access to enable testing and mocking.
//!
//! Every collector reads its kernel sources through the `FileSystem` trait,
//! so the whole engine runs against the real `/proc` and `/sys` trees on a Pi
//! and against [`MockFs`](crate::collector::MockFs) everywhere else.

use std::io;
use std::path::{Path, PathBuf};

/// Abstraction for filesystem operations.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    ///
    /// A fresh read is performed on every call; no handle outlives it.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Lists entries in a directory.
    ///
    /// # Returns
    /// A vector of paths to entries in the directory, or an I/O error.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)?;
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        Ok(paths)
    }
}

impl<F: FileSystem + ?Sized> FileSystem for std::sync::Arc<F> {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        (**self).read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        (**self).read_dir(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_real_fs_read_to_string() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("temp");
        fs::write(&temp, "48312\n").unwrap();

        let content = RealFs::new().read_to_string(&temp).unwrap();
        assert_eq!(content, "48312\n");
    }

    #[test]
    fn test_real_fs_exists() {
        let dir = tempfile::tempdir().unwrap();
        let fs = RealFs::new();
        assert!(fs.exists(dir.path()));
        assert!(!fs.exists(Path::new("/nonexistent/path/12345")));
    }

    #[test]
    fn test_real_fs_read_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("rx_bytes"), "1\n").unwrap();
        fs::write(dir.path().join("tx_bytes"), "2\n").unwrap();

        let mut entries = RealFs::new().read_dir(dir.path()).unwrap();
        entries.sort();
        assert_eq!(
            entries,
            vec![dir.path().join("rx_bytes"), dir.path().join("tx_bytes")]
        );
    }

    #[test]
    fn test_real_fs_read_dir_missing() {
        assert!(RealFs::new().read_dir(Path::new("/nonexistent/dir/12345")).is_err());
    }
}
