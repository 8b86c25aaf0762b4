//! In-memory mock filesystem for testing collectors without real `/proc`.
//!
//! Clones of a `MockFs` share the same backing store, so a test can hand one
//! clone to a collector running on another thread and keep rewriting files
//! through its own clone between ticks.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tree {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
}

impl Tree {
    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }
}

/// In-memory filesystem for testing.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    tree: Arc<RwLock<Tree>>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    // Poisoning is ignored; the tree holds plain data only.
    fn read(&self) -> RwLockReadGuard<'_, Tree> {
        self.tree.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tree> {
        self.tree.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds (or replaces) a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        let mut tree = self.write();
        tree.add_parents(&path);
        tree.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut tree = self.write();
        tree.add_parents(&path);
        tree.directories.insert(path);
    }

    /// Removes a file, simulating a source that disappeared.
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        self.write().files.remove(path.as_ref());
    }

    /// Removes a directory and everything below it.
    pub fn remove_dir_all(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut tree = self.write();
        tree.files.retain(|p, _| !p.starts_with(path));
        tree.directories.retain(|p| !p.starts_with(path));
    }

    /// Adds a network interface with a full `statistics/` directory.
    ///
    /// Every counter in `counters` gets its own file; `speed` is written as-is
    /// so callers can model the `-1` a link-down interface reports.
    pub fn add_interface(&self, sys_path: &str, name: &str, speed: &str, counters: &[(&str, u64)]) {
        let base = PathBuf::from(format!("{}/class/net/{}", sys_path, name));
        self.add_file(base.join("speed"), format!("{}\n", speed));
        self.add_dir(base.join("statistics"));
        for (counter, value) in counters {
            self.add_file(base.join("statistics").join(counter), format!("{}\n", value));
        }
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.read().files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        let tree = self.read();
        tree.files.contains_key(path) || tree.directories.contains(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let tree = self.read();
        if !tree.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let mut entries = HashSet::new();

        for file_path in tree.files.keys() {
            if file_path.parent().is_some_and(|parent| parent == path) {
                entries.insert(file_path.clone());
            }
        }

        for dir_path in &tree.directories {
            if dir_path.parent().is_some_and(|parent| parent == path) && dir_path != path {
                entries.insert(dir_path.clone());
            }
        }

        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let fs = MockFs::new();
        fs.add_file("/proc/meminfo", "MemTotal: 16384 kB\n");

        assert!(fs.exists(Path::new("/proc/meminfo")));
        assert!(fs.exists(Path::new("/proc")));

        let content = fs.read_to_string(Path::new("/proc/meminfo")).unwrap();
        assert_eq!(content, "MemTotal: 16384 kB\n");
    }

    #[test]
    fn test_mock_fs_clones_share_files() {
        let fs = MockFs::new();
        let handed_out = fs.clone();
        fs.add_file("/sys/class/thermal/thermal_zone0/temp", "45000\n");

        let content = handed_out
            .read_to_string(Path::new("/sys/class/thermal/thermal_zone0/temp"))
            .unwrap();
        assert_eq!(content, "45000\n");

        fs.remove_file("/sys/class/thermal/thermal_zone0/temp");
        assert!(
            handed_out
                .read_to_string(Path::new("/sys/class/thermal/thermal_zone0/temp"))
                .is_err()
        );
    }

    #[test]
    fn test_mock_fs_add_interface() {
        let fs = MockFs::new();
        fs.add_interface("/sys", "eth0", "1000", &[("rx_bytes", 10), ("tx_bytes", 20)]);

        let entries = fs
            .read_dir(Path::new("/sys/class/net/eth0/statistics"))
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            fs.read_to_string(Path::new("/sys/class/net/eth0/speed"))
                .unwrap(),
            "1000\n"
        );
    }

    #[test]
    fn test_mock_fs_remove_dir_all() {
        let fs = MockFs::new();
        fs.add_interface("/sys", "wlan0", "-1", &[("rx_bytes", 1)]);
        fs.remove_dir_all("/sys/class/net/wlan0/statistics");

        assert!(
            fs.read_dir(Path::new("/sys/class/net/wlan0/statistics"))
                .is_err()
        );
        assert!(fs.exists(Path::new("/sys/class/net/wlan0/speed")));
    }

    #[test]
    fn test_mock_fs_not_found() {
        let fs = MockFs::new();
        let result = fs.read_to_string(Path::new("/nonexistent"));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
