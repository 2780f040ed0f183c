//! In-memory mock filesystem for testing parsers without real kernel trees.
//!
//! `MockFs` simulates files, directories and symbolic links in memory, so
//! the sysfs and configfs walkers can be tested anywhere.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
///
/// Symlinks are stored with their raw target and never followed: a link
/// whose target is missing behaves like a dangling link on disk.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
    /// Map from link path to its unresolved target.
    symlinks: HashMap<PathBuf, PathBuf>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Adds a symbolic link at `path` pointing to `target`.
    pub fn add_symlink(&mut self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.symlinks.insert(path, target.as_ref().to_path_buf());
    }

    /// Loads a mock filesystem from a directory snapshot, mounted at
    /// `virtual_root`.
    ///
    /// This is useful for regression tests with captured sysfs trees.
    /// Unreadable or binary files are skipped.
    pub fn from_snapshot(dir: &Path, virtual_root: &Path) -> io::Result<Self> {
        let mut fs = Self::new();
        load_directory_recursive(&mut fs, dir, virtual_root)?;
        Ok(fs)
    }
}

fn load_directory_recursive(
    fs: &mut MockFs,
    real_path: &Path,
    virtual_path: &Path,
) -> io::Result<()> {
    fs.add_dir(virtual_path);

    for entry in std::fs::read_dir(real_path)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let real_child = entry.path();
        let virtual_child = virtual_path.join(entry.file_name());

        if file_type.is_symlink() {
            fs.add_symlink(&virtual_child, std::fs::read_link(&real_child)?);
        } else if file_type.is_dir() {
            load_directory_recursive(fs, &real_child, &virtual_child)?;
        } else if file_type.is_file() {
            if let Ok(content) = std::fs::read_to_string(&real_child) {
                fs.add_file(&virtual_child, content);
            }
        }
    }
    Ok(())
}

fn not_found(what: &str, path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found: {:?}", what, path),
    )
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| not_found("file", path))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
            || self.directories.contains(path)
            || self.symlinks.contains_key(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(not_found("directory", path));
        }

        let is_child = |p: &&PathBuf| p.parent().is_some_and(|parent| parent == path);

        let entries: HashSet<PathBuf> = self
            .files
            .keys()
            .chain(self.symlinks.keys())
            .chain(self.directories.iter().filter(|d| d.as_path() != path))
            .filter(is_child)
            .cloned()
            .collect();

        Ok(entries.into_iter().collect())
    }

    fn is_symlink(&self, path: &Path) -> bool {
        self.symlinks.contains_key(path)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        self.symlinks.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a symlink: {:?}", path),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/fs/selinux/avc/cache_threshold", "512\n");

        assert!(fs.exists(Path::new("/sys/fs/selinux/avc/cache_threshold")));
        assert!(fs.exists(Path::new("/sys/fs/selinux")));

        let content = fs
            .read_to_string(Path::new("/sys/fs/selinux/avc/cache_threshold"))
            .unwrap();
        assert_eq!(content, "512\n");
    }

    #[test]
    fn test_mock_fs_read_dir() {
        let mut fs = MockFs::new();
        fs.add_file("/rbd/0/pool", "rbd\n");
        fs.add_file("/rbd/0/name", "disk0\n");
        fs.add_file("/rbd/1/pool", "rbd\n");

        let entries = fs.read_dir(Path::new("/rbd")).unwrap();
        assert_eq!(entries.len(), 2);

        let entries = fs.read_dir(Path::new("/rbd/0")).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_mock_fs_symlinks() {
        let mut fs = MockFs::new();
        fs.add_symlink("/lun/lun_0/7f3a", "../../../../core/iblock_0/disk");
        fs.add_dir("/lun/lun_0/statistics");

        let link = Path::new("/lun/lun_0/7f3a");
        assert!(fs.exists(link));
        assert!(fs.is_symlink(link));
        assert!(!fs.is_symlink(Path::new("/lun/lun_0/statistics")));
        assert_eq!(
            fs.read_link(link).unwrap(),
            PathBuf::from("../../../../core/iblock_0/disk")
        );
        assert!(fs.read_to_string(link).is_err());

        let entries = fs.read_dir(Path::new("/lun/lun_0")).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_mock_fs_not_found() {
        let fs = MockFs::new();
        let result = fs.read_to_string(Path::new("/nonexistent"));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
        assert!(fs.read_dir(Path::new("/nonexistent")).is_err());
        assert!(fs.read_link(Path::new("/nonexistent")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_mock_fs_from_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("bcache/bdev0")).unwrap();
        std::fs::write(dir.path().join("bcache/bdev0/dirty_data"), "1.1M\n").unwrap();
        std::os::unix::fs::symlink("../../block/sdb", dir.path().join("bcache/cache0")).unwrap();

        let fs = MockFs::from_snapshot(dir.path(), Path::new("/sys/fs")).unwrap();
        assert_eq!(
            fs.read_to_string(Path::new("/sys/fs/bcache/bdev0/dirty_data"))
                .unwrap(),
            "1.1M\n"
        );
        assert!(fs.is_symlink(Path::new("/sys/fs/bcache/cache0")));
        assert_eq!(fs.read_dir(Path::new("/sys/fs/bcache")).unwrap().len(), 2);
    }
}
