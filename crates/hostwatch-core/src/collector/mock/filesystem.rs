//! In-memory mock filesystem for testing collectors without real `/proc`.
//!
//! Clones of a `MockFs` share one underlying tree, so a test can hand a
//! clone to a collector and keep changing counters between polls.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::collector::traits::{DiskSpace, FileSystem};

#[derive(Debug, Default)]
struct Tree {
    files: HashMap<PathBuf, String>,
    directories: HashSet<PathBuf>,
    /// Mount point to capacity.
    mounts: HashMap<PathBuf, DiskSpace>,
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
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tree<R>(&self, f: impl FnOnce(&mut Tree) -> R) -> R {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut tree)
    }

    fn read_tree<R>(&self, f: impl FnOnce(&Tree) -> R) -> R {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        f(&tree)
    }

    /// Adds (or replaces) a file. Parent directories are created.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        let content = content.into();
        self.with_tree(|tree| {
            tree.add_parents(&path);
            tree.files.insert(path, content);
        });
    }

    /// Adds an empty directory.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.with_tree(|tree| {
            tree.add_parents(&path);
            tree.directories.insert(path);
        });
    }

    /// Removes a file or a whole directory subtree.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.with_tree(|tree| {
            tree.files.retain(|p, _| !p.starts_with(path));
            tree.directories.retain(|p| !p.starts_with(path));
        });
    }

    /// Registers a mounted filesystem with the given capacity.
    pub fn add_mount(&self, mount_point: impl AsRef<Path>, total_bytes: u64, available_bytes: u64) {
        let mount_point = mount_point.as_ref().to_path_buf();
        self.with_tree(|tree| {
            tree.mounts.insert(
                mount_point,
                DiskSpace {
                    total_bytes,
                    available_bytes,
                },
            );
        });
    }

    /// Adds a process with the `/proc/[pid]/` files the I/O collector reads.
    ///
    /// # Arguments
    /// * `pid` - Process ID
    /// * `comm` - Process name
    /// * `start_time` - Start time in clock ticks since boot (stat field 22)
    /// * `io` - Content of `/proc/[pid]/io`; empty means not readable
    pub fn add_process(&self, pid: u32, comm: &str, start_time: u64, io: &str) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.add_dir(&base);
        self.add_file(
            base.join("stat"),
            format!(
                "{pid} ({comm}) S 1 {pid} {pid} 0 -1 4194304 100 0 0 0 10 5 0 0 20 0 1 0 {start_time} 12345678 100 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0"
            ),
        );
        self.add_file(base.join("comm"), format!("{comm}\n"));
        if !io.is_empty() {
            self.add_file(base.join("io"), io);
        }
    }

    /// Replaces `/proc/[pid]/io` with the given write counter.
    pub fn set_process_writes(&self, pid: u32, write_bytes: u64) {
        self.add_file(
            format!("/proc/{}/io", pid),
            proc_io_content(0, write_bytes, 0, 0),
        );
    }
}

/// Renders a `/proc/[pid]/io` file.
pub fn proc_io_content(read_bytes: u64, write_bytes: u64, syscr: u64, syscw: u64) -> String {
    format!(
        "rchar: {}\nwchar: {}\nsyscr: {syscr}\nsyscw: {syscw}\nread_bytes: {read_bytes}\nwrite_bytes: {write_bytes}\ncancelled_write_bytes: 0\n",
        read_bytes + 1024,
        write_bytes + 1024,
    )
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.read_tree(|tree| tree.files.get(path).cloned()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.read_to_string(path).map(String::into_bytes)
    }

    fn exists(&self, path: &Path) -> bool {
        self.read_tree(|tree| tree.files.contains_key(path) || tree.directories.contains(path))
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.read_tree(|tree| {
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

            let mut entries: Vec<PathBuf> = entries.into_iter().collect();
            entries.sort();
            Ok(entries)
        })
    }

    fn disk_space(&self, path: &Path) -> io::Result<DiskSpace> {
        self.read_tree(|tree| {
            tree.mounts
                .iter()
                .filter(|(mount, _)| path.starts_with(mount))
                .max_by_key(|(mount, _)| mount.as_os_str().len())
                .map(|(_, space)| *space)
        })
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no filesystem mounted at {}", path.display()),
            )
        })
    }
}
