/*
 * memory.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * In-memory filesystem runtime.
 */

//! An in-memory implementation of [`SystemRuntime`].
//!
//! Every file carries its own modification time. Writes stamp files from a
//! logical clock that advances by one second per write, so "written later"
//! always means "newer" without depending on the wall clock. Tests that need
//! exact timestamps use [`MemoryRuntime::add_file_with_mtime`] or
//! [`MemoryRuntime::touch`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::traits::{
    FileListing, PathKind, PathMetadata, RuntimeError, RuntimeResult, SystemRuntime, unix_mtime,
};

#[derive(Debug, Clone)]
struct MemoryFile {
    contents: Vec<u8>,
    modified: SystemTime,
}

#[derive(Debug, Default)]
struct MemoryFs {
    files: BTreeMap<PathBuf, MemoryFile>,
    directories: BTreeSet<PathBuf>,
    clock: u64,
}

impl MemoryFs {
    fn tick(&mut self) -> SystemTime {
        self.clock += 1;
        UNIX_EPOCH + Duration::from_secs(self.clock)
    }

    fn insert(&mut self, path: PathBuf, contents: Vec<u8>, modified: SystemTime) {
        let mut current = PathBuf::new();
        if let Some(parent) = path.parent() {
            for component in parent.components() {
                current.push(component);
                self.directories.insert(current.clone());
            }
        }
        self.files.insert(path, MemoryFile { contents, modified });
    }
}

/// Runtime backed by an in-memory file map.
///
/// Relative paths are resolved against `/`.
#[derive(Debug, Default)]
pub struct MemoryRuntime {
    fs: RwLock<MemoryFs>,
}

impl MemoryRuntime {
    /// Create an empty in-memory filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a file, stamping it with the next logical time.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> &Self {
        let mut fs = self.fs.write().unwrap_or_else(PoisonError::into_inner);
        let modified = fs.tick();
        fs.insert(normalize(path.as_ref()), contents.into(), modified);
        self
    }

    /// Add (or replace) a file with an explicit mtime in Unix seconds.
    pub fn add_file_with_mtime(
        &self,
        path: impl AsRef<Path>,
        contents: impl Into<Vec<u8>>,
        mtime: u64,
    ) -> &Self {
        let mut fs = self.fs.write().unwrap_or_else(PoisonError::into_inner);
        let modified = UNIX_EPOCH + Duration::from_secs(mtime);
        fs.insert(normalize(path.as_ref()), contents.into(), modified);
        self
    }

    /// Set a file's mtime (Unix seconds). Returns false if the file does not exist.
    pub fn touch(&self, path: impl AsRef<Path>, mtime: u64) -> bool {
        let mut fs = self.fs.write().unwrap_or_else(PoisonError::into_inner);
        match fs.files.get_mut(&normalize(path.as_ref())) {
            Some(file) => {
                file.modified = UNIX_EPOCH + Duration::from_secs(mtime);
                true
            }
            None => false,
        }
    }

    /// Remove a file. Returns true if it existed.
    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        let mut fs = self.fs.write().unwrap_or_else(PoisonError::into_inner);
        fs.files.remove(&normalize(path.as_ref())).is_some()
    }
}

impl SystemRuntime for MemoryRuntime {
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let fs = self.fs.read().unwrap_or_else(PoisonError::into_inner);
        let normalized = normalize(path);
        fs.files
            .get(&normalized)
            .map(|file| file.contents.clone())
            .ok_or(RuntimeError::NotFound(normalized))
    }

    fn file_write(&self, path: &Path, contents: &[u8]) -> RuntimeResult<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn path_exists(&self, path: &Path) -> RuntimeResult<bool> {
        let fs = self.fs.read().unwrap_or_else(PoisonError::into_inner);
        let normalized = normalize(path);
        Ok(fs.files.contains_key(&normalized) || fs.directories.contains(&normalized))
    }

    fn path_metadata(&self, path: &Path) -> RuntimeResult<PathMetadata> {
        let fs = self.fs.read().unwrap_or_else(PoisonError::into_inner);
        let normalized = normalize(path);
        if let Some(file) = fs.files.get(&normalized) {
            Ok(PathMetadata {
                kind: PathKind::File,
                size: file.contents.len() as u64,
                modified: Some(file.modified),
            })
        } else if fs.directories.contains(&normalized) {
            Ok(PathMetadata {
                kind: PathKind::Directory,
                size: 0,
                modified: None,
            })
        } else {
            Err(RuntimeError::NotFound(normalized))
        }
    }

    fn list_files(&self, dir: &Path, extension: &str) -> RuntimeResult<Vec<FileListing>> {
        let fs = self.fs.read().unwrap_or_else(PoisonError::into_inner);
        let root = normalize(dir);
        if !fs.directories.contains(&root) {
            return Err(RuntimeError::NotFound(root));
        }
        let listing = fs
            .files
            .iter()
            .filter(|(path, _)| path.extension().is_some_and(|ext| ext == extension))
            .filter_map(|(path, file)| {
                let relative = path.strip_prefix(&root).ok()?;
                Some(FileListing {
                    relative_path: relative.to_path_buf(),
                    mtime: unix_mtime(file.modified),
                })
            })
            .collect();
        Ok(listing)
    }
}

/// Make a path absolute (against `/`) and collapse `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_write_roundtrip() {
        let runtime = MemoryRuntime::new();
        runtime
            .file_write(Path::new("docs/index.rst"), b"Hello")
            .unwrap();
        assert_eq!(
            runtime.file_read_string(Path::new("/docs/index.rst")).unwrap(),
            "Hello"
        );
        assert!(runtime.path_exists(Path::new("/docs")).unwrap());
    }

    #[test]
    fn test_missing_file() {
        let runtime = MemoryRuntime::new();
        let err = runtime.file_read(Path::new("/nope.rst")).unwrap_err();
        assert!(matches!(err, RuntimeError::NotFound(p) if p == Path::new("/nope.rst")));
    }

    #[test]
    fn test_logical_clock_is_monotonic() {
        let runtime = MemoryRuntime::new();
        runtime.add_file("/a.rst", "a").add_file("/b.rst", "b");
        let a = runtime.mtime(Path::new("/a.rst")).unwrap();
        let b = runtime.mtime(Path::new("/b.rst")).unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_touch_sets_mtime() {
        let runtime = MemoryRuntime::new();
        runtime.add_file_with_mtime("/a.rst", "a", 100);
        assert!(runtime.touch("/a.rst", 250));
        assert!(!runtime.touch("/missing.rst", 250));
        assert_eq!(runtime.mtime(Path::new("/a.rst")).unwrap(), 250);
    }

    #[test]
    fn test_list_files_filters_extension() {
        let runtime = MemoryRuntime::new();
        runtime
            .add_file_with_mtime("/docs/index.rst", "", 10)
            .add_file_with_mtime("/docs/guide/install.rst", "", 20)
            .add_file_with_mtime("/docs/notes.txt", "", 30)
            .add_file_with_mtime("/other/skip.rst", "", 40);

        let listing = runtime.list_files(Path::new("/docs"), "rst").unwrap();
        assert_eq!(
            listing,
            vec![
                FileListing {
                    relative_path: PathBuf::from("guide/install.rst"),
                    mtime: 20,
                },
                FileListing {
                    relative_path: PathBuf::from("index.rst"),
                    mtime: 10,
                },
            ]
        );
    }

    #[test]
    fn test_list_missing_directory() {
        let runtime = MemoryRuntime::new();
        assert!(runtime.list_files(Path::new("/docs"), "rst").is_err());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/../x")), PathBuf::from("/x"));
    }
}
