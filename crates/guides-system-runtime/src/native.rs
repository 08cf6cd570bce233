/*
 * native.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Native runtime backed by std::fs.
 */

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

use crate::traits::{
    FileListing, PathKind, PathMetadata, RuntimeError, RuntimeResult, SystemRuntime, unix_mtime,
};

/// Runtime with full access to the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeRuntime;

impl NativeRuntime {
    pub fn new() -> Self {
        Self
    }
}

fn not_found(path: &Path, err: io::Error) -> RuntimeError {
    if err.kind() == io::ErrorKind::NotFound {
        RuntimeError::NotFound(path.to_path_buf())
    } else {
        RuntimeError::Io(err)
    }
}

impl SystemRuntime for NativeRuntime {
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        fs::read(path).map_err(|e| not_found(path, e))
    }

    fn file_write(&self, path: &Path, contents: &[u8]) -> RuntimeResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    fn path_exists(&self, path: &Path) -> RuntimeResult<bool> {
        Ok(path.try_exists()?)
    }

    fn path_metadata(&self, path: &Path) -> RuntimeResult<PathMetadata> {
        let meta = fs::metadata(path).map_err(|e| not_found(path, e))?;
        let kind = if meta.is_dir() {
            PathKind::Directory
        } else {
            PathKind::File
        };
        Ok(PathMetadata {
            kind,
            size: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    fn list_files(&self, dir: &Path, extension: &str) -> RuntimeResult<Vec<FileListing>> {
        if !dir.is_dir() {
            return Err(RuntimeError::NotFound(dir.to_path_buf()));
        }

        let mut listing = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == extension) {
                continue;
            }
            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };
            let mtime = entry
                .metadata()
                .ok()
                .and_then(|meta| meta.modified().ok())
                .map_or(0, unix_mtime);
            listing.push(FileListing {
                relative_path: relative.to_path_buf(),
                mtime,
            });
        }
        Ok(listing)
    }
}
