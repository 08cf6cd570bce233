/*
 * traits.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Defines the SystemRuntime trait and supporting types.
 */

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug)]
pub enum RuntimeError {
    /// Standard I/O error
    Io(io::Error),

    /// The path does not exist
    NotFound(PathBuf),

    /// File contents were not valid UTF-8
    InvalidUtf8(PathBuf),

    /// Operation not supported on this runtime
    NotSupported(String),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::Io(e) => write!(f, "I/O error: {}", e),
            RuntimeError::NotFound(path) => write!(f, "Path not found: {}", path.display()),
            RuntimeError::InvalidUtf8(path) => {
                write!(f, "File is not valid UTF-8: {}", path.display())
            }
            RuntimeError::NotSupported(msg) => write!(f, "Operation not supported: {}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> Self {
        RuntimeError::Io(e)
    }
}

/// Type of filesystem path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// Metadata about a file or directory
#[derive(Debug, Clone)]
pub struct PathMetadata {
    /// Type of path (file or directory)
    pub kind: PathKind,
    /// Size in bytes (for files)
    pub size: u64,
    /// Last modification time
    pub modified: Option<SystemTime>,
}

impl PathMetadata {
    /// Modification time as whole seconds since the Unix epoch.
    pub fn mtime(&self) -> i64 {
        self.modified.map_or(0, unix_mtime)
    }
}

/// One file discovered by [`SystemRuntime::list_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListing {
    /// Path relative to the listed directory
    pub relative_path: PathBuf,
    /// Modification time in seconds since the Unix epoch
    pub mtime: i64,
}

/// Convert a [`SystemTime`] to seconds since the Unix epoch.
///
/// Times before the epoch are reported as negative values.
pub fn unix_mtime(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_secs()).unwrap_or(i64::MAX),
    }
}

/// The filesystem capability consumed by the parser and the build cache.
///
/// Implementations must be usable behind an `Arc` and shared across the
/// parse of many files.
pub trait SystemRuntime: Send + Sync {
    /// Read a file's raw bytes.
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Read a file as UTF-8 text.
    fn file_read_string(&self, path: &Path) -> RuntimeResult<String> {
        let bytes = self.file_read(path)?;
        String::from_utf8(bytes).map_err(|_| RuntimeError::InvalidUtf8(path.to_path_buf()))
    }

    /// Write a file, creating parent directories as needed.
    fn file_write(&self, path: &Path, contents: &[u8]) -> RuntimeResult<()>;

    /// Check whether a path exists.
    fn path_exists(&self, path: &Path) -> RuntimeResult<bool>;

    /// Get metadata for a path.
    fn path_metadata(&self, path: &Path) -> RuntimeResult<PathMetadata>;

    /// Modification time of a path in seconds since the Unix epoch.
    fn mtime(&self, path: &Path) -> RuntimeResult<i64> {
        Ok(self.path_metadata(path)?.mtime())
    }

    /// Recursively list the files under `dir` whose extension equals
    /// `extension` (without the leading dot). Results are sorted by path.
    fn list_files(&self, dir: &Path, extension: &str) -> RuntimeResult<Vec<FileListing>>;
}
