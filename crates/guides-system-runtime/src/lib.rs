/*
 * guides-system-runtime
 * Copyright (c) 2025 Posit, PBC
 *
 * Filesystem abstraction for the guides toolchain.
 *
 * The parser and the rebuild cache never touch std::fs directly. They go
 * through the SystemRuntime trait so they can run against:
 *
 * - NativeRuntime: the real filesystem (std::fs + walkdir)
 * - MemoryRuntime: an in-memory filesystem with controllable mtimes
 */

mod memory;
mod native;
mod traits;

use std::sync::Arc;

pub use traits::{
    FileListing, PathKind, PathMetadata, RuntimeError, RuntimeResult, SystemRuntime, unix_mtime,
};

pub use memory::MemoryRuntime;
pub use native::NativeRuntime;

/// A runtime shared between the build driver and every per-file parse.
pub type SharedRuntime = Arc<dyn SystemRuntime>;

/// Create a runtime backed by the real filesystem.
pub fn default_runtime() -> NativeRuntime {
    NativeRuntime::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_shared_runtime_is_object_safe() {
        let runtime: SharedRuntime = Arc::new(MemoryRuntime::new());
        runtime.file_write(Path::new("/docs/index.rst"), b"Title").unwrap();
        assert!(runtime.path_exists(Path::new("/docs/index.rst")).unwrap());
    }
}
