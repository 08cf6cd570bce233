/*
 * collector.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Discovers source files and decides which of them must be parsed again.
 */

//! Staleness is decided against a snapshot of the Metas cache taken before
//! any file is parsed. A file is queued when
//!
//! - it has no cached entry, or its cached mtime is older than the file's, or
//! - one of its direct dependencies (or its parent) is stale by the first
//!   rule or no longer exists.
//!
//! The check is one hop deep: a dependency's entry already reflects the
//! freshness of its own dependencies as of its last parse.

use std::path::{Component, Path};

use guides_rst::{Dependency, Metas};
use guides_system_runtime::SystemRuntime;
use hashlink::LinkedHashMap;

use crate::error::Result;

#[derive(Debug, Default, Clone)]
pub struct FileCollector {
    /// Document id to filesystem mtime, in listing order.
    files: LinkedHashMap<String, i64>,
}

impl FileCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// List the `extension` files under `directory` and return the ids of
    /// those that need parsing, in listing order.
    pub fn get_files(
        &mut self,
        runtime: &dyn SystemRuntime,
        directory: &Path,
        extension: &str,
        metas: &Metas,
    ) -> Result<Vec<String>> {
        self.files.clear();
        for listing in runtime.list_files(directory, extension)? {
            self.files
                .insert(document_id(&listing.relative_path), listing.mtime);
        }

        let queue: Vec<String> = self
            .files
            .keys()
            .filter(|file| self.needs_parse(file, metas))
            .cloned()
            .collect();

        tracing::debug!(
            discovered = self.files.len(),
            queued = queue.len(),
            "Collected files"
        );
        Ok(queue)
    }

    /// Every discovered document id, fresh or not.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn contains(&self, file: &str) -> bool {
        self.files.contains_key(file)
    }

    fn needs_parse(&self, file: &str, metas: &Metas) -> bool {
        if self.is_stale(file, metas) {
            return true;
        }
        let Some(entry) = metas.get(file) else {
            return true;
        };

        let parent = entry.parent().map(|parent| Dependency::Canonical(parent.to_string()));
        entry.depends.iter().chain(parent.as_ref()).any(|dependency| match dependency {
            // never matches a file on disk
            Dependency::Provisional(_) => true,
            Dependency::Canonical(name) => {
                let changed = !self.files.contains_key(name) || self.is_stale(name, metas);
                if changed {
                    tracing::trace!(file, dependency = %name, "Dependency changed");
                }
                changed
            }
        })
    }

    fn is_stale(&self, file: &str, metas: &Metas) -> bool {
        let Some(mtime) = self.files.get(file) else {
            return true;
        };
        metas.get(file).is_none_or(|entry| entry.mtime < *mtime)
    }
}

/// `guide/install.rst` becomes `guide/install`.
fn document_id(relative_path: &Path) -> String {
    relative_path
        .with_extension("")
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use guides_rst::Entry;
    use guides_system_runtime::MemoryRuntime;
    use pretty_assertions::assert_eq;

    fn collect(runtime: &MemoryRuntime, metas: &Metas) -> Vec<String> {
        FileCollector::new()
            .get_files(runtime, Path::new("/docs"), "rst", metas)
            .unwrap()
    }

    fn canonical(names: &[&str]) -> Vec<Dependency> {
        names
            .iter()
            .map(|name| Dependency::Canonical(name.to_string()))
            .collect()
    }

    #[test]
    fn test_document_id() {
        assert_eq!(document_id(Path::new("guide/install.rst")), "guide/install");
        assert_eq!(document_id(Path::new("index.rst")), "index");
    }

    #[test]
    fn test_new_files_are_queued() {
        let runtime = MemoryRuntime::new();
        runtime.add_file_with_mtime("/docs/index.rst", "Index", 10);
        runtime.add_file_with_mtime("/docs/guide/install.rst", "Install", 10);
        runtime.add_file_with_mtime("/docs/notes.txt", "ignored", 10);

        assert_eq!(collect(&runtime, &Metas::new()), vec!["guide/install", "index"]);
    }

    #[test]
    fn test_fresh_files_are_skipped() {
        let runtime = MemoryRuntime::new();
        runtime.add_file_with_mtime("/docs/index.rst", "Index", 10);
        runtime.add_file_with_mtime("/docs/other.rst", "Other", 20);

        let mut metas = Metas::new();
        metas.set(Entry::new("index").with_mtime(10));
        metas.set(Entry::new("other").with_mtime(15));

        assert_eq!(collect(&runtime, &metas), vec!["other"]);
    }

    #[test]
    fn test_staleness_is_one_hop() {
        let runtime = MemoryRuntime::new();
        runtime.add_file_with_mtime("/docs/a.rst", "A", 10);
        runtime.add_file_with_mtime("/docs/b.rst", "B", 10);
        runtime.add_file_with_mtime("/docs/c.rst", "C", 10);

        let mut metas = Metas::new();
        metas.set(Entry::new("a").with_mtime(10).with_dependencies(canonical(&["b"])));
        metas.set(Entry::new("b").with_mtime(10).with_dependencies(canonical(&["c"])));
        metas.set(Entry::new("c").with_mtime(10));
        assert!(collect(&runtime, &metas).is_empty());

        runtime.touch("/docs/c.rst", 30);
        assert_eq!(collect(&runtime, &metas), vec!["b", "c"]);
    }

    #[test]
    fn test_missing_dependency_forces_parse() {
        let runtime = MemoryRuntime::new();
        runtime.add_file_with_mtime("/docs/index.rst", "Index", 10);

        let mut metas = Metas::new();
        metas.set(Entry::new("index").with_mtime(10).with_dependencies(canonical(&["gone"])));
        assert_eq!(collect(&runtime, &metas), vec!["index"]);
    }

    #[test]
    fn test_provisional_dependency_forces_parse() {
        let runtime = MemoryRuntime::new();
        runtime.add_file_with_mtime("/docs/index.rst", "Index", 10);

        let mut metas = Metas::new();
        metas.set(
            Entry::new("index")
                .with_mtime(10)
                .with_dependencies(vec![Dependency::Provisional("intro".to_string())]),
        );
        assert_eq!(collect(&runtime, &metas), vec!["index"]);
    }

    #[test]
    fn test_stale_parent_forces_parse() {
        let runtime = MemoryRuntime::new();
        runtime.add_file_with_mtime("/docs/index.rst", "Index", 20);
        runtime.add_file_with_mtime("/docs/install.rst", "Install", 10);

        let mut metas = Metas::new();
        metas.set(
            Entry::new("index")
                .with_mtime(10)
                .with_tocs(vec![vec!["install".to_string()]]),
        );
        metas.set(Entry::new("install").with_mtime(10));
        assert_eq!(metas.get("install").and_then(Entry::parent), Some("index"));

        assert_eq!(collect(&runtime, &metas), vec!["index", "install"]);
    }
}
