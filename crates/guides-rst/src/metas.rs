/*
 * metas.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Cached per-document metadata used for incremental rebuilds.
 */

//! The Metas cache.
//!
//! Every parsed document leaves an [`Entry`] behind: its output URL, title,
//! title index, table-of-contents trees, dependencies, links and the mtime of
//! the source at parse time. The next build's file collector compares those
//! entries against the filesystem to decide what needs re-parsing.
//!
//! Parent bookkeeping: whenever an entry lists a child document in one of its
//! toc trees, the child's entry (now or later) records the listing document as
//! its parent.

use std::fmt;
use std::path::Path;

use guides_system_runtime::SystemRuntime;
use hashlink::LinkedHashMap;
use serde::{Deserialize, Serialize};

use crate::document::TitleEntry;
use crate::error::{GuidesError, Result};
use crate::url::slugify;

/// A dependency recorded for a document.
///
/// Provisional dependencies name a reference target whose document is not
/// known until a resolver has run; canonical ones are document ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Dependency {
    Provisional(String),
    Canonical(String),
}

impl Dependency {
    pub fn name(&self) -> &str {
        match self {
            Dependency::Provisional(name) | Dependency::Canonical(name) => name,
        }
    }

    pub fn is_provisional(&self) -> bool {
        matches!(self, Dependency::Provisional(_))
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Provisional(name) => write!(f, "unresolved:{name}"),
            Dependency::Canonical(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub file: String,
    pub url: String,
    pub title: Option<String>,
    pub titles: Vec<TitleEntry>,
    pub tocs: Vec<Vec<String>>,
    pub depends: Vec<Dependency>,
    #[serde(default)]
    resolved_dependencies: Vec<Dependency>,
    pub links: LinkedHashMap<String, String>,
    pub mtime: i64,
    parent: Option<String>,
}

impl Entry {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            url: String::new(),
            title: None,
            titles: Vec::new(),
            tocs: Vec::new(),
            depends: Vec::new(),
            resolved_dependencies: Vec::new(),
            links: LinkedHashMap::new(),
            mtime: 0,
            parent: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_titles(mut self, titles: Vec<TitleEntry>) -> Self {
        self.titles = titles;
        self
    }

    pub fn with_tocs(mut self, tocs: Vec<Vec<String>>) -> Self {
        self.tocs = tocs;
        self
    }

    pub fn with_dependencies(mut self, depends: Vec<Dependency>) -> Self {
        self.depends = depends;
        self
    }

    pub fn with_links(mut self, links: LinkedHashMap<String, String>) -> Self {
        self.links = links;
        self
    }

    pub fn with_mtime(mut self, mtime: i64) -> Self {
        self.mtime = mtime;
        self
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn set_parent(&mut self, parent: impl Into<String>) {
        self.parent = Some(parent.into());
    }

    /// Replace `original` with the canonical document id `resolved`.
    ///
    /// A dependency is only rewritten once; later calls for the same original
    /// name are ignored. When the document already depends on `resolved` the
    /// placeholder is dropped instead.
    pub fn resolve_dependency(&mut self, original: &Dependency, resolved: &str) -> Result<()> {
        if self.resolved_dependencies.contains(original) {
            return Ok(());
        }
        let Some(idx) = self.depends.iter().position(|dep| dep == original) else {
            return Err(GuidesError::UnknownDependency {
                dependency: original.to_string(),
                file: self.file.clone(),
            });
        };
        let canonical = Dependency::Canonical(resolved.to_string());
        if self.depends.contains(&canonical) {
            self.depends.remove(idx);
        } else {
            self.depends[idx] = canonical;
        }
        self.resolved_dependencies.push(original.clone());
        Ok(())
    }

    pub fn remove_dependency(&mut self, dependency: &Dependency) {
        if let Some(idx) = self.depends.iter().position(|dep| dep == dependency) {
            self.depends.remove(idx);
        }
    }

    /// Whether any title in the index slugifies to `slug`.
    pub fn has_title(&self, slug: &str) -> bool {
        fn visit(titles: &[TitleEntry], slug: &str) -> bool {
            titles
                .iter()
                .any(|t| slugify(&t.text) == slug || visit(&t.children, slug))
        }
        visit(&self.titles, slug)
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Metas {
    entries: LinkedHashMap<String, Entry>,
    parents: LinkedHashMap<String, String>,
}

impl Metas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a freshly built entry, replacing any previous one for the same
    /// file, and propagate parent ids through its toc trees.
    pub fn set(&mut self, mut entry: Entry) {
        for child in entry.tocs.iter().flatten() {
            self.parents.insert(child.clone(), entry.file.clone());
            if let Some(child_entry) = self.entries.get_mut(child) {
                child_entry.set_parent(entry.file.clone());
            }
        }

        if let Some(parent) = self.parents.get(&entry.file) {
            entry.set_parent(parent.clone());
        }
        self.entries.replace(entry.file.clone(), entry);
    }

    /// Write back an entry without touching parent bookkeeping.
    pub fn update(&mut self, entry: Entry) {
        self.entries.replace(entry.file.clone(), entry);
    }

    pub fn get(&self, file: &str) -> Option<&Entry> {
        self.entries.get(file)
    }

    pub fn get_mut(&mut self, file: &str) -> Option<&mut Entry> {
        self.entries.get_mut(file)
    }

    pub fn contains(&self, file: &str) -> bool {
        self.entries.contains_key(file)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the document declaring `title` (compared by slug).
    pub fn find_by_title(&self, title: &str) -> Option<&Entry> {
        let slug = slugify(title);
        self.entries.values().find(|entry| entry.has_title(&slug))
    }

    /// Load a cache previously written by [`Metas::save`]. A missing file
    /// yields an empty cache.
    pub fn load(runtime: &dyn SystemRuntime, path: &Path) -> Result<Self> {
        if !runtime.path_exists(path)? {
            tracing::debug!(path = %path.display(), "No metas cache found");
            return Ok(Self::new());
        }
        let contents = runtime.file_read(path)?;
        let metas: Metas = serde_json::from_slice(&contents)?;
        tracing::debug!(path = %path.display(), entries = metas.len(), "Loaded metas cache");
        Ok(metas)
    }

    pub fn save(&self, runtime: &dyn SystemRuntime, path: &Path) -> Result<()> {
        let contents = serde_json::to_vec_pretty(self)?;
        runtime.file_write(path, &contents)?;
        tracing::debug!(path = %path.display(), entries = self.len(), "Saved metas cache");
        Ok(())
    }
}
