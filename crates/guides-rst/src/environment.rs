/*
 * environment.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Per-document parse context.
 */

//! The [`Environment`] carries everything a parse shares across nodes and
//! sub-parsers: heading-level tracking, link targets, substitution
//! variables, the reference registry and the diagnostic collector.
//!
//! Builds create one environment per file. [`Environment::reset`] only clears
//! heading state, so an environment reused across files carries its links and
//! variables over.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use guides_system_runtime::{SharedRuntime, SystemRuntime};
use hashlink::LinkedHashMap;

use crate::diagnostics::{Diagnostic, DiagnosticCollector};
use crate::error::Result;
use crate::metas::{Dependency, Entry, Metas};
use crate::references::{
    InvalidLink, ReferenceRegistry, ReferenceResolver, ResolveContext, ResolvedReference,
};
use crate::url;

const ANONYMOUS_NAME: &str = "_";
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 64;

pub struct Environment {
    runtime: SharedRuntime,
    current_file_name: String,
    current_directory: PathBuf,
    initial_header_level: usize,

    include_allowed: bool,
    include_root: Option<PathBuf>,
    max_include_depth: usize,

    title_letters: LinkedHashMap<char, usize>,
    current_title_level: usize,
    /// Auto-numbering and title counters, indexed by level; grown on demand.
    levels: Vec<usize>,
    counters: Vec<usize>,

    links: LinkedHashMap<String, String>,
    /// Anonymous reference names waiting for a `__ url` target.
    anonymous: VecDeque<String>,
    /// `__ url` targets that arrived before their reference.
    anonymous_targets: VecDeque<String>,
    variables: LinkedHashMap<String, serde_json::Value>,

    references: ReferenceRegistry,
    diagnostics: DiagnosticCollector,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("current_file_name", &self.current_file_name)
            .field("current_directory", &self.current_directory)
            .field("initial_header_level", &self.initial_header_level)
            .field("title_letters", &self.title_letters)
            .field("links", &self.links)
            .field("variables", &self.variables)
            .field("references", &self.references)
            .finish_non_exhaustive()
    }
}

impl Environment {
    pub fn new(runtime: SharedRuntime) -> Self {
        Self {
            runtime,
            current_file_name: String::new(),
            current_directory: PathBuf::from("."),
            initial_header_level: 1,
            include_allowed: true,
            include_root: None,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            title_letters: LinkedHashMap::new(),
            current_title_level: 0,
            levels: Vec::new(),
            counters: Vec::new(),
            links: LinkedHashMap::new(),
            anonymous: VecDeque::new(),
            anonymous_targets: VecDeque::new(),
            variables: LinkedHashMap::new(),
            references: ReferenceRegistry::with_defaults(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    /// Set the document id (path without extension, relative to the source
    /// directory) of the file being parsed.
    pub fn with_current_file(mut self, file: impl Into<String>) -> Self {
        self.set_current_file(file);
        self
    }

    pub fn with_current_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.current_directory = directory.into();
        self
    }

    pub fn with_initial_header_level(mut self, level: usize) -> Self {
        self.initial_header_level = level.max(1);
        self
    }

    /// Enable or disable includes, optionally confining them below `root`.
    pub fn with_include_policy(mut self, allowed: bool, root: Option<PathBuf>) -> Self {
        self.include_allowed = allowed;
        self.include_root = root;
        self
    }

    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    pub fn with_reference(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.references.register(resolver);
        self
    }

    pub fn set_current_file(&mut self, file: impl Into<String>) {
        self.current_file_name = file.into();
        self.references
            .set_dir_name(url::dir_name(&self.current_file_name));
    }

    pub fn current_file_name(&self) -> &str {
        &self.current_file_name
    }

    pub fn current_directory(&self) -> &Path {
        &self.current_directory
    }

    pub fn initial_header_level(&self) -> usize {
        self.initial_header_level
    }

    pub fn include_allowed(&self) -> bool {
        self.include_allowed
    }

    pub fn include_root(&self) -> Option<&Path> {
        self.include_root.as_deref()
    }

    pub fn max_include_depth(&self) -> usize {
        self.max_include_depth
    }

    pub fn runtime(&self) -> &dyn SystemRuntime {
        self.runtime.as_ref()
    }

    // Headings

    /// Forget heading letters and title counters.
    pub fn reset(&mut self) {
        self.title_letters.clear();
        self.current_title_level = 0;
        self.levels.clear();
        self.counters.clear();
    }

    /// Level of the heading marker `letter`, relative to the first one seen.
    ///
    /// The first distinct letter gets level 1, the next one level 2, and so
    /// on; a letter seen before keeps its level.
    pub fn get_level(&mut self, letter: char) -> usize {
        if let Some(level) = self.title_letters.get(&letter) {
            return *level;
        }
        self.current_title_level += 1;
        self.title_letters.insert(letter, self.current_title_level);
        self.current_title_level
    }

    pub fn title_letters(&self) -> impl Iterator<Item = (char, usize)> + '_ {
        self.title_letters.iter().map(|(letter, level)| (*letter, *level))
    }

    /// Allocate the id of a new title at `level`: `title.` followed by the
    /// counters of every level down to this one.
    pub fn create_title(&mut self, level: usize) -> String {
        self.grow_levels(level);
        self.levels.truncate(level + 1);
        self.counters.truncate(level + 1);
        self.levels[level] = 1;
        self.counters[level] += 1;

        let mut id = String::from("title");
        for counter in &self.counters[1..=level] {
            id.push('.');
            id.push_str(&counter.to_string());
        }
        id
    }

    /// Next number of an auto-numbered item at `level`.
    pub fn get_number(&mut self, level: usize) -> usize {
        self.grow_levels(level);
        let number = self.levels[level];
        self.levels[level] += 1;
        number
    }

    fn grow_levels(&mut self, level: usize) {
        if self.levels.len() <= level {
            self.levels.resize(level + 1, 1);
            self.counters.resize(level + 1, 0);
        }
    }

    // Links and variables

    /// Record a link target. The anonymous name `_` binds to the oldest
    /// anonymous reference still waiting for a target.
    pub fn set_link(&mut self, name: &str, url: &str) {
        let name = name.trim().to_lowercase();
        let url = url.trim().to_string();
        if name == ANONYMOUS_NAME {
            match self.anonymous.pop_front() {
                Some(reference) => {
                    self.links.insert(reference, url);
                }
                None => self.anonymous_targets.push_back(url),
            }
            return;
        }
        self.links.insert(name, url);
    }

    /// Look up a link target, made relative to the current document.
    pub fn get_link(&self, name: &str) -> Option<String> {
        self.links
            .get(&name.trim().to_lowercase())
            .map(|link| url::relative_url(&self.current_file_name, link))
    }

    pub fn links(&self) -> &LinkedHashMap<String, String> {
        &self.links
    }

    /// Register an anonymous reference; it takes the oldest pending
    /// anonymous target if one arrived first.
    pub fn push_anonymous(&mut self, name: &str) {
        let name = name.trim().to_lowercase();
        match self.anonymous_targets.pop_front() {
            Some(url) => {
                self.links.insert(name, url);
            }
            None => self.anonymous.push_back(name),
        }
    }

    pub fn reset_anonymous_stack(&mut self) {
        self.anonymous.clear();
        self.anonymous_targets.clear();
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn get_variable(&self, name: &str) -> Option<&serde_json::Value> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> &LinkedHashMap<String, serde_json::Value> {
        &self.variables
    }

    // References

    pub fn references(&self) -> &ReferenceRegistry {
        &self.references
    }

    pub fn add_dependency(&mut self, name: &str, requires_resolving: bool) -> Result<()> {
        self.references.add_dependency(name, requires_resolving)
    }

    pub fn dependencies(&self) -> &[Dependency] {
        self.references.dependencies()
    }

    /// Report an occurrence of `role` pointing at `target` in the current
    /// document.
    pub fn found(&mut self, role: &str, target: &str) -> Result<()> {
        self.references
            .found(role, target, &mut self.diagnostics, &self.current_file_name)
    }

    /// Resolve a reference of the current document. `entry` is its cached
    /// entry, rewritten in place.
    pub fn resolve(
        &mut self,
        metas: &Metas,
        entry: Option<&mut Entry>,
        role: &str,
        target: &str,
    ) -> Option<ResolvedReference> {
        let context = ResolveContext::new(&self.current_file_name, metas);
        self.references
            .resolve(&context, role, target, entry, &mut self.diagnostics)
    }

    pub fn invalid_links(&self) -> &[InvalidLink] {
        self.references.invalid_links()
    }

    pub fn take_invalid_links(&mut self) -> Vec<InvalidLink> {
        self.references.take_invalid_links()
    }

    // Diagnostics

    pub fn add_error(&mut self, message: impl Into<String>) {
        let file = (!self.current_file_name.is_empty()).then_some(self.current_file_name.as_str());
        self.diagnostics.error(message, file);
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        let file = (!self.current_file_name.is_empty()).then_some(self.current_file_name.as_str());
        self.diagnostics.warning(message, file);
    }

    pub fn diagnostics(&self) -> &DiagnosticCollector {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics).into_diagnostics()
    }

    // Paths

    pub fn dir_name(&self) -> &str {
        url::dir_name(&self.current_file_name)
    }

    pub fn canonical_url(&self, url: &str) -> Option<String> {
        url::canonical_url(self.dir_name(), url)
    }

    pub fn absolute_url(&self, url: &str) -> String {
        url::absolute_url(self.dir_name(), url)
    }

    pub fn relative_url(&self, url: &str) -> String {
        url::relative_url(&self.current_file_name, url)
    }

    /// Filesystem path of `url` as written in the current document.
    pub fn absolute_relative_path(&self, url: &str) -> PathBuf {
        let mut path = self.current_directory.clone();
        let dir_name = self.dir_name();
        if !dir_name.is_empty() {
            path.push(dir_name);
        }
        path.push(self.relative_url(url).trim_start_matches('/'));
        path
    }
}
