/*
 * references.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Cross-reference roles, resolution and dependency tracking.
 */

//! The reference registry.
//!
//! Each reference role (`doc`, `ref`, ...) is served by an externally supplied
//! [`ReferenceResolver`]. While a document is parsed, resolvers are told about
//! every `:role:`target`` they serve through [`ReferenceResolver::found`],
//! where they usually register a dependency. After parsing, each reference is
//! resolved against the Metas cache; resolution either rewrites a provisional
//! dependency of the document's cached [`Entry`] into a canonical document id,
//! or records an [`InvalidLink`] and drops the dependency.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::diagnostics::DiagnosticCollector;
use crate::error::{GuidesError, Result};
use crate::metas::{Dependency, Entry, Metas};
use crate::url;

/// The outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedReference {
    /// Canonical id of the document the reference points to.
    pub file: String,
    pub url: Option<String>,
    pub title: Option<String>,
    pub anchor: Option<String>,
}

impl ResolvedReference {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            url: None,
            title: None,
            anchor: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }
}

/// A reference target no resolver could make sense of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidLink {
    pub name: String,
}

impl InvalidLink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// What a resolver may look at while resolving.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub current_file: &'a str,
    pub metas: &'a Metas,
}

impl<'a> ResolveContext<'a> {
    pub fn new(current_file: &'a str, metas: &'a Metas) -> Self {
        Self {
            current_file,
            metas,
        }
    }

    pub fn dir_name(&self) -> &'a str {
        url::dir_name(self.current_file)
    }

    /// Canonical document id of `target` as seen from the current file.
    pub fn canonical_url(&self, target: &str) -> Option<String> {
        url::canonical_url(self.dir_name(), target)
    }
}

/// Resolver for one reference role.
pub trait ReferenceResolver: Send + Sync {
    /// The role this resolver serves, e.g. `doc`.
    fn name(&self) -> &str;

    fn resolve(&self, context: &ResolveContext<'_>, target: &str) -> Option<ResolvedReference>;

    /// Called while parsing, once per reference occurrence.
    fn found(&self, registry: &mut ReferenceRegistry, url: &str) -> Result<()> {
        let _ = (registry, url);
        Ok(())
    }
}

#[derive(Default)]
pub struct ReferenceRegistry {
    references: HashMap<String, Arc<dyn ReferenceResolver>>,
    dir_name: String,
    dependencies: Vec<Dependency>,
    unresolved_dependencies: HashMap<String, Dependency>,
    original_dependency_names: HashMap<String, Dependency>,
    invalid_links: Vec<InvalidLink>,
}

impl fmt::Debug for ReferenceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut roles: Vec<&String> = self.references.keys().collect();
        roles.sort();
        f.debug_struct("ReferenceRegistry")
            .field("roles", &roles)
            .field("dir_name", &self.dir_name)
            .field("dependencies", &self.dependencies)
            .field("invalid_links", &self.invalid_links)
            .finish()
    }
}

impl ReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry serving `doc` (document ids, canonical dependencies) and
    /// `ref` (document ids or section titles, provisional dependencies).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(Arc::new(DocReference::new("doc", false)))
            .register(Arc::new(DocReference::new("ref", true)));
        registry
    }

    /// Directory of the current document; canonical dependencies are resolved
    /// against it.
    pub fn set_dir_name(&mut self, dir_name: impl Into<String>) {
        self.dir_name = dir_name.into();
    }

    pub fn register(&mut self, resolver: Arc<dyn ReferenceResolver>) -> &mut Self {
        self.references
            .insert(resolver.name().to_string(), resolver);
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.references.contains_key(role)
    }

    /// Record a dependency of the current document.
    ///
    /// With `requires_resolving` the name is kept provisional until a resolver
    /// turns it into a document id. Otherwise it is canonicalised right away
    /// and an empty result is an error.
    pub fn add_dependency(&mut self, name: &str, requires_resolving: bool) -> Result<()> {
        let dependency = if requires_resolving {
            let dependency = Dependency::Provisional(name.to_string());
            self.unresolved_dependencies
                .insert(name.to_string(), dependency.clone());
            dependency
        } else {
            let canonical = url::canonical_url(&self.dir_name, name)
                .ok_or_else(|| GuidesError::EmptyCanonicalUrl(name.to_string()))?;
            Dependency::Canonical(canonical)
        };

        self.original_dependency_names
            .insert(name.to_string(), dependency.clone());

        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        Ok(())
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn invalid_links(&self) -> &[InvalidLink] {
        &self.invalid_links
    }

    pub fn take_invalid_links(&mut self) -> Vec<InvalidLink> {
        std::mem::take(&mut self.invalid_links)
    }

    /// Tell the resolver for `role` that `url` is referenced by the current
    /// document.
    pub fn found(
        &mut self,
        role: &str,
        url: &str,
        diagnostics: &mut DiagnosticCollector,
        current_file: &str,
    ) -> Result<()> {
        let Some(resolver) = self.references.get(role).cloned() else {
            diagnostics.error(unknown_section(role, current_file), Some(current_file));
            return Ok(());
        };
        resolver.found(self, url)
    }

    /// Resolve `target` with the resolver registered for `role`.
    ///
    /// `entry` is the current document's cached entry; its dependencies are
    /// rewritten (on success) or pruned (on failure).
    pub fn resolve(
        &mut self,
        context: &ResolveContext<'_>,
        role: &str,
        target: &str,
        entry: Option<&mut Entry>,
        diagnostics: &mut DiagnosticCollector,
    ) -> Option<ResolvedReference> {
        let Some(resolver) = self.references.get(role).cloned() else {
            diagnostics.error(
                unknown_section(role, context.current_file),
                Some(context.current_file),
            );
            return None;
        };

        let Some(resolved) = resolver.resolve(context, target) else {
            tracing::debug!(role, target, "Reference could not be resolved");
            self.invalid_links.push(InvalidLink::new(target));
            if let Some(entry) = entry {
                let stored = self
                    .original_dependency_names
                    .get(target)
                    .cloned()
                    .unwrap_or_else(|| Dependency::Canonical(target.to_string()));
                entry.remove_dependency(&stored);
            }
            return None;
        };

        if let Some(entry) = entry
            && let Some(placeholder) = self.unresolved_dependencies.get(target)
            && let Err(err) = entry.resolve_dependency(placeholder, &resolved.file)
        {
            diagnostics.warning(err.to_string(), Some(context.current_file));
        }

        Some(resolved)
    }
}

/// Resolves references to documents known to the Metas cache.
///
/// With `requires_resolving`, targets are registered as provisional
/// dependencies and may also name a section title anywhere in the project.
#[derive(Debug, Clone)]
pub struct DocReference {
    name: String,
    requires_resolving: bool,
}

impl DocReference {
    pub fn new(name: impl Into<String>, requires_resolving: bool) -> Self {
        Self {
            name: name.into(),
            requires_resolving,
        }
    }
}

impl ReferenceResolver for DocReference {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, context: &ResolveContext<'_>, target: &str) -> Option<ResolvedReference> {
        let (file, anchor) = match target.split_once('#') {
            Some((file, anchor)) => (file, Some(anchor)),
            None => (target, None),
        };

        if let Some(id) = context.canonical_url(file)
            && let Some(entry) = context.metas.get(&id)
        {
            let mut resolved = ResolvedReference::new(&entry.file).with_url(&entry.url);
            if let Some(title) = &entry.title {
                resolved = resolved.with_title(title);
            }
            if let Some(anchor) = anchor {
                resolved = resolved.with_anchor(anchor);
            }
            return Some(resolved);
        }

        if !self.requires_resolving {
            return None;
        }
        let entry = context.metas.find_by_title(target)?;
        let slug = url::slugify(target);
        Some(
            ResolvedReference::new(&entry.file)
                .with_url(format!("{}#{slug}", entry.url))
                .with_title(target)
                .with_anchor(slug),
        )
    }

    fn found(&self, registry: &mut ReferenceRegistry, url: &str) -> Result<()> {
        registry.add_dependency(url, self.requires_resolving)
    }
}

fn unknown_section(role: &str, current_file: &str) -> String {
    if current_file.is_empty() {
        format!("Unknown reference section \"{role}\"")
    } else {
        format!("Unknown reference section \"{role}\" in \"{current_file}\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Resolves targets listed up front; registers provisional dependencies.
    struct LabelResolver {
        known: Vec<(&'static str, &'static str)>,
    }

    impl ReferenceResolver for LabelResolver {
        fn name(&self) -> &str {
            "ref"
        }

        fn resolve(&self, _context: &ResolveContext<'_>, target: &str) -> Option<ResolvedReference> {
            self.known
                .iter()
                .find(|(label, _)| *label == target)
                .map(|(_, file)| ResolvedReference::new(*file))
        }

        fn found(&self, registry: &mut ReferenceRegistry, url: &str) -> Result<()> {
            registry.add_dependency(url, true)
        }
    }

    fn registry(known: Vec<(&'static str, &'static str)>) -> ReferenceRegistry {
        let mut registry = ReferenceRegistry::new();
        registry.register(Arc::new(LabelResolver { known }));
        registry
    }

    #[test]
    fn test_add_dependency_deduplicates() {
        let mut registry = ReferenceRegistry::new();
        registry.set_dir_name("guide");
        registry.add_dependency("install", false).unwrap();
        registry.add_dependency("./install", false).unwrap();
        registry.add_dependency("install", true).unwrap();

        assert_eq!(
            registry.dependencies(),
            &[
                Dependency::Canonical("guide/install".to_string()),
                Dependency::Provisional("install".to_string()),
            ]
        );
    }

    #[test]
    fn test_add_dependency_empty_canonical_url() {
        let mut registry = ReferenceRegistry::new();
        let err = registry.add_dependency("..", false).unwrap_err();
        assert!(matches!(err, GuidesError::EmptyCanonicalUrl(name) if name == ".."));
    }

    #[test]
    fn test_provisional_dependency_resolved() {
        let metas = Metas::new();
        let mut diagnostics = DiagnosticCollector::new();
        let mut registry = registry(vec![("intro", "guide/introduction")]);
        registry
            .found("ref", "intro", &mut diagnostics, "index")
            .unwrap();

        let mut entry = Entry::new("index").with_dependencies(registry.dependencies().to_vec());
        let context = ResolveContext::new("index", &metas);
        let resolved = registry.resolve(&context, "ref", "intro", Some(&mut entry), &mut diagnostics);

        assert_eq!(resolved, Some(ResolvedReference::new("guide/introduction")));
        assert_eq!(
            entry.depends,
            vec![Dependency::Canonical("guide/introduction".to_string())]
        );
        assert!(registry.invalid_links().is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_failed_resolution_records_invalid_link() {
        let metas = Metas::new();
        let mut diagnostics = DiagnosticCollector::new();
        let mut registry = registry(vec![]);
        registry
            .found("ref", "intro", &mut diagnostics, "index")
            .unwrap();

        let mut entry = Entry::new("index").with_dependencies(registry.dependencies().to_vec());
        let context = ResolveContext::new("index", &metas);
        let resolved = registry.resolve(&context, "ref", "intro", Some(&mut entry), &mut diagnostics);

        assert_eq!(resolved, None);
        assert!(entry.depends.is_empty());
        assert_eq!(registry.invalid_links(), &[InvalidLink::new("intro")]);
    }

    fn cached_metas() -> Metas {
        let mut metas = Metas::new();
        metas.set(
            Entry::new("guide/install")
                .with_url("guide/install.html")
                .with_title(Some("Installation".to_string()))
                .with_titles(vec![crate::document::TitleEntry {
                    text: "Installation".to_string(),
                    children: vec![crate::document::TitleEntry {
                        text: "Upgrading Packages".to_string(),
                        children: vec![],
                    }],
                }]),
        );
        metas
    }

    #[test]
    fn test_doc_reference() {
        let metas = cached_metas();
        let mut diagnostics = DiagnosticCollector::new();
        let mut registry = ReferenceRegistry::with_defaults();
        registry.set_dir_name("guide");
        registry
            .found("doc", "install", &mut diagnostics, "guide/index")
            .unwrap();
        assert_eq!(
            registry.dependencies(),
            &[Dependency::Canonical("guide/install".to_string())]
        );

        let context = ResolveContext::new("guide/index", &metas);
        let resolved = registry
            .resolve(&context, "doc", "install", None, &mut diagnostics)
            .unwrap();
        assert_eq!(resolved.file, "guide/install");
        assert_eq!(resolved.url.as_deref(), Some("guide/install.html"));
        assert_eq!(resolved.title.as_deref(), Some("Installation"));

        assert_eq!(
            registry.resolve(&context, "doc", "Upgrading Packages", None, &mut diagnostics),
            None
        );
    }

    #[test]
    fn test_ref_reference_by_title() {
        let metas = cached_metas();
        let mut diagnostics = DiagnosticCollector::new();
        let mut registry = ReferenceRegistry::with_defaults();
        registry
            .found("ref", "Upgrading Packages", &mut diagnostics, "index")
            .unwrap();

        let mut entry = Entry::new("index").with_dependencies(registry.dependencies().to_vec());
        let context = ResolveContext::new("index", &metas);
        let resolved = registry
            .resolve(&context, "ref", "Upgrading Packages", Some(&mut entry), &mut diagnostics)
            .unwrap();

        assert_eq!(resolved.anchor.as_deref(), Some("upgrading-packages"));
        assert_eq!(
            resolved.url.as_deref(),
            Some("guide/install.html#upgrading-packages")
        );
        assert_eq!(
            entry.depends,
            vec![Dependency::Canonical("guide/install".to_string())]
        );
    }

    #[test]
    fn test_unknown_role() {
        let metas = Metas::new();
        let mut diagnostics = DiagnosticCollector::new();
        let mut registry = ReferenceRegistry::new();

        registry
            .found("doc", "install", &mut diagnostics, "index")
            .unwrap();
        let context = ResolveContext::new("", &metas);
        assert_eq!(
            registry.resolve(&context, "doc", "install", None, &mut diagnostics),
            None
        );

        assert_eq!(
            diagnostics.messages(),
            vec![
                "Unknown reference section \"doc\" in \"index\"",
                "Unknown reference section \"doc\"",
            ]
        );
        assert!(registry.invalid_links().is_empty());
    }
}
