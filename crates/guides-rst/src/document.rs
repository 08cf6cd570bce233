/*
 * document.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The result of parsing one source file.
 */

use hashlink::LinkedHashMap;
use serde::{Deserialize, Serialize};

use crate::metas::Dependency;
use crate::nodes::{Node, TitleNode, walk};
use crate::span::SpanReference;
use crate::tree::{SectionTree, build_section_tree};
use crate::url;

/// One title in a document's title index, with the titles nested below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleEntry {
    pub text: String,
    pub children: Vec<TitleEntry>,
}

/// A parsed document.
///
/// Besides the node sequence it snapshots the parse context state that the
/// build needs afterwards: variables, links and dependencies.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    file: String,
    initial_header_level: usize,
    nodes: Vec<Node>,
    variables: LinkedHashMap<String, serde_json::Value>,
    links: LinkedHashMap<String, String>,
    dependencies: Vec<Dependency>,
}

impl Document {
    pub fn new(file: impl Into<String>, initial_header_level: usize) -> Self {
        Self {
            file: file.into(),
            initial_header_level,
            nodes: Vec::new(),
            variables: LinkedHashMap::new(),
            links: LinkedHashMap::new(),
            dependencies: Vec::new(),
        }
    }

    pub(crate) fn with_context(
        mut self,
        variables: LinkedHashMap<String, serde_json::Value>,
        links: LinkedHashMap<String, String>,
        dependencies: Vec<Dependency>,
    ) -> Self {
        self.variables = variables;
        self.links = links;
        self.dependencies = dependencies;
        self
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub(crate) fn set_nodes(&mut self, nodes: Vec<Node>) {
        self.nodes = nodes;
    }

    pub fn variables(&self) -> &LinkedHashMap<String, serde_json::Value> {
        &self.variables
    }

    pub fn links(&self) -> &LinkedHashMap<String, String> {
        &self.links
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// The first title at the initial header level.
    pub fn title(&self) -> Option<&TitleNode> {
        self.nodes.iter().find_map(|node| match node {
            Node::Title(title) if title.level == self.initial_header_level => Some(title),
            _ => None,
        })
    }

    /// Nested index of the document's titles.
    ///
    /// A title is placed under the most recent title one level up; titles
    /// that skip a level have no parent to attach to and are left out.
    pub fn titles(&self) -> Vec<TitleEntry> {
        let mut roots: Vec<TitleEntry> = Vec::new();
        // path[i] is the index chain to the latest title at relative level i + 1
        let mut path: Vec<usize> = Vec::new();

        for node in &self.nodes {
            let Node::Title(title) = node else {
                continue;
            };
            let Some(level) = (title.level + 1).checked_sub(self.initial_header_level) else {
                continue;
            };
            if level == 0 || level > path.len() + 1 {
                continue;
            }
            path.truncate(level - 1);

            let mut siblings = &mut roots;
            for &idx in &path {
                siblings = &mut siblings[idx].children;
            }
            siblings.push(TitleEntry {
                text: title.text().to_string(),
                children: Vec::new(),
            });
            path.push(siblings.len() - 1);
        }

        roots
    }

    /// Table-of-contents entries, each canonicalised against this document's
    /// directory.
    pub fn tocs(&self) -> Vec<Vec<String>> {
        let dir_name = url::dir_name(&self.file);
        let mut tocs = Vec::new();
        walk(&self.nodes, &mut |node| {
            if let Node::Toc(toc) = node {
                tocs.push(
                    toc.files
                        .iter()
                        .filter_map(|file| url::canonical_url(dir_name, file))
                        .collect(),
                );
            }
        });
        tocs
    }

    /// Every role reference appearing anywhere in the document.
    pub fn references(&self) -> Vec<&SpanReference> {
        let mut references = Vec::new();
        walk(&self.nodes, &mut |node| {
            for span in node.spans() {
                references.extend(span.references.iter());
            }
        });
        references
    }

    /// Hierarchical view of the section brackets.
    pub fn section_tree(&self) -> SectionTree {
        build_section_tree(self.nodes.iter().cloned())
    }
}
