/*
 * nodes.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Document node types.
 */

//! Nodes of a parsed document.
//!
//! Sections are not nested: the parser emits a flat sequence in which each
//! section is bracketed by a [`Node::SectionBegin`] / [`Node::SectionEnd`]
//! pair. Pairs always nest properly. See [`crate::tree`] for a hierarchical
//! view.

use hashlink::LinkedHashMap;
use serde::Serialize;

use crate::line_data::OptionValue;
use crate::lines::strip_indent;
use crate::span::SpanNode;
use crate::table::TableNode;

/// Options given to a directive, in declaration order.
pub type DirectiveOptions = LinkedHashMap<String, OptionValue>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum Node {
    Title(TitleNode),
    SectionBegin(TitleRef),
    SectionEnd(TitleRef),
    Anchor(String),
    Paragraph(SpanNode),
    Span(SpanNode),
    Code(CodeNode),
    Quote(Vec<Node>),
    List(ListNode),
    DefinitionList(DefinitionListNode),
    Table(TableNode),
    /// Horizontal rule made of the given marker character.
    Separator(char),
    Toc(TocNode),
    Directive(DirectiveNode),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleNode {
    pub value: SpanNode,
    pub level: usize,
    /// Unique within a parse, e.g. `title.1.2`.
    pub id: String,
}

impl TitleNode {
    pub fn text(&self) -> &str {
        &self.value.text
    }

    pub fn title_ref(&self) -> TitleRef {
        TitleRef {
            id: self.id.clone(),
            level: self.level,
        }
    }
}

/// Identifies the title a section bracket belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleRef {
    pub id: String,
    pub level: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeNode {
    pub value: String,
    pub language: Option<String>,
}

impl CodeNode {
    /// Build a code block from indented lines: the first line's indentation
    /// is removed from every line and trailing blank lines are dropped.
    pub fn from_lines(lines: &[String]) -> Self {
        let indent = lines
            .first()
            .map_or(0, |first| first.len() - first.trim_start().len());
        let mut stripped: Vec<&str> = lines
            .iter()
            .map(|line| strip_indent(line, indent))
            .collect();
        while stripped.last().is_some_and(|line| line.trim().is_empty()) {
            stripped.pop();
        }
        Self {
            value: stripped.join("\n"),
            language: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListNode {
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItem {
    pub prefix: char,
    pub ordered: bool,
    pub depth: usize,
    pub text: SpanNode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefinitionListNode {
    pub items: Vec<DefinitionListItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefinitionListItem {
    pub term: SpanNode,
    pub classifiers: Vec<SpanNode>,
    pub definition: Vec<Node>,
}

/// A table-of-contents entry: the documents it lists, as written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TocNode {
    pub files: Vec<String>,
    pub options: DirectiveOptions,
}

/// Output of a directive handler that has no dedicated node kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectiveNode {
    pub name: String,
    pub data: String,
    pub payload: serde_json::Value,
    pub children: Vec<Node>,
}

impl Node {
    /// Direct child nodes (block quotes, definitions, table cells, directive
    /// bodies).
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Quote(nodes) => nodes.iter().collect(),
            Node::DefinitionList(list) => list
                .items
                .iter()
                .flat_map(|item| item.definition.iter())
                .collect(),
            Node::Table(table) => table
                .rows
                .iter()
                .flat_map(|row| row.columns.iter())
                .flat_map(|column| column.nodes.iter())
                .collect(),
            Node::Directive(directive) => directive.children.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Inline text held directly by this node.
    pub fn spans(&self) -> Vec<&SpanNode> {
        match self {
            Node::Title(title) => vec![&title.value],
            Node::Paragraph(span) | Node::Span(span) => vec![span],
            Node::List(list) => list.items.iter().map(|item| &item.text).collect(),
            Node::DefinitionList(list) => list
                .items
                .iter()
                .flat_map(|item| std::iter::once(&item.term).chain(item.classifiers.iter()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Visit `nodes` and all their descendants, depth first.
pub fn walk<'a>(nodes: &'a [Node], visit: &mut impl FnMut(&'a Node)) {
    for node in nodes {
        visit(node);
        for child in node.children() {
            walk(std::slice::from_ref(child), visit);
        }
    }
}
