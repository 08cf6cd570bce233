/*
 * tree.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Hierarchical view over the flat section brackets.
 */

//! Converts the parser's flat node sequence, where sections are bracketed by
//! `SectionBegin`/`SectionEnd`, into nested [`Section`]s.
//!
//! The title that immediately follows a `SectionBegin` becomes the section's
//! title instead of one of its children.

use crate::nodes::{Node, TitleNode, TitleRef};

pub type SectionTree = Vec<TreeNode>;

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Section(Section),
    Node(Node),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub id: String,
    pub level: usize,
    pub title: Option<TitleNode>,
    pub children: Vec<TreeNode>,
}

impl Section {
    fn open(title_ref: TitleRef) -> Self {
        Self {
            id: title_ref.id,
            level: title_ref.level,
            title: None,
            children: Vec::new(),
        }
    }

    /// Sections nested directly below this one.
    pub fn subsections(&self) -> impl Iterator<Item = &Section> {
        self.children.iter().filter_map(|child| match child {
            TreeNode::Section(section) => Some(section),
            TreeNode::Node(_) => None,
        })
    }
}

pub fn build_section_tree(nodes: impl IntoIterator<Item = Node>) -> SectionTree {
    let mut root: Vec<TreeNode> = Vec::new();
    let mut stack: Vec<Section> = Vec::new();

    fn attach(root: &mut Vec<TreeNode>, stack: &mut [Section], node: TreeNode) {
        match stack.last_mut() {
            Some(section) => section.children.push(node),
            None => root.push(node),
        }
    }

    for node in nodes {
        match node {
            Node::SectionBegin(title_ref) => stack.push(Section::open(title_ref)),
            Node::SectionEnd(title_ref) => {
                let Some(section) = stack.pop() else {
                    tracing::warn!(id = %title_ref.id, "Section end without matching begin");
                    continue;
                };
                if section.id != title_ref.id {
                    tracing::warn!(
                        expected = %section.id,
                        found = %title_ref.id,
                        "Section brackets are not nested"
                    );
                }
                attach(&mut root, &mut stack, TreeNode::Section(section));
            }
            Node::Title(title) => match stack.last_mut() {
                Some(section) if section.title.is_none() && section.id == title.id => {
                    section.title = Some(title);
                }
                _ => attach(&mut root, &mut stack, TreeNode::Node(Node::Title(title))),
            },
            other => attach(&mut root, &mut stack, TreeNode::Node(other)),
        }
    }

    while let Some(section) = stack.pop() {
        attach(&mut root, &mut stack, TreeNode::Section(section));
    }

    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SpanNode;

    fn title(id: &str, level: usize) -> TitleNode {
        TitleNode {
            value: SpanNode::new(id),
            level,
            id: id.to_string(),
        }
    }

    fn begin(id: &str, level: usize) -> Node {
        Node::SectionBegin(title(id, level).title_ref())
    }

    fn end(id: &str, level: usize) -> Node {
        Node::SectionEnd(title(id, level).title_ref())
    }

    #[test]
    fn test_nested_sections() {
        let nodes = vec![
            Node::Anchor("top".to_string()),
            begin("a", 1),
            Node::Title(title("a", 1)),
            Node::Paragraph(SpanNode::new("intro")),
            begin("b", 2),
            Node::Title(title("b", 2)),
            end("b", 2),
            end("a", 1),
        ];
        let tree = build_section_tree(nodes);

        assert_eq!(tree.len(), 2);
        let TreeNode::Section(a) = &tree[1] else {
            panic!("expected section, got {:?}", tree[1]);
        };
        assert_eq!(a.title.as_ref().map(TitleNode::text), Some("a"));
        assert_eq!(a.children.len(), 2);
        let subsections: Vec<&str> = a.subsections().map(|s| s.id.as_str()).collect();
        assert_eq!(subsections, vec!["b"]);
    }

    #[test]
    fn test_unclosed_sections_are_closed() {
        let tree = build_section_tree(vec![begin("a", 1), begin("b", 2)]);
        assert_eq!(tree.len(), 1);
        let TreeNode::Section(a) = &tree[0] else {
            panic!("expected section");
        };
        assert_eq!(a.subsections().count(), 1);
    }
}
