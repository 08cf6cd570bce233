/*
 * test_parser.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * End-to-end tests for document parsing, includes and reference resolution.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use guides_rst::nodes::{DirectiveNode, DirectiveOptions, Node};
use guides_rst::{
    Dependency, DirectiveHandler, Document, DocumentParser, Entry, Environment, GuidesError,
    InvalidLink, Metas, Parser, Result, TitleEntry,
};
use guides_system_runtime::{MemoryRuntime, NativeRuntime, SystemRuntime};
use pretty_assertions::assert_eq;

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn parse_text(text: &str) -> (Document, Environment) {
    let mut env = Environment::new(Arc::new(MemoryRuntime::new())).with_current_file("index");
    let document = Parser::new()
        .parse(&mut env, text)
        .unwrap_or_else(|err| panic!("parse failed: {err}"));
    (document, env)
}

/// `.. note::` wraps its body in a directive node.
struct Note;

impl DirectiveHandler for Note {
    fn name(&self) -> &str {
        "note"
    }

    fn process(
        &self,
        parser: &mut DocumentParser<'_>,
        node: Option<Node>,
        _variable: &str,
        data: &str,
        _options: &DirectiveOptions,
    ) -> Result<()> {
        let children = match node {
            Some(Node::Quote(children)) => children,
            Some(other) => vec![other],
            None => Vec::new(),
        };
        parser.push_node(Node::Directive(DirectiveNode {
            name: self.name().to_string(),
            data: data.to_string(),
            payload: serde_json::Value::Null,
            children,
        }));
        Ok(())
    }
}

fn outline(nodes: &[Node], depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        let line = match node {
            Node::SectionBegin(title) => format!("begin {}", title.id),
            Node::SectionEnd(title) => format!("end {}", title.id),
            Node::Title(title) => format!("title[{}] {}", title.level, title.text()),
            Node::Paragraph(span) => format!("paragraph {}", span.text),
            Node::List(list) => format!("list {}", list.items.len()),
            Node::Directive(directive) => format!("directive {}", directive.name),
            other => format!("{other:?}"),
        };
        out.push_str(&indent);
        out.push_str(&line);
        out.push('\n');
        if let Node::Directive(directive) = node {
            outline(&directive.children, depth + 1, out);
        }
    }
}

#[test]
fn test_document_outline() {
    let text = "\
Guide
=====

Intro text.

Install
-------

- one
- two

Usage
-----

.. note::

    Remember this.
";
    let mut parser = Parser::new();
    parser.register_directive(Arc::new(Note));
    let mut env = Environment::new(Arc::new(MemoryRuntime::new())).with_current_file("guide");
    let document = parser.parse(&mut env, text).unwrap();

    let mut dump = String::new();
    outline(document.nodes(), 0, &mut dump);
    insta::assert_snapshot!(dump, @r"
    begin title.1
    title[1] Guide
    paragraph Intro text.
    begin title.1.1
    title[2] Install
    list 2
    end title.1.1
    begin title.1.2
    title[2] Usage
    directive note
      paragraph Remember this.
    end title.1.2
    end title.1
    ");

    assert_eq!(
        document.titles(),
        vec![TitleEntry {
            text: "Guide".to_string(),
            children: vec![
                TitleEntry {
                    text: "Install".to_string(),
                    children: vec![],
                },
                TitleEntry {
                    text: "Usage".to_string(),
                    children: vec![],
                },
            ],
        }]
    );
}

#[test]
fn test_section_brackets_balance() {
    let text = "\
Part
****

Chapter
=======

Section
-------

Text.

Other chapter
=============

Second part
***********

Closing words.
";
    let (document, _) = parse_text(text);

    let mut open: Vec<String> = Vec::new();
    for node in document.nodes() {
        match node {
            Node::SectionBegin(title) => open.push(title.id.clone()),
            Node::SectionEnd(title) => {
                assert_eq!(open.pop().as_deref(), Some(title.id.as_str()));
            }
            _ => {}
        }
    }
    assert!(open.is_empty(), "unclosed sections: {open:?}");

    let tree = document.section_tree();
    let ids: Vec<String> = tree
        .iter()
        .filter_map(|node| match node {
            guides_rst::TreeNode::Section(section) => Some(section.id.clone()),
            guides_rst::TreeNode::Node(_) => None,
        })
        .collect();
    // A shallower title closes every open section.
    assert_eq!(ids, vec!["title.1", "title.1.2", "title.2"]);
}

#[test]
fn test_heading_levels_follow_first_appearance() {
    let text = "\
Top
***

A
===

B
---

C
===
";
    let (document, _) = parse_text(text);
    let levels: Vec<(String, usize)> = document
        .nodes()
        .iter()
        .filter_map(|node| match node {
            Node::Title(title) => Some((title.text().to_string(), title.level)),
            _ => None,
        })
        .collect();
    assert_eq!(
        levels,
        vec![
            ("Top".to_string(), 1),
            ("A".to_string(), 2),
            ("B".to_string(), 3),
            ("C".to_string(), 2),
        ]
    );
}

#[test]
fn test_nested_includes_from_disk() {
    let runtime = NativeRuntime::new();
    let path = fixture_path("include/index.rst");
    let text = runtime.file_read_string(&path).unwrap();

    let mut env = Environment::new(Arc::new(runtime))
        .with_current_directory(fixture_path("include"))
        .with_current_file("index");
    let document = Parser::new().parse(&mut env, &text).unwrap();

    let paragraphs: Vec<&str> = document
        .nodes()
        .iter()
        .filter_map(|node| match node {
            Node::Paragraph(span) => Some(span.text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        paragraphs,
        vec!["B paragraph.", "C paragraph.", "End of index."]
    );
}

#[test]
fn test_missing_include_from_disk() {
    let runtime = NativeRuntime::new();
    let text = runtime
        .file_read_string(&fixture_path("include/broken.rst"))
        .unwrap();

    let mut env = Environment::new(Arc::new(runtime))
        .with_current_directory(fixture_path("include"))
        .with_current_file("broken");
    let err = Parser::new().parse(&mut env, &text).unwrap_err();
    assert!(matches!(err, GuidesError::IncludeNotFound { ref path, .. } if path == "nowhere.rst"));
}

#[test]
fn test_reference_lifecycle() {
    let text = "See :ref:`Upgrading Packages` and :doc:`missing`.\n";
    let (document, mut env) = parse_text(text);
    assert_eq!(
        document.dependencies(),
        &[
            Dependency::Provisional("Upgrading Packages".to_string()),
            Dependency::Canonical("missing".to_string()),
        ]
    );

    let mut metas = Metas::new();
    metas.set(
        Entry::new("guide/install")
            .with_url("guide/install.html")
            .with_title(Some("Installation".to_string()))
            .with_titles(vec![TitleEntry {
                text: "Installation".to_string(),
                children: vec![TitleEntry {
                    text: "Upgrading Packages".to_string(),
                    children: vec![],
                }],
            }]),
    );

    let mut entry = Entry::new("index").with_dependencies(document.dependencies().to_vec());
    for reference in document.references() {
        env.resolve(&metas, Some(&mut entry), &reference.role, &reference.target);
    }

    assert_eq!(
        entry.depends,
        vec![Dependency::Canonical("guide/install".to_string())]
    );
    assert_eq!(env.invalid_links(), &[InvalidLink::new("missing")]);
}

#[test]
fn test_anonymous_targets_bind_in_order() {
    let (_, env) = parse_text(
        "__ https://one.example\n__ https://two.example\n\nSee `first`__ then `second`__.\n",
    );
    assert_eq!(env.get_link("first").as_deref(), Some("https://one.example"));
    assert_eq!(env.get_link("second").as_deref(), Some("https://two.example"));
}

#[test]
fn test_unknown_role_is_reported() {
    let (_, env) = parse_text("Use :term:`widget` here.\n");
    assert_eq!(
        env.diagnostics().messages(),
        vec!["Unknown reference section \"term\" in \"index\""]
    );
}
