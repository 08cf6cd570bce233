/*
 * guides-rst
 * Copyright (c) 2025 Posit, PBC
 *
 * Parser for reStructuredText-style documentation sources.
 *
 * The parser is a single-pass, line-oriented state machine. It produces a
 * flat node sequence (sections are bracketed, not nested), records the links,
 * substitution variables and dependencies of the document in its
 * Environment, and leaves reference resolution to a second pass run against
 * the Metas cache once every document of a build has been parsed.
 */

pub mod diagnostics;
pub mod directives;
pub mod document;
pub mod environment;
pub mod error;
pub mod line_checker;
pub mod line_data;
pub mod lines;
pub mod metas;
pub mod nodes;
pub mod parser;
pub mod references;
pub mod span;
pub mod table;
pub mod tree;
pub mod url;

pub use diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticKind};
pub use directives::{DirectiveHandler, DirectiveRegistry};
pub use document::{Document, TitleEntry};
pub use environment::Environment;
pub use error::{GuidesError, Result};
pub use metas::{Dependency, Entry, Metas};
pub use nodes::Node;
pub use parser::{DocumentParser, Parser, parse};
pub use references::{
    InvalidLink, ReferenceRegistry, ReferenceResolver, ResolveContext, ResolvedReference,
};
pub use tree::{Section, SectionTree, TreeNode};
