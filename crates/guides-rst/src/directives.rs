/*
 * directives.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Directive handlers and the registry the parser dispatches to.
 */

//! A directive (`.. name:: data`) is collected by the parser together with
//! its options and body, then handed to the [`DirectiveHandler`] registered
//! under its name. Handlers append nodes through the [`DocumentParser`]
//! facade; an error they return is logged and the directive is dropped.
//!
//! Only the directives the document model itself depends on are built in
//! (`toctree`, `code-block`, `replace`). Everything else is registered by the
//! embedder.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{GuidesError, Result};
use crate::nodes::{DirectiveOptions, Node, TocNode};
use crate::parser::DocumentParser;

pub trait DirectiveHandler: Send + Sync {
    fn name(&self) -> &str;

    /// Handle one occurrence.
    ///
    /// `node` is the directive body, already parsed (a block quote, or a code
    /// block when [`wants_code`](Self::wants_code) is set); `variable` is the
    /// `|alias|` of a substitution definition, empty otherwise.
    fn process(
        &self,
        parser: &mut DocumentParser<'_>,
        node: Option<Node>,
        variable: &str,
        data: &str,
        options: &DirectiveOptions,
    ) -> Result<()>;

    /// Parse the body as literal code instead of nested markup.
    fn wants_code(&self) -> bool {
        false
    }

    /// The directive may be followed by unindented content without being
    /// closed.
    fn applies_to_non_block_content(&self) -> bool {
        false
    }
}

#[derive(Clone, Default)]
pub struct DirectiveRegistry {
    handlers: HashMap<String, Arc<dyn DirectiveHandler>>,
}

impl fmt::Debug for DirectiveRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("DirectiveRegistry")
            .field("handlers", &names)
            .finish()
    }
}

impl DirectiveRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in directives.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(Arc::new(Toctree))
            .register(Arc::new(CodeBlock))
            .register(Arc::new(Replace));
        registry
    }

    /// Register `handler`, replacing any handler with the same name.
    pub fn register(&mut self, handler: Arc<dyn DirectiveHandler>) -> &mut Self {
        self.handlers.insert(handler.name().to_string(), handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DirectiveHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

/// `.. toctree::` lists documents; each becomes a dependency.
pub struct Toctree;

impl Toctree {
    /// Document names listed in a toctree body. `Title <file>` entries keep
    /// the file only.
    fn files(body: &str) -> Vec<String> {
        body.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                if let Some(inner) = line.strip_suffix('>')
                    && let Some(open) = inner.rfind('<')
                {
                    inner[open + 1..].trim().to_string()
                } else {
                    line.to_string()
                }
            })
            .collect()
    }
}

impl DirectiveHandler for Toctree {
    fn name(&self) -> &str {
        "toctree"
    }

    fn process(
        &self,
        parser: &mut DocumentParser<'_>,
        node: Option<Node>,
        _variable: &str,
        _data: &str,
        options: &DirectiveOptions,
    ) -> Result<()> {
        let Some(Node::Code(body)) = node else {
            return Ok(());
        };
        let files = Self::files(&body.value);
        for file in &files {
            parser.environment_mut().add_dependency(file, false)?;
        }
        parser.push_node(Node::Toc(TocNode {
            files,
            options: options.clone(),
        }));
        Ok(())
    }

    fn wants_code(&self) -> bool {
        true
    }
}

/// `.. code-block:: language` with a literal body.
pub struct CodeBlock;

impl DirectiveHandler for CodeBlock {
    fn name(&self) -> &str {
        "code-block"
    }

    fn process(
        &self,
        parser: &mut DocumentParser<'_>,
        node: Option<Node>,
        variable: &str,
        data: &str,
        _options: &DirectiveOptions,
    ) -> Result<()> {
        let Some(node) = node else {
            return Ok(());
        };
        let Node::Code(mut code) = node else {
            return Err(GuidesError::directive(self.name(), "expected a literal body"));
        };
        let language = data.trim();
        code.language = (!language.is_empty()).then(|| language.to_string());

        if variable.is_empty() {
            parser.push_node(Node::Code(code));
        } else {
            parser
                .environment_mut()
                .set_variable(variable, serde_json::Value::String(code.value));
        }
        Ok(())
    }

    fn wants_code(&self) -> bool {
        true
    }
}

/// `.. |alias| replace:: text` defines a substitution.
pub struct Replace;

impl DirectiveHandler for Replace {
    fn name(&self) -> &str {
        "replace"
    }

    fn process(
        &self,
        parser: &mut DocumentParser<'_>,
        _node: Option<Node>,
        variable: &str,
        data: &str,
        _options: &DirectiveOptions,
    ) -> Result<()> {
        let span = parser.create_span(data)?;
        if variable.is_empty() {
            parser.push_node(Node::Span(span));
        } else {
            parser
                .environment_mut()
                .set_variable(variable, serde_json::Value::String(span.text));
        }
        Ok(())
    }
}
