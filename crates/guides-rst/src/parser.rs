/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Line-oriented state machine producing the flat node sequence.
 */

//! The document parser.
//!
//! Lines are fed one at a time to [`DocumentParser::parse_line`], which
//! either consumes the line or switches state and asks for the same line to
//! be read again. Whenever a construct ends, [`DocumentParser::flush`] turns
//! the buffered lines into a node and, if a directive is pending, hands that
//! node to the directive's handler instead of the document.
//!
//! Titles are emitted together with section brackets:
//!
//! ```text
//! Intro          SectionBegin(title.1)  Title(Intro)
//! =====          ...
//! Usage          SectionEnd(title.1)    SectionBegin(title.2)  Title(Usage)
//! =====          ...
//!                SectionEnd(title.2)
//! ```

use std::sync::Arc;

use crate::directives::{DirectiveHandler, DirectiveRegistry};
use crate::document::Document;
use crate::environment::Environment;
use crate::error::Result;
use crate::line_checker::{
    is_block_line, is_comment, is_definition_list, is_definition_list_ended, is_directive,
    is_list_line, is_special_line,
};
use crate::line_data::{self, DirectiveHeader, ListLine};
use crate::lines::{Buffer, Lines, dedent, prepare_document};
use crate::nodes::{
    CodeNode, DefinitionListItem, DefinitionListNode, DirectiveOptions, ListItem, ListNode, Node,
    TitleNode, TitleRef,
};
use crate::span::{SpanNode, scan_anonymous_references};
use crate::table::{TableBuilder, parse_table_separator_line};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Begin,
    Paragraph,
    List,
    DefinitionList,
    Comment,
    Block,
    Code,
    Table,
    Directive,
    Title,
    Separator,
}

struct PendingDirective {
    header: DirectiveHeader,
    options: DirectiveOptions,
    handler: Arc<dyn DirectiveHandler>,
}

/// Parses one document, or one fragment of it, against a shared
/// [`Environment`].
///
/// Directive handlers receive the parser itself and use it to add nodes,
/// create spans, parse nested fragments and reach the environment.
pub struct DocumentParser<'a> {
    env: &'a mut Environment,
    directives: &'a DirectiveRegistry,
    nodes: Vec<Node>,
    lines: Lines,
    state: ParseState,
    buffer: Buffer,
    /// The next indented block is literal code.
    is_code: bool,
    special_letter: char,
    directive: Option<PendingDirective>,
    list_items: Vec<ListLine>,
    list_flow: bool,
    table: Option<TableBuilder>,
    last_title: Option<TitleRef>,
    open_sections: Vec<TitleRef>,
}

impl<'a> DocumentParser<'a> {
    pub fn new(env: &'a mut Environment, directives: &'a DirectiveRegistry) -> Self {
        Self {
            env,
            directives,
            nodes: Vec::new(),
            lines: Lines::default(),
            state: ParseState::Begin,
            buffer: Buffer::new(),
            is_code: false,
            special_letter: '=',
            directive: None,
            list_items: Vec::new(),
            list_flow: false,
            table: None,
            last_title: None,
            open_sections: Vec::new(),
        }
    }

    pub fn environment(&self) -> &Environment {
        self.env
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        self.env
    }

    pub fn directives(&self) -> &DirectiveRegistry {
        self.directives
    }

    /// Nodes emitted so far.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn push_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Build a span for `text`, reporting its role references to the
    /// registry and its anonymous references to the link table.
    pub fn create_span(&mut self, text: &str) -> Result<SpanNode> {
        let span = SpanNode::new(text);
        for reference in &span.references {
            self.env.found(&reference.role, &reference.target)?;
        }
        for name in scan_anonymous_references(text) {
            self.env.push_anonymous(&name);
        }
        Ok(span)
    }

    /// Parse `text` with a child parser sharing this parser's environment.
    /// Heading letters and links carry over in both directions.
    pub fn parse_fragment(&mut self, text: &str) -> Result<Vec<Node>> {
        DocumentParser::new(self.env, self.directives).parse_nodes(text)
    }

    /// Run the state machine over `text` and return the node sequence.
    pub fn parse_nodes(mut self, text: &str) -> Result<Vec<Node>> {
        let prepared = prepare_document(self.env, text)?;
        self.lines = Lines::from_text(&prepared);

        while let Some(line) = self.lines.current() {
            let line = line.to_string();
            if self.parse_line(&line)? {
                self.lines.advance();
            }
        }

        // The second flush processes a directive whose body ended the input.
        self.flush()?;
        self.flush()?;

        while let Some(open) = self.open_sections.pop() {
            self.nodes.push(Node::SectionEnd(open));
        }
        Ok(self.nodes)
    }

    fn set_state(&mut self, state: ParseState) {
        if self.state != state {
            tracing::trace!(from = ?self.state, to = ?state, "Parser state");
            self.state = state;
        }
    }

    /// Handle one line. `Ok(false)` means the state changed and the same
    /// line must be parsed again.
    fn parse_line(&mut self, line: &str) -> Result<bool> {
        match self.state {
            ParseState::Begin => self.parse_begin(line),

            ParseState::List => {
                if !self.collect_list_line(line) {
                    self.flush()?;
                    self.set_state(ParseState::Begin);
                    return Ok(false);
                }
                Ok(true)
            }

            ParseState::DefinitionList => {
                if is_definition_list_ended(line, self.lines.peek(1)) {
                    self.flush()?;
                    self.set_state(ParseState::Begin);
                    return Ok(false);
                }
                self.buffer.push(line);
                Ok(true)
            }

            ParseState::Table => {
                if line.trim().is_empty() {
                    self.flush()?;
                    self.set_state(ParseState::Begin);
                    return Ok(true);
                }
                let separator = parse_table_separator_line(line)?;
                if let Some(table) = self.table.as_mut() {
                    match separator {
                        Some(config) => table.push_separator_line(config),
                        None => table.push_content_line(line),
                    }
                }
                Ok(true)
            }

            ParseState::Paragraph => self.parse_paragraph_line(line),

            ParseState::Comment => {
                if !is_comment(line) && (line.trim().is_empty() || !line.starts_with(' ')) {
                    self.set_state(ParseState::Begin);
                    return Ok(false);
                }
                Ok(true)
            }

            ParseState::Block | ParseState::Code => {
                if !is_block_line(line) {
                    self.flush()?;
                    self.set_state(ParseState::Begin);
                    return Ok(false);
                }
                self.buffer.push(line);
                Ok(true)
            }

            ParseState::Directive => {
                if self.collect_directive_option(line) {
                    return Ok(true);
                }
                if !is_directive(line) {
                    self.is_code = self
                        .directive
                        .as_ref()
                        .is_some_and(|directive| directive.handler.wants_code());
                    self.set_state(ParseState::Begin);
                    return Ok(false);
                }
                self.flush()?;
                self.init_directive(line);
                Ok(true)
            }

            ParseState::Title | ParseState::Separator => {
                self.set_state(ParseState::Begin);
                Ok(false)
            }
        }
    }

    fn parse_begin(&mut self, line: &str) -> Result<bool> {
        if line.trim().is_empty() {
            return Ok(true);
        }

        if is_list_line(line, self.is_code) {
            self.list_items.clear();
            self.list_flow = true;
            self.set_state(ParseState::List);
            return Ok(false);
        }

        if is_block_line(line) {
            let state = if self.is_code {
                ParseState::Code
            } else {
                ParseState::Block
            };
            self.set_state(state);
            return Ok(false);
        }

        if self.parse_link(line) {
            return Ok(true);
        }

        if is_directive(line) {
            self.set_state(ParseState::Directive);
            self.buffer.clear();
            self.flush()?;
            self.init_directive(line);
            return Ok(true);
        }

        if self.lines.peek(1).is_some_and(is_definition_list) {
            self.set_state(ParseState::DefinitionList);
            self.buffer.push(line);
            return Ok(true);
        }

        if let Some(config) = parse_table_separator_line(line)? {
            self.set_state(ParseState::Table);
            self.table = Some(TableBuilder::new(config));
            return Ok(true);
        }

        // An unindented line after a directive means the directive has no
        // body: process it now.
        if self
            .directive
            .as_ref()
            .is_some_and(|directive| !directive.handler.applies_to_non_block_content())
        {
            self.flush()?;
        }

        if let Some(title) = self.overlined_title(line) {
            // Skip the overline; the underline completes the title.
            self.lines.advance();
            self.buffer.push(title);
            self.set_state(ParseState::Paragraph);
            return Ok(true);
        }

        self.set_state(ParseState::Paragraph);
        Ok(false)
    }

    /// The title text when `line` is an overline repeated two lines below.
    fn overlined_title(&self, line: &str) -> Option<String> {
        let letter = is_special_line(line)?;
        let title = self.lines.peek(1)?;
        let underline = self.lines.peek(2)?;
        if title.trim().is_empty() || is_special_line(underline) != Some(letter) {
            return None;
        }
        Some(title.trim().to_string())
    }

    fn parse_paragraph_line(&mut self, line: &str) -> Result<bool> {
        if line.trim().is_empty() {
            self.flush()?;
            self.set_state(ParseState::Begin);
            return Ok(true);
        }

        if let Some(letter) = is_special_line(line) {
            self.special_letter = letter;
            match self.buffer.pop() {
                Some(title) => {
                    if !self.buffer.is_empty() {
                        self.flush()?;
                    }
                    self.buffer.push(title);
                    self.set_state(ParseState::Title);
                }
                None => {
                    self.buffer.push(line);
                    self.set_state(ParseState::Separator);
                }
            }
            self.flush()?;
            self.set_state(ParseState::Begin);
            return Ok(true);
        }

        if is_directive(line) {
            self.flush()?;
            self.set_state(ParseState::Begin);
            return Ok(false);
        }

        if is_comment(line) {
            self.flush()?;
            self.set_state(ParseState::Comment);
            return Ok(true);
        }

        self.buffer.push(line);
        Ok(true)
    }

    fn parse_link(&mut self, line: &str) -> bool {
        let Some(link) = line_data::parse_link(line) else {
            return false;
        };
        if link.is_anchor() {
            self.nodes.push(Node::Anchor(link.name.clone()));
        }
        self.env.set_link(&link.name, &link.url);
        true
    }

    /// Returns false when `line` neither starts a new item nor continues the
    /// current one.
    fn collect_list_line(&mut self, line: &str) -> bool {
        if line.trim().is_empty() {
            self.list_flow = false;
            return true;
        }

        if is_list_line(line, self.is_code)
            && let Some(list_line) = line_data::parse_list_line(line)
        {
            self.list_items.push(list_line);
            self.list_flow = true;
            return true;
        }

        if let Some(current) = self.list_items.last_mut()
            && (self.list_flow || line.starts_with(char::is_whitespace))
        {
            current.text.push(' ');
            current.text.push_str(line.trim());
            self.list_flow = true;
            return true;
        }

        false
    }

    fn init_directive(&mut self, line: &str) -> bool {
        let Some(header) = line_data::parse_directive(line) else {
            return false;
        };

        let Some(handler) = self.directives.get(&header.name) else {
            let location = match self.env.current_file_name() {
                "" => String::new(),
                file => format!("in \"{file}\" "),
            };
            let message = format!(
                "Unknown directive: \"{}\" {location}for line \"{line}\"",
                header.name
            );
            self.env.add_error(message);
            return false;
        };

        tracing::debug!(directive = %header.name, data = %header.data, "Directive");
        self.directive = Some(PendingDirective {
            header,
            options: DirectiveOptions::new(),
            handler,
        });
        true
    }

    fn collect_directive_option(&mut self, line: &str) -> bool {
        let Some(directive) = self.directive.as_mut() else {
            return false;
        };
        let Some(option) = line_data::parse_directive_option(line) else {
            return false;
        };
        directive.options.insert(option.name, option.value);
        true
    }

    /// Emit the node for the buffered lines of the current state.
    fn flush(&mut self) -> Result<()> {
        let mut node = None;
        self.is_code = false;

        match self.state {
            ParseState::Title if !self.buffer.is_empty() => {
                node = Some(self.flush_title()?);
            }
            ParseState::Separator if !self.buffer.is_empty() => {
                // claims a heading level, like a title using the same letter
                self.env.get_level(self.special_letter);
                node = Some(Node::Separator(self.special_letter));
            }
            ParseState::Code if !self.buffer.is_empty() => {
                node = Some(Node::Code(CodeNode::from_lines(self.buffer.lines())));
            }
            ParseState::Block if !self.buffer.is_empty() => {
                let text = dedent(&self.buffer.take()).join("\n");
                node = Some(Node::Quote(self.parse_fragment(&text)?));
            }
            ParseState::List => {
                node = self.flush_list()?;
            }
            ParseState::DefinitionList if !self.buffer.is_empty() => {
                node = Some(self.flush_definition_list()?);
            }
            ParseState::Table => {
                node = self.flush_table()?;
            }
            ParseState::Paragraph => {
                self.is_code = self.prepare_code();
                let text = self.buffer.lines_string();
                let text = text.trim();
                if !text.is_empty() {
                    node = Some(Node::Paragraph(self.create_span(text)?));
                }
            }
            _ => {}
        }

        if let Some(directive) = self.directive.take() {
            self.process_directive(directive, node.take());
        }

        if let Some(node) = node {
            self.nodes.push(node);
        }
        self.buffer.clear();
        Ok(())
    }

    /// Strip a trailing `::` from the paragraph; the next indented block is
    /// then literal code.
    fn prepare_code(&mut self) -> bool {
        let Some(last) = self.buffer.last() else {
            return false;
        };
        let Some(stripped) = last.trim().strip_suffix("::") else {
            return false;
        };
        let stripped = stripped.trim_end().to_string();
        if stripped.is_empty() {
            self.buffer.pop();
        } else {
            self.buffer.set_last(stripped);
        }
        true
    }

    fn flush_title(&mut self) -> Result<Node> {
        let text = self.buffer.lines_string().trim().to_string();
        let letter_level = self.env.get_level(self.special_letter);
        let level = self.env.initial_header_level() + letter_level - 1;
        let id = self.env.create_title(level);

        let title = TitleNode {
            value: self.create_span(&text)?,
            level,
            id,
        };
        self.transition_sections(title.title_ref());
        Ok(Node::Title(title))
    }

    /// Close the sections the new title ends and open its own.
    fn transition_sections(&mut self, title: TitleRef) {
        if let Some(last) = self.last_title.take() {
            if title.level < last.level {
                while let Some(open) = self.open_sections.pop() {
                    self.nodes.push(Node::SectionEnd(open));
                }
            } else if title.level == last.level
                && self.open_sections.last().is_some_and(|open| open.id == last.id)
                && let Some(open) = self.open_sections.pop()
            {
                self.nodes.push(Node::SectionEnd(open));
            }
        }

        self.nodes.push(Node::SectionBegin(title.clone()));
        self.open_sections.push(title.clone());
        self.last_title = Some(title);
    }

    fn flush_list(&mut self) -> Result<Option<Node>> {
        let lines = std::mem::take(&mut self.list_items);
        if lines.is_empty() {
            return Ok(None);
        }
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            items.push(ListItem {
                prefix: line.prefix,
                ordered: line.ordered,
                depth: line.depth,
                text: self.create_span(&line.text)?,
            });
        }
        Ok(Some(Node::List(ListNode { items })))
    }

    fn flush_definition_list(&mut self) -> Result<Node> {
        let lines = self.buffer.take();
        let mut items = Vec::new();
        for term in line_data::parse_definition_list(&lines) {
            let mut classifiers = Vec::with_capacity(term.classifiers.len());
            for classifier in &term.classifiers {
                classifiers.push(self.create_span(classifier)?);
            }
            items.push(DefinitionListItem {
                term: self.create_span(&term.term)?,
                classifiers,
                definition: self.parse_fragment(&term.definitions.join("\n"))?,
            });
        }
        Ok(Node::DefinitionList(DefinitionListNode { items }))
    }

    fn flush_table(&mut self) -> Result<Option<Node>> {
        let Some(builder) = self.table.take() else {
            return Ok(None);
        };
        let table_text = builder.table_as_string();
        let (mut table, errors) = builder.compile();

        if let Some(first) = errors.first() {
            let message = format!(
                "{first}\nin file {}\n\n{table_text}",
                self.env.current_file_name()
            );
            self.env.add_error(message);
            table.rows.clear();
        }

        for row in &mut table.rows {
            for column in &mut row.columns {
                column.nodes = self.cell_nodes(&column.content)?;
            }
        }
        Ok(Some(Node::Table(table)))
    }

    /// Cells starting with a list are parsed as markup, others are inline
    /// text.
    fn cell_nodes(&mut self, content: &str) -> Result<Vec<Node>> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(Vec::new());
        }
        if is_list_line(content, false) {
            return self.parse_fragment(content);
        }
        Ok(vec![Node::Span(self.create_span(content)?)])
    }

    fn process_directive(&mut self, directive: PendingDirective, node: Option<Node>) {
        let PendingDirective {
            header,
            options,
            handler,
        } = directive;

        if let Err(err) = handler.process(self, node, &header.variable, &header.data, &options) {
            let location = match self.env.current_file_name() {
                "" => String::new(),
                file => format!(" in \"{file}\""),
            };
            let message = format!(
                "Error while processing \"{}\" directive{location}: {err}",
                handler.name()
            );
            self.env.add_error(message);
        }
    }
}

/// Parse a complete document with the given environment and directives.
///
/// The returned [`Document`] snapshots the environment's variables, links and
/// dependencies after the parse.
pub fn parse(env: &mut Environment, directives: &DirectiveRegistry, text: &str) -> Result<Document> {
    tracing::debug!(file = %env.current_file_name(), "Parsing document");
    let nodes = DocumentParser::new(env, directives).parse_nodes(text)?;

    let mut document = Document::new(env.current_file_name(), env.initial_header_level())
        .with_context(
            env.variables().clone(),
            env.links().clone(),
            env.dependencies().to_vec(),
        );
    document.set_nodes(nodes);
    Ok(document)
}

/// Entry point owning the directive set.
#[derive(Debug, Clone)]
pub struct Parser {
    directives: DirectiveRegistry,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// A parser with the built-in directives.
    pub fn new() -> Self {
        Self::with_directives(DirectiveRegistry::with_defaults())
    }

    pub fn with_directives(directives: DirectiveRegistry) -> Self {
        Self { directives }
    }

    pub fn register_directive(&mut self, handler: Arc<dyn DirectiveHandler>) -> &mut Self {
        self.directives.register(handler);
        self
    }

    pub fn directives(&self) -> &DirectiveRegistry {
        &self.directives
    }

    /// Parse a whole document. Heading state of `env` is reset first;
    /// links and variables are kept.
    pub fn parse(&self, env: &mut Environment, text: &str) -> Result<Document> {
        env.reset();
        parse(env, &self.directives, text)
    }

    /// Parse without resetting heading state.
    pub fn parse_local(&self, env: &mut Environment, text: &str) -> Result<Document> {
        parse(env, &self.directives, text)
    }
}
