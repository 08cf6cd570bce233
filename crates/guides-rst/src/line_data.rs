/*
 * line_data.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Extractors for lines already known to belong to a category.
 */

//! Structured data from single lines.
//!
//! Each extractor is a small hand-written scanner reproducing one line
//! grammar. They return `None` when the line does not match, so callers can
//! also use them as predicates.

use serde::Serialize;

use crate::lines::strip_indent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Link,
    Anchor,
}

/// A link target declaration such as `.. _name: url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub name: String,
    pub url: String,
    pub kind: LinkKind,
}

impl Link {
    fn link(name: &str, url: &str) -> Self {
        Link {
            name: name.to_string(),
            url: url.to_string(),
            kind: LinkKind::Link,
        }
    }

    fn anchor(name: &str) -> Self {
        Link {
            name: name.to_string(),
            url: format!("#{name}"),
            kind: LinkKind::Anchor,
        }
    }

    pub fn is_anchor(&self) -> bool {
        self.kind == LinkKind::Anchor
    }
}

/// The header line of a directive: `.. |alias| name:: data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveHeader {
    /// Substitution alias, empty when absent.
    pub variable: String,
    pub name: String,
    pub data: String,
}

/// Value of a directive option: `:key: value` or the bare flag `:key:`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Text(String),
    Flag(bool),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Text(text) => Some(text),
            OptionValue::Flag(_) => None,
        }
    }

    pub fn is_set(&self) -> bool {
        match self {
            OptionValue::Text(_) => true,
            OptionValue::Flag(flag) => *flag,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveOption {
    pub name: String,
    pub value: OptionValue,
}

/// A list item line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListLine {
    /// First character of the marker (`*`, `-`, a digit or `#`).
    pub prefix: char,
    pub ordered: bool,
    /// Leading indentation: one per space, two per tab.
    pub depth: usize,
    pub text: String,
}

/// One `term : classifier` group of a definition list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionListTerm {
    pub term: String,
    pub classifiers: Vec<String>,
    /// Definition lines with the common indentation removed.
    pub definitions: Vec<String>,
}

/// Parse a link target line.
///
/// Recognised forms, tried in order:
/// `` .. _`name`: url ``, `.. _name: url`, `__ url` (anonymous),
/// `` .. _`anchor`: `` and `.. _anchor:`.
pub fn parse_link(line: &str) -> Option<Link> {
    if let Some(rest) = line.strip_prefix(".. _") {
        if let Some(quoted) = rest.strip_prefix('`')
            && let Some(end) = quoted.find("`: ")
            && end > 0
        {
            let url = &quoted[end + 3..];
            if !url.is_empty() {
                return Some(Link::link(&quoted[..end], url));
            }
        }
        if let Some(sep) = rest.find(": ")
            && sep > 0
            && sep + 2 < rest.len()
        {
            return Some(Link::link(&rest[..sep], &rest[sep + 2..]));
        }
    }

    let trimmed = line.trim();
    if let Some(url) = trimmed.strip_prefix("__ ")
        && !url.is_empty()
    {
        return Some(Link::link("_", url));
    }

    let name = trimmed.strip_prefix(".. _")?.strip_suffix(':')?;
    let name = name
        .strip_prefix('`')
        .and_then(|n| n.strip_suffix('`'))
        .unwrap_or(name);
    if name.is_empty() {
        return None;
    }
    Some(Link::anchor(name))
}

/// Parse a directive header line.
pub fn parse_directive(line: &str) -> Option<DirectiveHeader> {
    let rest = line.strip_prefix(".. ")?;

    let (variable, rest) = match rest.strip_prefix('|') {
        Some(aliased) => match aliased.find("| ") {
            Some(end) if end > 0 => (&aliased[..end], &aliased[end + 2..]),
            _ => ("", rest),
        },
        None => ("", rest),
    };

    let token_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let name = rest[..token_end].strip_suffix("::")?;
    if name.is_empty() {
        return None;
    }

    let tail = &rest[token_end..];
    let data = if tail.is_empty() {
        ""
    } else {
        tail.strip_prefix(' ')?.trim()
    };

    Some(DirectiveHeader {
        variable: variable.to_string(),
        name: name.to_string(),
        data: data.to_string(),
    })
}

/// Parse an indented directive option line (`  :key: value` or `  :key:`).
pub fn parse_directive_option(line: &str) -> Option<DirectiveOption> {
    if !line.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = line.trim_start().strip_prefix(':')?;

    if let Some(sep) = rest.find(": ")
        && sep > 0
    {
        return Some(DirectiveOption {
            name: rest[..sep].to_string(),
            value: OptionValue::Text(rest[sep + 2..].trim().to_string()),
        });
    }

    let name = rest.trim_end().strip_suffix(':')?;
    if name.is_empty() {
        return None;
    }
    Some(DirectiveOption {
        name: name.to_string(),
        value: OptionValue::Flag(true),
    })
}

/// Parse a bullet (`*`, `-`) or enumerated (`1.`, `#.`) list line.
pub fn parse_list_line(line: &str) -> Option<ListLine> {
    let mut depth = 0;
    let mut indent = 0;
    for ch in line.chars() {
        match ch {
            ' ' => depth += 1,
            '\t' => depth += 2,
            _ => break,
        }
        indent += 1;
    }
    let prefix = line[indent..].chars().next()?;

    if let Some(text) = list_item_text(line.trim()) {
        return Some(ListLine {
            prefix,
            ordered: prefix != '*' && prefix != '-',
            depth,
            text: text.to_string(),
        });
    }

    if line == "-" {
        return Some(ListLine {
            prefix,
            ordered: false,
            depth,
            text: String::new(),
        });
    }

    None
}

fn list_item_text(trimmed: &str) -> Option<&str> {
    let after_marker = if let Some(rest) = trimmed
        .strip_prefix('*')
        .or_else(|| trimmed.strip_prefix('-'))
    {
        rest
    } else {
        let marker_len = trimmed
            .find(|c: char| !(c.is_ascii_digit() || c == '#'))
            .unwrap_or(trimmed.len());
        if marker_len == 0 {
            return None;
        }
        trimmed[marker_len..].strip_prefix('.')?
    };
    let text = after_marker.strip_prefix(' ')?;
    if text.is_empty() { None } else { Some(text) }
}

/// Group definition list lines into terms, classifiers and definitions.
///
/// A non-indented line starts a new term; indented or blank lines that follow
/// belong to its definition. The first definition line sets how much
/// indentation is removed from the rest.
pub fn parse_definition_list(lines: &[String]) -> Vec<DefinitionListTerm> {
    let mut terms: Vec<DefinitionListTerm> = Vec::new();
    let mut offset: Option<usize> = None;

    for line in lines {
        let is_definition_line = line.trim().is_empty() || line.starts_with(char::is_whitespace);

        match terms.last_mut() {
            Some(current) if is_definition_line => {
                if line.trim().is_empty() {
                    current.definitions.push(String::new());
                    continue;
                }
                let indent = line.len() - line.trim_start().len();
                let strip = *offset.get_or_insert(indent);
                current
                    .definitions
                    .push(strip_indent(line, strip).to_string());
            }
            _ => {
                if line.trim().is_empty() {
                    continue;
                }
                let mut parts = line.trim().split(" : ").map(str::trim);
                let term = parts.next().unwrap_or_default().to_string();
                terms.push(DefinitionListTerm {
                    term,
                    classifiers: parts.map(str::to_string).collect(),
                    definitions: Vec::new(),
                });
                offset = None;
            }
        }
    }

    for term in &mut terms {
        while term.definitions.last().is_some_and(String::is_empty) {
            term.definitions.pop();
        }
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_named_links() {
        assert_eq!(
            parse_link(".. _Example Site: https://example.com"),
            Some(Link::link("Example Site", "https://example.com"))
        );
        assert_eq!(
            parse_link(".. _`colon: name`: https://example.com"),
            Some(Link::link("colon: name", "https://example.com"))
        );
    }

    #[test]
    fn test_anonymous_link() {
        assert_eq!(
            parse_link("__ https://example.com/a"),
            Some(Link::link("_", "https://example.com/a"))
        );
        assert_eq!(
            parse_link("   __ https://example.com/b  "),
            Some(Link::link("_", "https://example.com/b"))
        );
    }

    #[test]
    fn test_anchors() {
        let anchor = parse_link(".. _installation:").unwrap();
        assert!(anchor.is_anchor());
        assert_eq!(anchor.name, "installation");
        assert_eq!(anchor.url, "#installation");

        let quoted = parse_link(".. _`getting started`:").unwrap();
        assert_eq!(quoted.name, "getting started");
        assert_eq!(quoted.url, "#getting started");
    }

    #[test]
    fn test_not_links() {
        assert_eq!(parse_link(".. note:: text"), None);
        assert_eq!(parse_link(".. _:"), None);
        assert_eq!(parse_link("plain text"), None);
    }

    #[test]
    fn test_directive_header() {
        assert_eq!(
            parse_directive(".. code-block:: php"),
            Some(DirectiveHeader {
                variable: String::new(),
                name: "code-block".to_string(),
                data: "php".to_string(),
            })
        );
        assert_eq!(
            parse_directive(".. |version| replace:: 1.0 "),
            Some(DirectiveHeader {
                variable: "version".to_string(),
                name: "replace".to_string(),
                data: "1.0".to_string(),
            })
        );
        let bare = parse_directive(".. toctree::").unwrap();
        assert_eq!(bare.name, "toctree");
        assert_eq!(bare.data, "");
    }

    #[test]
    fn test_not_directives() {
        assert_eq!(parse_directive(".. a comment"), None);
        assert_eq!(parse_directive(".. foo::bar"), None);
        assert_eq!(parse_directive(".. ::"), None);
        assert_eq!(parse_directive("text:: here"), None);
    }

    #[test]
    fn test_directive_options() {
        assert_eq!(
            parse_directive_option("   :maxdepth: 2"),
            Some(DirectiveOption {
                name: "maxdepth".to_string(),
                value: OptionValue::Text("2".to_string()),
            })
        );
        assert_eq!(
            parse_directive_option("   :glob:"),
            Some(DirectiveOption {
                name: "glob".to_string(),
                value: OptionValue::Flag(true),
            })
        );
        assert_eq!(parse_directive_option(":maxdepth: 2"), None);
        assert_eq!(parse_directive_option("    content"), None);
    }

    #[test]
    fn test_list_lines() {
        assert_eq!(
            parse_list_line("* item"),
            Some(ListLine {
                prefix: '*',
                ordered: false,
                depth: 0,
                text: "item".to_string(),
            })
        );
        assert_eq!(
            parse_list_line("  12. twelfth"),
            Some(ListLine {
                prefix: '1',
                ordered: true,
                depth: 2,
                text: "twelfth".to_string(),
            })
        );
        let tabbed = parse_list_line("\t#. auto").unwrap();
        assert_eq!(tabbed.depth, 2);
        assert!(tabbed.ordered);

        let dash = parse_list_line("-").unwrap();
        assert_eq!(dash.text, "");
    }

    #[test]
    fn test_not_list_lines() {
        assert_eq!(parse_list_line("*emphasis*"), None);
        assert_eq!(parse_list_line("1.5 million"), None);
        assert_eq!(parse_list_line("* "), None);
        assert_eq!(parse_list_line(""), None);
    }

    #[test]
    fn test_definition_list() {
        let lines: Vec<String> = [
            "term : classifier one : two",
            "    First line.",
            "      Nested.",
            "",
            "other",
            "    Definition.",
            "",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let terms = parse_definition_list(&lines);
        assert_eq!(
            terms,
            vec![
                DefinitionListTerm {
                    term: "term".to_string(),
                    classifiers: vec!["classifier one".to_string(), "two".to_string()],
                    definitions: vec!["First line.".to_string(), "  Nested.".to_string()],
                },
                DefinitionListTerm {
                    term: "other".to_string(),
                    classifiers: vec![],
                    definitions: vec!["Definition.".to_string()],
                },
            ]
        );
    }

    #[test]
    fn test_definition_list_wide_whitespace() {
        let lines: Vec<String> = ["term", "    first", "  \u{3000}second", "\u{3000}third"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let terms = parse_definition_list(&lines);
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].definitions, vec!["first", "second", "third"]);
    }
}
