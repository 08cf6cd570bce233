/*
 * span.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Inline text payloads and the reference occurrences found in them.
 */

//! Inline text is kept as raw markup: rendering of emphasis, literals and
//! friends belongs to the renderer. The parser only needs to know about two
//! inline constructs, because they feed document-level state:
//!
//! - role references (`` :doc:`install` ``, `` :ref:`Label <target>` ``),
//!   which register dependencies and are resolved after parsing;
//! - anonymous references (`` `text`__ `` and `word__`), whose targets are
//!   bound first-in first-out to `__ url` declarations.

use serde::Serialize;

/// A reference such as `` :doc:`Install <guide/install>` ``.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpanReference {
    pub role: String,
    pub target: String,
    pub text: Option<String>,
}

/// Raw inline markup plus the role references it contains.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SpanNode {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<SpanReference>,
}

impl SpanNode {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let references = scan_role_references(&text);
        Self { text, references }
    }
}

fn is_role_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.' | b'+')
}

/// Find every `:role:`content`` occurrence in `text`.
pub fn scan_role_references(text: &str) -> Vec<SpanReference> {
    let bytes = text.as_bytes();
    let mut references = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b':' || (i > 0 && bytes[i - 1].is_ascii_alphanumeric()) {
            i += 1;
            continue;
        }

        let start = i + 1;
        let mut j = start;
        while j < bytes.len() && is_role_char(bytes[j]) {
            j += 1;
        }
        let is_role = j > start + 1 && bytes[j - 1] == b':' && bytes.get(j) == Some(&b'`');
        if !is_role {
            i += 1;
            continue;
        }

        let Some(close) = text[j + 1..].find('`').map(|idx| j + 1 + idx) else {
            break;
        };
        let content = &text[j + 1..close];
        if !content.is_empty() {
            references.push(reference(&text[start..j - 1], content));
        }
        i = close + 1;
    }

    references
}

fn reference(role: &str, content: &str) -> SpanReference {
    if let Some(inner) = content.strip_suffix('>')
        && let Some(open) = inner.rfind('<')
    {
        let label = inner[..open].trim();
        return SpanReference {
            role: role.to_string(),
            target: inner[open + 1..].trim().to_string(),
            text: (!label.is_empty()).then(|| label.to_string()),
        };
    }
    SpanReference {
        role: role.to_string(),
        target: content.trim().to_string(),
        text: None,
    }
}

/// Names of the anonymous references (`` `text`__ ``, `word__`) in `text`,
/// in order of appearance.
pub fn scan_anonymous_references(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut names = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'`' {
            let Some(close) = text[i + 1..].find('`').map(|idx| i + 1 + idx) else {
                break;
            };
            let after_role = i > 0 && bytes[i - 1] == b':';
            let anonymous = text[close + 1..].starts_with("__")
                && !text[close + 1..].starts_with("___");
            if anonymous && !after_role && close > i + 1 {
                names.push(text[i + 1..close].to_string());
                i = close + 3;
            } else {
                i = close + 1;
            }
            continue;
        }

        let word_start = i == 0 || bytes[i - 1].is_ascii_whitespace() || bytes[i - 1] == b'(';
        if word_start && bytes[i].is_ascii_alphanumeric() {
            let mut j = i;
            while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || matches!(bytes[j], b'-' | b'_')) {
                j += 1;
            }
            let word = &text[i..j];
            let ends_cleanly = bytes.get(j).is_none_or(|b| !matches!(b, b'`' | b':'));
            if let Some(stem) = word.strip_suffix("__")
                && !stem.is_empty()
                && !stem.ends_with('_')
                && ends_cleanly
            {
                names.push(stem.to_string());
            }
            i = j.max(i + 1);
            continue;
        }

        i += 1;
    }

    names
}
