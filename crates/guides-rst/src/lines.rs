/*
 * lines.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Line cursor, line buffer and source preparation (includes, BOM, nbsp).
 */

use std::path::{Component, Path, PathBuf};

use crate::environment::Environment;
use crate::error::{GuidesError, Result};

const INCLUDE_PREFIX: &str = ".. include:: ";
const BOM: char = '\u{feff}';
const NBSP: char = '\u{a0}';

/// Cursor over the lines of a prepared document.
///
/// The parser re-reads the current line after a state change, so moving
/// forward is always explicit.
#[derive(Debug, Clone, Default)]
pub struct Lines {
    lines: Vec<String>,
    position: usize,
}

impl Lines {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines, position: 0 }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(text.split('\n').map(str::to_string).collect())
    }

    pub fn current(&self) -> Option<&str> {
        self.lines.get(self.position).map(String::as_str)
    }

    /// The line `offset` lines after the current one.
    pub fn peek(&self, offset: usize) -> Option<&str> {
        self.lines.get(self.position + offset).map(String::as_str)
    }

    pub fn advance(&mut self) {
        self.position += 1;
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }

    pub fn is_valid(&self) -> bool {
        self.position < self.lines.len()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Lines collected for the node being built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    lines: Vec<String>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.lines.pop()
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }

    /// Replace the last line; no-op on an empty buffer.
    pub fn set_last(&mut self, line: impl Into<String>) {
        if let Some(last) = self.lines.last_mut() {
            *last = line.into();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn lines_string(&self) -> String {
        self.lines.join("\n")
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }
}

/// Remove the indentation shared by all non-blank lines.
pub fn dedent(lines: &[String]) -> Vec<String> {
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                line.get(indent..).unwrap_or(line.trim_start()).to_string()
            }
        })
        .collect()
}

/// Remove leading whitespace that starts within the first `width` bytes.
/// The cut always lands on a char boundary, so a multi-byte whitespace
/// straddling `width` is removed whole.
pub fn strip_indent(line: &str, width: usize) -> &str {
    let cut = line
        .char_indices()
        .take_while(|(i, c)| *i < width && c.is_whitespace())
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    &line[cut..]
}

/// Normalise raw source text before it is split into lines.
///
/// Line endings become `\n`, the text is wrapped in one leading and one
/// trailing newline, includes are expanded, the UTF-8 BOM is dropped and
/// non-breaking spaces become plain spaces.
pub fn prepare_document(env: &Environment, text: &str) -> Result<String> {
    let text = format!("\n{}\n", text.replace("\r\n", "\n"));
    let text = include_files(env, &text, 0)?;
    Ok(text
        .chars()
        .filter(|ch| *ch != BOM)
        .map(|ch| if ch == NBSP { ' ' } else { ch })
        .collect())
}

/// Replace every `.. include:: path` line with the contents of `path`,
/// recursively.
pub fn include_files(env: &Environment, text: &str, depth: usize) -> Result<String> {
    if !text.contains(INCLUDE_PREFIX) {
        return Ok(text.to_string());
    }

    let mut expanded = Vec::new();
    for line in text.split('\n') {
        let Some(path) = line.strip_prefix(INCLUDE_PREFIX).map(str::trim) else {
            expanded.push(line.to_string());
            continue;
        };
        if path.is_empty() {
            expanded.push(line.to_string());
            continue;
        }

        if !env.include_allowed() {
            return Err(GuidesError::IncludeNotAllowed {
                path: path.to_string(),
            });
        }
        if depth >= env.max_include_depth() {
            return Err(GuidesError::RecursiveInclude {
                path: path.to_string(),
                max_depth: env.max_include_depth(),
            });
        }

        let resolved = normalize(&env.absolute_relative_path(path));
        if let Some(root) = env.include_root()
            && !resolved.starts_with(normalize(root))
        {
            return Err(GuidesError::IncludeNotAllowed {
                path: path.to_string(),
            });
        }

        let runtime = env.runtime();
        if !runtime.path_exists(&resolved).unwrap_or(false) {
            return Err(GuidesError::IncludeNotFound {
                path: path.to_string(),
                resolved,
            });
        }
        let contents = runtime
            .file_read_string(&resolved)
            .map_err(|_| GuidesError::IncludeNotFound {
                path: path.to_string(),
                resolved: resolved.clone(),
            })?;

        tracing::debug!(include = %resolved.display(), depth, "Expanding include");
        expanded.push(include_files(env, &contents.replace("\r\n", "\n"), depth + 1)?);
    }

    Ok(expanded.join("\n"))
}

/// Collapse `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
