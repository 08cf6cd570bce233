/*
 * table.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Grid ("pretty") and simple table parsing.
 */

//! Tables.
//!
//! Detection works on separator lines: [`parse_table_separator_line`] decides
//! whether a line is a table border and where its columns are. While the
//! parser sits in the table state it feeds every line to a [`TableBuilder`];
//! when the table ends, [`TableBuilder::compile`] infers the grid:
//!
//! ```text
//! +------+-------+      =====  =====
//! | head | head  |      head   head
//! +======+=======+      =====  =====
//! | cell | cell  |      cell   cell
//! +------+-------+      =====  =====
//! ```
//!
//! Compile problems are collected rather than raised; the parser logs the
//! first one together with the table text and drops the table content.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{GuidesError, Result};
use crate::nodes::Node;

const PRETTY_JOINT: char = '+';
const PRETTY_LINE: char = '-';
const PRETTY_HEADER: char = '=';
const SIMPLE_LETTER: char = '=';
const SIMPLE_LETTER_ALT: char = '-';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStyle {
    Simple,
    Pretty,
}

/// A decoded table border line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSeparatorLineConfig {
    /// `+===+` borders of pretty tables
    pub is_header: bool,
    pub style: TableStyle,
    /// Half-open character ranges of the columns.
    pub column_ranges: Vec<(usize, usize)>,
    pub line_char: char,
    pub raw: String,
}

/// Decode `line` as a table separator.
///
/// Returns `Ok(None)` for lines that are not separators, including rules
/// made of a single run of characters.
pub fn parse_table_separator_line(line: &str) -> Result<Option<TableSeparatorLineConfig>> {
    let line = line.trim();
    let Some((line_char, space_char)) = find_table_chars(line) else {
        return Ok(None);
    };

    let (is_header, style, line_char, space_char) = match (line_char, space_char) {
        (PRETTY_JOINT, PRETTY_LINE) => (false, TableStyle::Pretty, PRETTY_LINE, PRETTY_JOINT),
        (PRETTY_JOINT, PRETTY_HEADER) => (true, TableStyle::Pretty, PRETTY_HEADER, PRETTY_JOINT),
        (SIMPLE_LETTER | SIMPLE_LETTER_ALT, ' ') => {
            (false, TableStyle::Simple, line_char, space_char)
        }
        _ => return Ok(None),
    };

    let mut column_ranges = Vec::new();
    let mut current_start: Option<usize> = None;
    let mut len = 0;
    for (i, ch) in line.chars().enumerate() {
        len = i + 1;
        if ch == line_char {
            current_start.get_or_insert(i);
        } else if ch == space_char {
            if let Some(start) = current_start.take() {
                column_ranges.push((start, i));
            }
        } else {
            // Unreachable from the match above: find_table_chars admits two
            // distinct chars and both are handled.
            return Err(GuidesError::MalformedTableSeparator {
                ch,
                line: line.to_string(),
            });
        }
    }
    if let Some(start) = current_start {
        column_ranges.push((start, len));
    }

    if column_ranges.len() < 2 {
        return Ok(None);
    }

    Ok(Some(TableSeparatorLineConfig {
        is_header,
        style,
        column_ranges,
        line_char,
        raw: line.to_string(),
    }))
}

/// The first character of the line, and the first character different from
/// it. Lines using a third character are not separators.
fn find_table_chars(line: &str) -> Option<(char, char)> {
    let mut chars = line.chars();
    let line_char = chars.next()?;
    let mut space_char = None;
    for ch in chars {
        if ch == line_char {
            continue;
        }
        match space_char {
            None => space_char = Some(ch),
            Some(space) if space == ch => {}
            Some(_) => return None,
        }
    }
    space_char.map(|space| (line_char, space))
}

/// A compiled table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableNode {
    pub style: TableStyle,
    pub rows: Vec<TableRow>,
}

impl TableNode {
    pub fn headers(&self) -> impl Iterator<Item = &TableRow> {
        self.rows.iter().filter(|row| row.header)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub header: bool,
    pub columns: Vec<TableColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableColumn {
    pub content: String,
    pub col_span: usize,
    pub row_span: usize,
    /// Parsed cell content, filled in by the document parser.
    pub nodes: Vec<Node>,
}

impl TableColumn {
    fn new(content: &str, col_span: usize) -> Self {
        Self {
            content: content.trim().to_string(),
            col_span,
            row_span: 1,
            nodes: Vec::new(),
        }
    }

    fn add_content(&mut self, content: &str) {
        self.content = format!("{}{}", self.content, content).trim().to_string();
    }

    fn is_completely_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Row under construction: columns keep their original index even after a
/// rowspan removes some of them.
#[derive(Debug, Default)]
struct RowDraft {
    columns: BTreeMap<usize, TableColumn>,
}

impl RowDraft {
    fn add_column(&mut self, content: &str, col_span: usize) {
        let idx = self.columns.len();
        self.columns.insert(idx, TableColumn::new(content, col_span));
    }

    fn first_column_empty(&self) -> bool {
        self.columns
            .values()
            .next()
            .is_none_or(TableColumn::is_completely_empty)
    }

    fn to_line(&self) -> String {
        self.columns
            .values()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Append the content of `other` to this row, column by column.
    fn absorb(&mut self, other: &RowDraft) -> std::result::Result<(), String> {
        if self.columns.keys().any(|idx| !other.columns.contains_key(idx)) {
            return Err(format!(
                "Malformed table: lines \"{}\" and \"{}\" do not appear to be in the same table row",
                self.to_line(),
                other.to_line()
            ));
        }
        for (idx, column) in self.columns.iter_mut() {
            if let Some(source) = other.columns.get(idx) {
                column.add_content(&format!("\n{}", source.content));
            }
        }
        Ok(())
    }
}

fn slice_chars(chars: &[char], start: usize, end: usize) -> String {
    let end = end.min(chars.len());
    if start >= end {
        return String::new();
    }
    chars[start..end].iter().collect()
}

/// Accumulates the lines of one table until it can be compiled.
#[derive(Debug)]
pub struct TableBuilder {
    style: TableStyle,
    separators: BTreeMap<usize, TableSeparatorLineConfig>,
    raw_data_lines: BTreeMap<usize, String>,
    current_line: usize,
    errors: Vec<String>,
}

impl TableBuilder {
    pub fn new(first_separator: TableSeparatorLineConfig) -> Self {
        let mut builder = Self {
            style: first_separator.style,
            separators: BTreeMap::new(),
            raw_data_lines: BTreeMap::new(),
            current_line: 0,
            errors: Vec::new(),
        };
        builder.push_separator_line(first_separator);
        builder
    }

    pub fn style(&self) -> TableStyle {
        self.style
    }

    pub fn push_separator_line(&mut self, config: TableSeparatorLineConfig) {
        self.separators.insert(self.current_line, config);
        self.current_line += 1;
    }

    pub fn push_content_line(&mut self, line: &str) {
        self.raw_data_lines
            .insert(self.current_line, line.to_string());
        self.current_line += 1;
    }

    /// The table as written, one line per separator or content line.
    pub fn table_as_string(&self) -> String {
        (0..self.current_line)
            .filter_map(|i| {
                self.separators
                    .get(&i)
                    .map(|sep| sep.raw.as_str())
                    .or_else(|| self.raw_data_lines.get(&i).map(String::as_str))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Infer the grid. Returns the table and the problems found; when there
    /// are problems the caller is expected to discard the rows.
    pub fn compile(mut self) -> (TableNode, Vec<String>) {
        let rows = match self.style {
            TableStyle::Simple => self.compile_simple(),
            TableStyle::Pretty => self.compile_pretty(),
        };
        let table = TableNode {
            style: self.style,
            rows,
        };
        (table, self.errors)
    }

    fn compile_simple(&mut self) -> Vec<TableRow> {
        let Some(last_data_line) = self.raw_data_lines.keys().next_back().copied() else {
            return Vec::new();
        };

        // A second `=` border closes the header rows, unless it is the bottom
        // border of the table.
        let mut final_headers_row = self
            .separators
            .iter()
            .find(|(i, sep)| **i != 0 && sep.line_char == SIMPLE_LETTER)
            .map_or(0, |(i, _)| *i);
        if final_headers_row > last_data_line {
            final_headers_row = 0;
        }

        let column_ranges = self
            .separators
            .get(&0)
            .map(|sep| sep.column_ranges.clone())
            .unwrap_or_default();
        let last_range_end = column_ranges.last().map_or(0, |range| range.1);

        let mut rows: Vec<(usize, RowDraft)> = Vec::new();
        for (&i, line) in &self.raw_data_lines {
            let chars: Vec<char> = line.chars().collect();
            let mut row = RowDraft::default();
            let mut previous_end: Option<usize> = None;

            for &(start, end) in &column_ranges {
                let beyond_text = start >= chars.len();
                if let Some(prev) = previous_end
                    && !beyond_text
                {
                    let gap = slice_chars(&chars, prev, start);
                    if !gap.trim().is_empty() {
                        self.errors.push(format!(
                            "Malformed table: content \"{gap}\" appears in the \"gap\" on row \"{line}\""
                        ));
                    }
                }

                let content = if beyond_text {
                    String::new()
                } else if end == last_range_end {
                    // the last column runs to the end of the line
                    slice_chars(&chars, start, chars.len())
                } else {
                    slice_chars(&chars, start, end)
                };
                row.add_column(&content, 1);
                previous_end = Some(end);
            }

            rows.push((i, row));
        }

        let mut merged: Vec<(usize, RowDraft)> = Vec::new();
        for (i, row) in rows {
            if row.first_column_empty()
                && let Some((_, previous)) = merged.last_mut()
            {
                if let Err(message) = previous.absorb(&row) {
                    self.errors.push(message);
                }
                continue;
            }
            merged.push((i, row));
        }

        merged
            .into_iter()
            .map(|(i, row)| finish_row(row, i <= final_headers_row))
            .collect()
    }

    fn compile_pretty(&mut self) -> Vec<TableRow> {
        // Merge the column boundaries of every border: a border that splits
        // a column further down the table turns the wider column into a span.
        let mut column_ranges: BTreeMap<usize, usize> = BTreeMap::new();
        let mut final_headers_row = 0;
        for (&row_index, separator) in &self.separators {
            if separator.is_header {
                if final_headers_row != 0 {
                    self.errors.push(format!(
                        "Malformed table: multiple \"header rows\" using \"===\" were found. See table lines \"{}\" and \"{}\"",
                        final_headers_row + 1,
                        row_index
                    ));
                }
                final_headers_row = row_index.saturating_sub(1);
            }

            for &(start, end) in &separator.column_ranges {
                let Some(&known_end) = column_ranges.get(&start) else {
                    column_ranges.insert(start, end);
                    continue;
                };
                if known_end <= end {
                    continue;
                }
                column_ranges.insert(start, end);
                column_ranges.insert(end + 1, known_end);
            }
        }

        let mut rows: BTreeMap<usize, RowDraft> = BTreeMap::new();
        let mut partial_separator_rows: Vec<usize> = Vec::new();
        for (&row_index, line) in &self.raw_data_lines {
            if is_partial_separator(line) {
                partial_separator_rows.push(row_index);
            }

            let chars: Vec<char> = line.chars().collect();
            let mut row = RowDraft::default();
            let mut current_start: Option<usize> = None;
            let mut current_span = 1;
            let mut previous_end: Option<usize> = None;

            for (&start, &end) in &column_ranges {
                if end >= chars.len() {
                    self.errors.push(format!(
                        "Malformed table: Line\n\n{line}\n\ndoes not appear to be a complete table row"
                    ));
                    break;
                }

                if let (Some(column_start), Some(prev)) = (current_start, previous_end) {
                    let gap = slice_chars(&chars, prev, start);
                    if !gap.contains('|') && !gap.contains('+') {
                        // text runs through the gap: colspan
                        current_span += 1;
                    } else {
                        row.add_column(&slice_chars(&chars, column_start, prev), current_span);
                        current_span = 1;
                        current_start = None;
                    }
                }

                current_start.get_or_insert(start);
                previous_end = Some(end);
            }

            if let (Some(column_start), Some(prev)) = (current_start, previous_end) {
                row.add_column(&slice_chars(&chars, column_start, prev), current_span);
            }

            rows.insert(row_index, row);
        }

        let mut columns_in_rowspan: Vec<usize> = Vec::new();
        let row_indexes: Vec<usize> = rows.keys().copied().collect();
        for row_index in row_indexes {
            if !rows.contains_key(&row_index) {
                continue;
            }

            if partial_separator_rows.contains(&row_index) {
                // Part content, part border: content is pushed up into the
                // row the open rowspan started in.
                let Some(row) = rows.remove(&row_index) else {
                    continue;
                };
                for (column_index, column) in row.columns {
                    if !column.is_completely_empty()
                        && column.content.chars().all(|c| c == '-')
                    {
                        continue;
                    }
                    match find_column_in_previous_rows(&mut rows, column_index, row_index) {
                        Some(target) => {
                            target.add_content(&format!("\n{}", column.content));
                            target.row_span += 1;
                            columns_in_rowspan.push(column_index);
                        }
                        None => self.errors.push(format!(
                            "Malformed table: could not find column {column_index} in any previous row"
                        )),
                    }
                }
                continue;
            }

            for column_index in std::mem::take(&mut columns_in_rowspan) {
                let moved = rows
                    .get_mut(&row_index)
                    .and_then(|row| row.columns.remove(&column_index));
                let Some(moved) = moved else {
                    self.errors.push(format!(
                        "Malformed table: cannot find column for index \"{column_index}\""
                    ));
                    continue;
                };
                match find_column_in_previous_rows(&mut rows, column_index, row_index) {
                    Some(target) => target.add_content(&format!("\n{}", moved.content)),
                    None => self.errors.push(format!(
                        "Malformed table: could not find column {column_index} in any previous row"
                    )),
                }
            }

            // Content lines with no border in between form a single row.
            let mut next = row_index + 1;
            while rows.contains_key(&next) && !partial_separator_rows.contains(&next) {
                let Some(target) = rows.remove(&next) else {
                    break;
                };
                if let Some(row) = rows.get_mut(&row_index)
                    && let Err(message) = row.absorb(&target)
                {
                    self.errors.push(message);
                }
                next += 1;
            }
        }

        rows.into_iter()
            .map(|(i, row)| finish_row(row, i <= final_headers_row))
            .collect()
    }
}

/// `+----+` somewhere in the line: a border that only spans some columns.
fn is_partial_separator(line: &str) -> bool {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'+' {
            continue;
        }
        let dashes = bytes[i + 1..].iter().take_while(|&&c| c == b'-').count();
        if dashes > 0 && bytes.get(i + 1 + dashes) == Some(&b'+') {
            return true;
        }
    }
    false
}

fn find_column_in_previous_rows(
    rows: &mut BTreeMap<usize, RowDraft>,
    column_index: usize,
    current_row: usize,
) -> Option<&mut TableColumn> {
    let key = rows
        .range(..current_row)
        .rev()
        .find(|(_, row)| row.columns.contains_key(&column_index))
        .map(|(k, _)| *k)?;
    rows.get_mut(&key)?.columns.get_mut(&column_index)
}

fn finish_row(row: RowDraft, header: bool) -> TableRow {
    TableRow {
        header,
        columns: row.columns.into_values().collect(),
    }
}
