/*
 * line_checker.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Stateless predicates classifying a single line.
 */

use crate::line_data::{parse_directive, parse_list_line};

/// Characters that may form a title underline or overline.
pub const HEADER_LETTERS: [char; 13] = [
    '=', '-', '~', '*', '+', '^', '"', '.', '`', '\'', '_', '#', ':',
];

/// Returns the marker character when `line` is a title underline/overline:
/// at least two characters, all the same header letter.
pub fn is_special_line(line: &str) -> Option<char> {
    let mut chars = line.chars();
    let first = chars.next()?;
    if !HEADER_LETTERS.contains(&first) {
        return None;
    }
    let mut count = 1;
    for ch in chars {
        if ch != first {
            return None;
        }
        count += 1;
    }
    (count >= 2).then_some(first)
}

/// A list line at depth 0, or at any depth outside of a code context.
pub fn is_list_line(line: &str, is_code: bool) -> bool {
    parse_list_line(line).is_some_and(|list_line| list_line.depth == 0 || !is_code)
}

/// Empty lines and lines starting with whitespace continue an indented block.
pub fn is_block_line(line: &str) -> bool {
    line.chars().next().is_none_or(char::is_whitespace)
}

pub fn is_comment(line: &str) -> bool {
    line.starts_with(".. ")
}

pub fn is_directive(line: &str) -> bool {
    parse_directive(line).is_some()
}

/// A line indented by at least four spaces introduces a definition.
pub fn is_definition_list(line: &str) -> bool {
    line.starts_with("    ")
}

/// A definition list ends at a non-blank, non-indented line that is not
/// followed by an indented line.
pub fn is_definition_list_ended(line: &str, next_line: Option<&str>) -> bool {
    if line.trim().is_empty() || is_indented(line) {
        return false;
    }
    !next_line.is_some_and(is_indented)
}

fn is_indented(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_lines() {
        assert_eq!(is_special_line("====="), Some('='));
        assert_eq!(is_special_line("~~"), Some('~'));
        assert_eq!(is_special_line("::"), Some(':'));
        assert_eq!(is_special_line("="), None);
        assert_eq!(is_special_line("==-"), None);
        assert_eq!(is_special_line("aaaa"), None);
        assert_eq!(is_special_line(""), None);
    }

    #[test]
    fn test_list_lines_in_code_context() {
        assert!(is_list_line("* item", true));
        assert!(is_list_line("  * nested", false));
        assert!(!is_list_line("  * nested", true));
        assert!(!is_list_line("text", false));
    }

    #[test]
    fn test_block_lines() {
        assert!(is_block_line(""));
        assert!(is_block_line("    code"));
        assert!(is_block_line("\tcode"));
        assert!(!is_block_line("text"));
    }

    #[test]
    fn test_comments_and_directives() {
        assert!(is_comment(".. a comment"));
        assert!(!is_comment("..nope"));
        assert!(is_directive(".. note:: hello"));
        assert!(!is_directive(".. a comment"));
    }

    #[test]
    fn test_definition_list_end() {
        assert!(is_definition_list("    definition"));
        assert!(!is_definition_list("  two spaces"));

        assert!(!is_definition_list_ended("", Some("next")));
        assert!(!is_definition_list_ended("    definition", Some("next")));
        assert!(!is_definition_list_ended("term", Some("    definition")));
        assert!(is_definition_list_ended("paragraph", Some("more")));
        assert!(is_definition_list_ended("paragraph", None));
    }
}
