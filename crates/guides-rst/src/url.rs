/*
 * url.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Document-relative URL arithmetic.
 */

//! Helpers for turning references written inside a document into document
//! ids and URLs.
//!
//! Document ids are `/`-separated paths relative to the source root, without
//! extension (`guide/install`). A URL starting with `/` is relative to the
//! source root; anything else is relative to the directory of the current
//! document.

/// Directory part of a document id, `""` for documents at the root.
pub fn dir_name(file: &str) -> &str {
    match file.rfind('/') {
        Some(idx) => &file[..idx],
        None => "",
    }
}

/// Resolve `url` against `dir_name`, collapsing `.` and `..` segments.
///
/// Returns `None` when the result is empty.
pub fn canonical_url(dir_name: &str, url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }

    let path = match url.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None if dir_name.is_empty() => url.to_string(),
        None => format!("{dir_name}/{url}"),
    };

    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            ".." => {
                parts.pop();
            }
            "." | "" => {}
            other => parts.push(other),
        }
    }

    let canonical = parts.join("/");
    (!canonical.is_empty()).then_some(canonical)
}

/// Prefix a relative `url` with `dir_name`. External and root-relative URLs
/// are returned unchanged.
pub fn absolute_url(dir_name: &str, url: &str) -> String {
    if is_external(url) || url.starts_with('/') || dir_name.is_empty() {
        url.to_string()
    } else {
        format!("{dir_name}/{url}")
    }
}

/// Express `url` relative to the document `current_file`.
///
/// Root-relative URLs (`/guide/install`) are rewritten with enough `../`
/// segments to climb out of the current document's directory, or reduced to
/// a bare file name when both live in the same directory.
pub fn relative_url(current_file: &str, url: &str) -> String {
    if is_external(url) {
        return url.to_string();
    }
    let Some(rooted) = url.strip_prefix('/') else {
        return url.to_string();
    };

    let current_dir = dir_name(current_file);
    if dir_name(rooted) == current_dir {
        return rooted.rsplit('/').next().unwrap_or(rooted).to_string();
    }

    let depth = if current_dir.is_empty() {
        0
    } else {
        current_dir.split('/').count()
    };
    format!("{}{rooted}", "../".repeat(depth))
}

fn is_external(url: &str) -> bool {
    url.contains("://")
}

/// Lowercase `text` and collapse every run of non-alphanumeric characters
/// into a single `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_name() {
        assert_eq!(dir_name("index"), "");
        assert_eq!(dir_name("guide/setup/install"), "guide/setup");
    }

    #[test]
    fn test_canonical_url() {
        assert_eq!(canonical_url("", "install"), Some("install".to_string()));
        assert_eq!(
            canonical_url("guide", "install"),
            Some("guide/install".to_string())
        );
        assert_eq!(
            canonical_url("guide/setup", "../index"),
            Some("guide/index".to_string())
        );
        assert_eq!(
            canonical_url("guide", "/reference/./api"),
            Some("reference/api".to_string())
        );
        assert_eq!(canonical_url("guide", ".."), None);
        assert_eq!(canonical_url("guide", ""), None);
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(absolute_url("guide", "img.png"), "guide/img.png");
        assert_eq!(absolute_url("guide", "/img.png"), "/img.png");
        assert_eq!(absolute_url("guide", "https://x.org"), "https://x.org");
        assert_eq!(absolute_url("", "img.png"), "img.png");
    }

    #[test]
    fn test_relative_url() {
        assert_eq!(relative_url("guide/install", "/guide/usage"), "usage");
        assert_eq!(relative_url("guide/install", "/index"), "../index");
        assert_eq!(relative_url("index", "/guide/usage"), "guide/usage");
        assert_eq!(relative_url("guide/install", "usage"), "usage");
        assert_eq!(
            relative_url("guide/install", "https://example.com/a"),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Getting Started!"), "getting-started");
        assert_eq!(slugify("  API -- Reference "), "api-reference");
    }
}
