/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for document parsing and reference tracking.
 */

use guides_system_runtime::RuntimeError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort the parse of a single document.
///
/// Recoverable problems (unknown directives, unknown reference roles,
/// malformed tables, ...) never surface here; they are collected as
/// diagnostics on the [`Environment`](crate::Environment).
#[derive(Error, Debug)]
pub enum GuidesError {
    #[error("Include \"{path}\" ({}) does not exist or is not readable", .resolved.display())]
    IncludeNotFound { path: String, resolved: PathBuf },

    #[error("Include \"{path}\" is nested deeper than {max_depth} levels (circular include?)")]
    RecursiveInclude { path: String, max_depth: usize },

    #[error("Include \"{path}\" is not allowed")]
    IncludeNotAllowed { path: String },

    #[error("Unexpected char \"{ch}\" in table separator line \"{line}\"")]
    MalformedTableSeparator { ch: char, line: String },

    #[error("Could not get canonical url for dependency {0}")]
    EmptyCanonicalUrl(String),

    #[error("Could not find dependency \"{dependency}\" in entry for \"{file}\"")]
    UnknownDependency { dependency: String, file: String },

    #[error("Directive \"{name}\" failed: {message}")]
    Directive { name: String, message: String },

    #[error("Invalid metas cache: {0}")]
    Cache(#[from] serde_json::Error),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl GuidesError {
    /// Convenience constructor for directive handlers.
    pub fn directive(name: impl Into<String>, message: impl Into<String>) -> Self {
        GuidesError::Directive {
            name: name.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GuidesError>;
