/*
 * diagnostics.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Collector for recoverable problems found while parsing.
//!
//! Every message is mirrored to `tracing` as it is added, so a subscriber
//! sees the same stream the caller later reads back from the collector.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Error,
    Warning,
}

/// A single recoverable diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// The document the diagnostic was raised for, when known.
    pub file: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    /// Add a diagnostic message.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        match diagnostic.kind {
            DiagnosticKind::Error => {
                tracing::error!(file = ?diagnostic.file, "{}", diagnostic.message)
            }
            DiagnosticKind::Warning => {
                tracing::warn!(file = ?diagnostic.file, "{}", diagnostic.message)
            }
        }
        self.diagnostics.push(diagnostic);
    }

    /// Add an error message.
    pub fn error(&mut self, message: impl Into<String>, file: Option<&str>) {
        self.add(Diagnostic {
            kind: DiagnosticKind::Error,
            message: message.into(),
            file: file.map(str::to_string),
        });
    }

    /// Add a warning message.
    pub fn warning(&mut self, message: impl Into<String>, file: Option<&str>) {
        self.add(Diagnostic {
            kind: DiagnosticKind::Warning,
            message: message.into(),
            file: file.map(str::to_string),
        });
    }

    /// Check if any errors were collected (warnings don't count).
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::Error)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Messages only, in the order they were raised.
    pub fn messages(&self) -> Vec<&str> {
        self.diagnostics.iter().map(|d| d.message.as_str()).collect()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
