/*
 * build.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Incremental multi-file build.
 */

//! A build runs in three steps:
//!
//! 1. the [`FileCollector`] computes the parse queue from a snapshot of the
//!    Metas cache,
//! 2. every queued file is parsed and its entry written back; a file that
//!    fails is recorded and the build moves on,
//! 3. the references of every parsed document are resolved against the now
//!    complete cache, rewriting the document's entry.

use std::path::Path;

use guides_rst::{Diagnostic, InvalidLink, Metas, Parser};
use guides_system_runtime::SharedRuntime;
use hashlink::LinkedHashMap;

use crate::collector::FileCollector;
use crate::config::Configuration;
use crate::error::Result;
use crate::handler::{ParseFileHandler, ParsedFile};

/// A file whose parse was aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFailure {
    pub file: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct BuildReport {
    /// Files parsed successfully, in queue order.
    pub parsed: Vec<String>,
    pub failures: Vec<BuildFailure>,
    /// Broken references per file.
    pub invalid_links: LinkedHashMap<String, Vec<InvalidLink>>,
    /// Recoverable problems reported while parsing and resolving.
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn invalid_link_count(&self) -> usize {
        self.invalid_links.values().map(Vec::len).sum()
    }
}

pub struct Builder {
    runtime: SharedRuntime,
    config: Configuration,
    parser: Parser,
}

impl Builder {
    pub fn new(runtime: SharedRuntime, config: Configuration) -> Self {
        Self {
            runtime,
            config,
            parser: Parser::new(),
        }
    }

    pub fn with_parser(mut self, parser: Parser) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// The parser used for every file; register directives here.
    pub fn parser_mut(&mut self) -> &mut Parser {
        &mut self.parser
    }

    /// The persisted cache, or an empty one when no cache file is configured.
    pub fn load_metas(&self) -> Result<Metas> {
        match &self.config.cache_file {
            Some(path) => Ok(Metas::load(self.runtime.as_ref(), path)?),
            None => Ok(Metas::new()),
        }
    }

    pub fn build(&self, directory: &Path, metas: &mut Metas) -> Result<BuildReport> {
        let queue = FileCollector::new().get_files(
            self.runtime.as_ref(),
            directory,
            &self.config.source_file_extension,
            metas,
        )?;
        tracing::debug!(directory = %directory.display(), files = queue.len(), "Starting build");

        let handler = ParseFileHandler::new(self.runtime.clone(), &self.parser, &self.config);
        let mut report = BuildReport::default();
        let mut parsed = Vec::with_capacity(queue.len());

        for file in &queue {
            match handler.handle(metas, directory, file) {
                Ok(file) => parsed.push(file),
                Err(err) => {
                    tracing::error!(file = %file, "{err}");
                    report.failures.push(BuildFailure {
                        file: file.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        for mut file in parsed {
            self.resolve_references(&mut file, metas);
            let invalid = file.environment.take_invalid_links();
            if !invalid.is_empty() {
                report.invalid_links.insert(file.file.clone(), invalid);
            }
            report.diagnostics.extend(file.environment.take_diagnostics());
            report.parsed.push(file.file);
        }

        if let Some(path) = &self.config.cache_file {
            metas.save(self.runtime.as_ref(), path)?;
        }

        tracing::debug!(
            parsed = report.parsed.len(),
            failed = report.failures.len(),
            invalid_links = report.invalid_link_count(),
            "Build finished"
        );
        Ok(report)
    }

    fn resolve_references(&self, parsed: &mut ParsedFile, metas: &mut Metas) {
        let Some(mut entry) = metas.get(&parsed.file).cloned() else {
            return;
        };
        for reference in parsed.document.references() {
            parsed
                .environment
                .resolve(metas, Some(&mut entry), &reference.role, &reference.target);
        }

        if !self.config.ignore_invalid_references {
            for link in parsed.environment.invalid_links() {
                tracing::warn!(
                    "Found invalid reference \"{}\" in file \"{}\"",
                    link.name,
                    parsed.file
                );
            }
        }
        metas.update(entry);
    }
}
