/*
 * handler.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Parses one source file and records it in the Metas cache.
 */

use std::path::Path;

use guides_rst::{Document, Entry, Environment, Metas, Parser};
use guides_system_runtime::SharedRuntime;

use crate::config::Configuration;
use crate::error::{BuildError, Result};

/// A parsed file together with the context it was parsed in. The context is
/// kept for the reference resolution pass.
#[derive(Debug)]
pub struct ParsedFile {
    pub file: String,
    pub document: Document,
    pub environment: Environment,
}

pub struct ParseFileHandler<'a> {
    runtime: SharedRuntime,
    parser: &'a Parser,
    config: &'a Configuration,
}

impl<'a> ParseFileHandler<'a> {
    pub fn new(runtime: SharedRuntime, parser: &'a Parser, config: &'a Configuration) -> Self {
        Self {
            runtime,
            parser,
            config,
        }
    }

    /// Parse document `file` found below `directory` and store its entry.
    pub fn handle(&self, metas: &mut Metas, directory: &Path, file: &str) -> Result<ParsedFile> {
        let path = self.config.source_path(directory, file);
        if !self.runtime.path_exists(&path)? {
            return Err(BuildError::FileNotFound(path));
        }

        tracing::debug!("Parsing {file}");
        let text = self.runtime.file_read_string(&path)?;
        let mtime = self.runtime.mtime(&path)?;

        let mut environment = self
            .config
            .environment(self.runtime.clone(), directory, file);
        let document = self.parser.parse(&mut environment, &text)?;

        metas.set(
            Entry::new(file)
                .with_url(self.config.output_url(file))
                .with_title(document.title().map(|title| title.text().to_string()))
                .with_titles(document.titles())
                .with_tocs(document.tocs())
                .with_mtime(mtime)
                .with_dependencies(document.dependencies().to_vec())
                .with_links(document.links().clone()),
        );

        Ok(ParsedFile {
            file: file.to_string(),
            document,
            environment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guides_rst::Dependency;
    use guides_system_runtime::MemoryRuntime;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_entry_is_stored() {
        let runtime = MemoryRuntime::new();
        runtime.add_file_with_mtime(
            "/docs/guide/index.rst",
            "Guide\n=====\n\nSee :doc:`install`.\n\n.. _setup: https://example.com/setup\n",
            42,
        );
        let runtime: SharedRuntime = Arc::new(runtime);
        let parser = Parser::new();
        let config = Configuration {
            output_folder: "out/".to_string(),
            ..Configuration::default()
        };

        let mut metas = Metas::new();
        let parsed = ParseFileHandler::new(runtime, &parser, &config)
            .handle(&mut metas, Path::new("/docs"), "guide/index")
            .unwrap();
        assert_eq!(parsed.file, "guide/index");

        let entry = metas.get("guide/index").unwrap();
        assert_eq!(entry.url, "out/guide/index.html");
        assert_eq!(entry.title.as_deref(), Some("Guide"));
        assert_eq!(entry.mtime, 42);
        assert_eq!(
            entry.depends,
            vec![Dependency::Canonical("guide/install".to_string())]
        );
        assert_eq!(
            entry.links.get("setup").map(String::as_str),
            Some("https://example.com/setup")
        );
    }

    #[test]
    fn test_missing_file() {
        let runtime: SharedRuntime = Arc::new(MemoryRuntime::new());
        let parser = Parser::new();
        let config = Configuration::default();

        let err = ParseFileHandler::new(runtime, &parser, &config)
            .handle(&mut Metas::new(), Path::new("/docs"), "missing")
            .unwrap_err();
        assert_eq!(err.to_string(), "File at path /docs/missing.rst does not exist");
    }
}
