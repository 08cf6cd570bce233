/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Project configuration.
 */

use std::path::{Path, PathBuf};

use guides_rst::Environment;
use guides_rst::environment::DEFAULT_MAX_INCLUDE_DEPTH;
use guides_system_runtime::{SharedRuntime, SystemRuntime};
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};

/// Build settings, read from YAML with kebab-case keys. Missing keys keep
/// their defaults.
///
/// ```yaml
/// initial-header-level: 2
/// output-folder: api/
/// include-root: /srv/docs
/// cache-file: .guides/metas.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    pub initial_header_level: usize,
    pub source_file_extension: String,
    pub output_file_extension: String,
    pub output_folder: String,
    pub ignore_invalid_references: bool,
    pub include_allowed: bool,
    pub include_root: Option<PathBuf>,
    pub max_include_depth: usize,
    pub cache_file: Option<PathBuf>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            initial_header_level: 1,
            source_file_extension: "rst".to_string(),
            output_file_extension: "html".to_string(),
            output_folder: String::new(),
            ignore_invalid_references: false,
            include_allowed: true,
            include_root: None,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            cache_file: None,
        }
    }
}

impl Configuration {
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read a YAML configuration file through the runtime.
    pub fn load(runtime: &dyn SystemRuntime, path: &Path) -> Result<Self> {
        let text = runtime.file_read_string(path)?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text).map_err(|source| BuildError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// URL of the rendered output for document `file`.
    pub fn output_url(&self, file: &str) -> String {
        format!(
            "{}{file}.{}",
            self.output_folder, self.output_file_extension
        )
    }

    /// Path of the source of document `file` below `directory`.
    pub fn source_path(&self, directory: &Path, file: &str) -> PathBuf {
        directory.join(format!("{file}.{}", self.source_file_extension))
    }

    /// A fresh parse context for document `file`.
    pub fn environment(&self, runtime: SharedRuntime, directory: &Path, file: &str) -> Environment {
        Environment::new(runtime)
            .with_current_directory(directory)
            .with_current_file(file)
            .with_initial_header_level(self.initial_header_level)
            .with_include_policy(self.include_allowed, self.include_root.clone())
            .with_max_include_depth(self.max_include_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guides_system_runtime::MemoryRuntime;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_defaults() {
        assert_eq!(Configuration::from_yaml("").unwrap(), Configuration::default());
        let config = Configuration::default();
        assert_eq!(config.source_file_extension, "rst");
        assert_eq!(config.output_url("guide/install"), "guide/install.html");
    }

    #[test]
    fn test_from_yaml() {
        let config = Configuration::from_yaml(
            "initial-header-level: 2\noutput-folder: api/\nignore-invalid-references: true\n",
        )
        .unwrap();
        assert_eq!(config.initial_header_level, 2);
        assert!(config.ignore_invalid_references);
        assert_eq!(config.output_url("index"), "api/index.html");
        assert_eq!(config.source_file_extension, "rst");
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Configuration::from_yaml("initial-header-level: [1, 2]").unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }

    #[test]
    fn test_load_from_runtime() {
        let runtime = MemoryRuntime::new();
        runtime.add_file("/project/guides.yml", "source-file-extension: txt\n");
        let config = Configuration::load(&runtime, Path::new("/project/guides.yml")).unwrap();
        assert_eq!(config.source_file_extension, "txt");
        assert_eq!(
            config.source_path(Path::new("/project/docs"), "guide/install"),
            PathBuf::from("/project/docs/guide/install.txt")
        );

        runtime.add_file("/project/broken.yml", "output-folder: [\n");
        let err = Configuration::load(&runtime, Path::new("/project/broken.yml")).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse /project/broken.yml"));
    }

    #[test]
    fn test_environment() {
        let config = Configuration {
            initial_header_level: 3,
            include_allowed: false,
            ..Configuration::default()
        };
        let env = config.environment(Arc::new(MemoryRuntime::new()), Path::new("/docs"), "guide/index");
        assert_eq!(env.current_file_name(), "guide/index");
        assert_eq!(env.initial_header_level(), 3);
        assert!(!env.include_allowed());
    }
}
