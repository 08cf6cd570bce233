/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for guides-core.
 */

use std::path::PathBuf;

use guides_rst::GuidesError;
use guides_system_runtime::RuntimeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("File at path {} does not exist", .0.display())]
    FileNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Failed to parse {}: {source}", .path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Parse(#[from] GuidesError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, BuildError>;
