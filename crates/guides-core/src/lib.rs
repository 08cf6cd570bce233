/*
 * guides-core
 * Copyright (c) 2025 Posit, PBC
 *
 * Incremental build orchestration for guides documentation projects.
 *
 * Source files are discovered through the SystemRuntime, compared against the
 * Metas cache to find the ones that changed (directly or through a direct
 * dependency), parsed one after another, and finally resolved against the
 * updated cache so that every cross-document reference is either bound to a
 * document id or reported as broken.
 */

pub mod build;
pub mod collector;
pub mod config;
pub mod error;
pub mod handler;

pub use build::{BuildFailure, BuildReport, Builder};
pub use collector::FileCollector;
pub use config::Configuration;
pub use error::{BuildError, Result};
pub use handler::{ParseFileHandler, ParsedFile};
