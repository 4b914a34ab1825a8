//! Core library for versionup.
//!
//! Bumps the version declared in a project's `pyproject.toml` (poetry) or
//! `setup.cfg` (setuptools), rewrites the old version string in any extra
//! files the project declares, and optionally commits and tags the change.
//!
//! # Modules
//!
//! - [`config`] - Tool settings (log level, log directory)
//! - [`document`] - Project configuration documents in both dialects
//! - [`error`] - Error types and result aliases for tool settings
//! - [`rewrite`] - Literal version substitution across target files
//! - [`settings`] - Merging the `versionup` section with CLI overrides
//! - [`vcs`] - Stage, commit, and tag through the `git` command
//! - [`workflow`] - The end-to-end version update
//!
//! # Quick Start
//!
//! ```no_run
//! use camino::Utf8Path;
//! use versionup_core::settings::CliOverrides;
//! use versionup_core::vcs::Git;
//! use versionup_core::workflow::{self, VersionUpRequest};
//!
//! let dir = Utf8Path::new(".");
//! let request = VersionUpRequest {
//!     new_version: Some("1.0.1".into()),
//!     overrides: CliOverrides::default(),
//! };
//! let outcome = workflow::run(dir, &request, &Git::new(dir), |_| {})
//!     .expect("version update failed");
//! println!("{} -> {}", outcome.old_version, outcome.current_version());
//! ```
#![deny(unsafe_code)]

pub mod config;

pub mod document;

pub mod error;

pub mod rewrite;

pub mod settings;

pub mod vcs;

pub mod workflow;

pub use config::{Config, ConfigLoader, LogLevel};

pub use document::{Dialect, ProjectDocument};

pub use error::{ConfigError, ConfigResult};

pub use workflow::{VersionUpEvent, VersionUpOutcome, VersionUpRequest, WorkflowError};
