//! Error types for the ambient tool settings.
//!
//! Errors for the version workflow itself live next to the code that raises
//! them: [`DocumentError`](crate::document::DocumentError),
//! [`RewriteError`](crate::rewrite::RewriteError),
//! [`VcsError`](crate::vcs::VcsError) and
//! [`WorkflowError`](crate::workflow::WorkflowError).

use thiserror::Error;

/// Errors that can occur when loading tool settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize settings.
    #[error("invalid settings: {0}")]
    Deserialize(#[from] Box<figment::Error>),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;
