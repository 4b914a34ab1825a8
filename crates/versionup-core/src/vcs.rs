//! Version-control operations: stage, commit, tag.
//!
//! [`Git`] shells out to `git` for all operations. This ensures we inherit the
//! user's identity, signing, hooks, and other configuration. The workflow only
//! talks to the [`Vcs`] trait so it can run against a fake in tests.

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from version-control operations.
#[derive(Error, Debug)]
pub enum VcsError {
    /// The version-control client could not be started.
    #[error("failed to run {program}: {source}")]
    Exec {
        /// Program that was invoked.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The command exited with a non-zero status.
    #[error("`{command}` failed{}: {}", exit_suffix(*.status), .stderr.trim())]
    CommandFailed {
        /// The full command line.
        command: String,
        /// Exit code, if the process exited normally.
        status: Option<i32>,
        /// Captured stdout.
        stdout: String,
        /// Captured stderr.
        stderr: String,
    },
}

fn exit_suffix(status: Option<i32>) -> String {
    status.map_or_else(String::new, |code| format!(" with exit code {code}"))
}

/// Result alias for version-control operations.
pub type VcsResult<T> = Result<T, VcsError>;

/// Captured output of a successful version-control command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    /// The full command line, for display.
    pub command: String,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

/// The version-control operations the workflow needs.
///
/// None of them retries; a failure is returned as-is.
pub trait Vcs {
    /// Mark `paths` for inclusion in the next commit.
    fn stage(&self, paths: &[Utf8PathBuf]) -> VcsResult<CommandOutput>;

    /// Create a revision with `message`, even if nothing changed.
    fn commit(&self, message: &str) -> VcsResult<CommandOutput>;

    /// Create a lightweight tag named `name` at the current revision.
    fn create_tag(&self, name: &str) -> VcsResult<CommandOutput>;
}

/// [`Vcs`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct Git {
    work_dir: Utf8PathBuf,
}

impl Git {
    /// Run git commands inside `work_dir`.
    pub fn new(work_dir: impl AsRef<Utf8Path>) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
        }
    }

    /// Run `git <args>` in the working directory, capturing its output.
    ///
    /// # Errors
    ///
    /// [`VcsError::Exec`] if git cannot be started, [`VcsError::CommandFailed`]
    /// on a non-zero exit.
    pub fn run<S: AsRef<str>>(&self, args: &[S]) -> VcsResult<CommandOutput> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        let command = format!("git {}", args.join(" "));
        debug!(%command, dir = %self.work_dir, "running git");

        let output = Command::new("git")
            .args(&args)
            .current_dir(self.work_dir.as_std_path())
            .output()
            .map_err(|source| VcsError::Exec {
                program: "git".into(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            Ok(CommandOutput {
                command,
                stdout,
                stderr,
            })
        } else {
            Err(VcsError::CommandFailed {
                command,
                status: output.status.code(),
                stdout,
                stderr,
            })
        }
    }
}

impl Vcs for Git {
    #[instrument(skip(self), fields(count = paths.len()))]
    fn stage(&self, paths: &[Utf8PathBuf]) -> VcsResult<CommandOutput> {
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(|path| path.as_str()));
        self.run(&args)
    }

    #[instrument(skip(self))]
    fn commit(&self, message: &str) -> VcsResult<CommandOutput> {
        self.run(&["commit", "--allow-empty", "-m", message])
    }

    #[instrument(skip(self))]
    fn create_tag(&self, name: &str) -> VcsResult<CommandOutput> {
        self.run(&["tag", name])
    }
}
