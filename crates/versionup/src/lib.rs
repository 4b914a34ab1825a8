//! Library interface for the `versionup` CLI.
//!
//! This crate exposes the CLI's argument parser as a library, primarily for
//! documentation generation and testing. The actual entry point is in
//! `main.rs`.
//!
//! # Structure
//!
//! - [`Cli`] - The root argument parser (clap derive)
//! - [`commands`] - Command implementations
//!
//! # Documentation Generation
//!
//! The [`command()`] function returns the clap `Command` for generating man pages
//! and shell completions via `xtask`.

pub mod commands;

use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use versionup_core::settings::CliOverrides;

/// Color output preference.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect terminal capabilities automatically.
    #[default]
    Auto,
    /// Always emit colors.
    Always,
    /// Never emit colors.
    Never,
}

impl ColorChoice {
    /// Configure global color output based on this choice.
    ///
    /// Call this once at startup to set the color mode.
    pub fn apply(self) {
        match self {
            Self::Auto => {} // owo-colors auto-detects by default
            Self::Always => owo_colors::set_override(true),
            Self::Never => owo_colors::set_override(false),
        }
    }
}

const AFTER_HELP: &str = "\
PROJECT CONFIGURATION:
    The version is read from [tool.poetry] in pyproject.toml, or from
    [metadata] in setup.cfg. Extra behavior is configured in [tool.versionup]
    (pyproject.toml) or [versionup] (setup.cfg):

        files       Files whose old version string is replaced
        commit      Commit the changed files (default: false)
        tag         Tag the commit (default: false)
        tag_prefix  Prefix of the tag name, e.g. \"v\"
        message     Commit message; $old_version and $new_version are expanded

    Without that section only the version field itself is changed.

ENVIRONMENT VARIABLES:
    RUST_LOG                Log filter (e.g., debug, versionup_core=trace)
    VERSIONUP_LOG_PATH      Explicit log file path
    VERSIONUP_LOG_DIR       Log directory
";

/// Command-line interface definition for versionup.
#[derive(Parser, Debug)]
#[command(name = "versionup")]
#[command(
    about = "Bump the version in pyproject.toml or setup.cfg, rewrite it in declared files, then commit and tag",
    long_about = None
)]
#[command(version)]
#[command(after_long_help = AFTER_HELP)]
pub struct Cli {
    /// New version. Omit to print the current version.
    #[arg(value_name = "NEW_VERSION")]
    pub new_version: Option<String>,

    /// Commit the changed files (overrides the project setting)
    #[arg(long, conflicts_with = "no_commit")]
    pub commit: bool,

    /// Do not commit (overrides the project setting)
    #[arg(long, visible_alias = "nocommit")]
    pub no_commit: bool,

    /// Tag the commit (overrides the project setting)
    #[arg(long, conflicts_with = "no_tag")]
    pub tag: bool,

    /// Do not tag (overrides the project setting)
    #[arg(long, visible_alias = "notag")]
    pub no_tag: bool,

    /// Commit message template ($old_version, $new_version)
    #[arg(short, long, value_name = "TEMPLATE")]
    pub message: Option<String>,

    /// Run as if started in DIR
    #[arg(short = 'C', long, value_name = "DIR")]
    pub chdir: Option<PathBuf>,

    /// Tool settings file (log level, log directory; overrides discovery)
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,

    /// More detail in the log (repeatable; e.g. -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Colorize output
    #[arg(long, value_enum, default_value_t)]
    pub color: ColorChoice,

    /// Output as JSON (for scripting)
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// The commit/tag/message overrides given on the command line.
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            commit: tri_state(self.commit, self.no_commit),
            tag: tri_state(self.tag, self.no_tag),
            message: self.message.clone(),
        }
    }
}

const fn tri_state(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Returns the clap command for documentation generation
pub fn command() -> clap::Command {
    Cli::command()
}
