//! Structured logging to a JSON-lines file.
//!
//! stdout carries the progress trace and `--json` output, so log records only
//! ever go to a file or, failing that, to stderr.

use anyhow::{Result, anyhow};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const ENV_LOG_PATH: &str = "VERSIONUP_LOG_PATH";
const ENV_LOG_DIR: &str = "VERSIONUP_LOG_DIR";
const LOG_FILE_SUFFIX: &str = ".jsonl";

/// Configuration for logging setup.
#[derive(Clone, Debug)]
pub struct ObservabilityConfig {
    /// Base name of the log file.
    pub service: String,
    /// Directory from the tool settings; environment variables take precedence.
    pub log_dir: Option<PathBuf>,
}

impl ObservabilityConfig {
    /// Config for this binary with an optional settings-provided log directory.
    pub fn from_env_with_overrides(log_dir: Option<PathBuf>) -> Self {
        Self {
            service: env!("CARGO_PKG_NAME").to_string(),
            log_dir,
        }
    }
}

/// Where log records are written.
#[derive(Clone, Debug, PartialEq, Eq)]
enum LogTarget {
    /// Exactly this file, never rotated.
    File { dir: PathBuf, file_name: String },
    /// A daily-rotated file in this directory.
    Daily { dir: PathBuf, file_name: String },
}

impl LogTarget {
    fn appender(&self) -> RollingFileAppender {
        match self {
            Self::File { dir, file_name } => rolling::never(dir, file_name),
            Self::Daily { dir, file_name } => rolling::daily(dir, file_name),
        }
    }
}

/// Keeps the background log writer alive; flushes on drop.
pub struct ObservabilityGuard {
    _log_guard: WorkerGuard,
}

/// Install the global subscriber.
///
/// Returns a guard that must be held until the program exits.
///
/// # Errors
///
/// Never in practice: an unusable log location degrades to stderr. The
/// `Result` leaves room for failures in subscriber installation.
pub fn init_observability(
    cfg: &ObservabilityConfig,
    env_filter: EnvFilter,
) -> Result<ObservabilityGuard> {
    let (writer, guard) = match build_log_writer(&cfg.service, cfg.log_dir.as_deref()) {
        Ok(pair) => pair,
        Err(err) => {
            eprintln!("Warning: {err}. Falling back to stderr logging.");
            tracing_appender::non_blocking(std::io::stderr())
        }
    };

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_ansi(false)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))?;

    tracing::debug!("logging initialized");
    Ok(ObservabilityGuard { _log_guard: guard })
}

/// Build an `EnvFilter` from CLI flags and the environment.
///
/// Priority: quiet flag > verbose flag > RUST_LOG env > default_level
pub fn env_filter(quiet: bool, verbose: u8, default_level: &str) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }

    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

fn build_log_writer(service: &str, config_dir: Option<&Path>) -> Result<(NonBlocking, WorkerGuard)> {
    let target = resolve_log_target(
        service,
        std::env::var_os(ENV_LOG_PATH).map(PathBuf::from),
        std::env::var_os(ENV_LOG_DIR).map(PathBuf::from),
        config_dir.map(Path::to_path_buf),
    )
    .map_err(|e| anyhow!(e))?;

    Ok(tracing_appender::non_blocking(target.appender()))
}

/// Resolve the log target: explicit path, then env dir, then settings dir,
/// then the first writable platform default.
fn resolve_log_target(
    service: &str,
    path_override: Option<PathBuf>,
    dir_override: Option<PathBuf>,
    config_dir: Option<PathBuf>,
) -> Result<LogTarget, String> {
    if let Some(path) = path_override {
        return log_target_from_path(&path);
    }

    let file_name = format!("{service}{LOG_FILE_SUFFIX}");

    if let Some(dir) = dir_override.or(config_dir) {
        ensure_writable(&dir, &file_name)?;
        return Ok(LogTarget::Daily { dir, file_name });
    }

    let mut candidates = Vec::new();
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", service) {
        candidates.push(proj_dirs.data_local_dir().join("logs"));
    }
    if let Ok(dir) = std::env::current_dir() {
        candidates.push(dir);
    }

    candidates
        .into_iter()
        .find(|dir| ensure_writable(dir, &file_name).is_ok())
        .map(|dir| LogTarget::Daily {
            dir,
            file_name: file_name.clone(),
        })
        .ok_or_else(|| "no writable log directory found".to_string())
}

fn log_target_from_path(path: &Path) -> Result<LogTarget, String> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("{ENV_LOG_PATH} must end in a UTF-8 file name"))?
        .to_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    ensure_writable(&dir, &file_name)?;
    Ok(LogTarget::File { dir, file_name })
}

fn ensure_writable(dir: &Path, file_name: &str) -> Result<(), String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("cannot create log directory {}: {e}", dir.display()))?;

    let path = dir.join(file_name);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("cannot open log file {}: {e}", path.display()))?;
    Ok(())
}
