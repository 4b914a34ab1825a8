//! The end-to-end version update.
//!
//! Steps run strictly in order and never loop back:
//!
//! 1. **Load** the project document (`pyproject.toml` first, then `setup.cfg`).
//! 2. **Read** the current version. With no new version requested the run
//!    stops here and only reports it.
//! 3. **Resolve** the effective settings ([`settings::resolve`]).
//! 4. **Apply** the new version to the document and save it.
//! 5. **Rewrite** the old version in every target file, but only when the
//!    document has a `versionup` section. Without one, steps 5-7 are skipped
//!    regardless of command-line flags.
//! 6. **Commit** all target files when `commit` is enabled.
//! 7. **Tag** `tag_prefix + new_version`, only after a commit.
//!
//! Nothing is rolled back on failure. Progress is reported through an
//! `on_event` callback so the CLI can print each step as it completes.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::document::{Dialect, DocumentError, ProjectDocument};
use crate::rewrite::{self, FileUpdate, RewriteError};
use crate::settings::{self, CliOverrides};
use crate::vcs::{CommandOutput, Vcs, VcsError};

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors from a version update run.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Loading, reading, or saving the project document failed.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// A target file could not be rewritten.
    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    /// A version-control command failed.
    #[error(transparent)]
    Vcs(#[from] VcsError),
}

/// Result alias for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

// ──────────────────────────────────────────────
// Request, steps, and events
// ──────────────────────────────────────────────

/// What the caller asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionUpRequest {
    /// Version to set. `None` or empty reports the current version only.
    pub new_version: Option<String>,
    /// Command-line overrides for the document's settings.
    pub overrides: CliOverrides,
}

impl VersionUpRequest {
    /// The requested version, if it is non-empty.
    pub fn target_version(&self) -> Option<&str> {
        self.new_version.as_deref().filter(|v| !v.is_empty())
    }
}

/// Steps that can be skipped or produce command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionUpStep {
    /// Literal substitution in the target files.
    Rewrite,
    /// Staging the target files.
    Stage,
    /// Creating the commit.
    Commit,
    /// Creating the tag.
    Tag,
}

impl std::fmt::Display for VersionUpStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rewrite => write!(f, "rewrite"),
            Self::Stage => write!(f, "stage"),
            Self::Commit => write!(f, "commit"),
            Self::Tag => write!(f, "tag"),
        }
    }
}

/// Progress events emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionUpEvent {
    /// The project document was found and parsed.
    DocumentLoaded {
        /// Path of the document.
        path: Utf8PathBuf,
        /// Its dialect.
        dialect: Dialect,
    },
    /// The current version was read.
    CurrentVersion(String),
    /// The document was saved with the new version.
    VersionSaved {
        /// Path of the document.
        path: Utf8PathBuf,
        /// The version it declared before.
        old_version: String,
        /// The version it declares now.
        new_version: String,
    },
    /// A target file was rewritten.
    FileUpdated(FileUpdate),
    /// A version-control command finished.
    VcsOutput {
        /// Which step ran the command.
        step: VersionUpStep,
        /// Its captured output.
        output: CommandOutput,
    },
    /// A step did not run.
    Skipped {
        /// The step.
        step: VersionUpStep,
        /// Why it did not run.
        reason: &'static str,
    },
}

/// Why the rewrite, commit, and tag steps were skipped for a document
/// without a `versionup` section.
pub const NO_SECTION: &str = "no versionup section in the project document";

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionUpOutcome {
    /// The project document.
    pub config_file: Utf8PathBuf,
    /// Its dialect.
    pub dialect: Dialect,
    /// The version declared before the run.
    pub old_version: String,
    /// The version written, or `None` when only reporting.
    pub new_version: Option<String>,
    /// Target files rewritten, in order.
    pub updated_files: Vec<FileUpdate>,
    /// Whether a commit was created.
    pub committed: bool,
    /// The tag created, if any.
    pub tag: Option<String>,
}

impl VersionUpOutcome {
    /// The version the document declares after the run.
    pub fn current_version(&self) -> &str {
        self.new_version.as_deref().unwrap_or(&self.old_version)
    }
}

// ──────────────────────────────────────────────
// Run
// ──────────────────────────────────────────────

/// Run a version update in `working_dir`.
///
/// Calls `on_event` after each step so the caller can show progress.
///
/// # Errors
///
/// The first failing step's error; earlier steps are not undone.
#[instrument(skip(request, vcs, on_event), fields(%working_dir, new_version = ?request.new_version))]
pub fn run(
    working_dir: &Utf8Path,
    request: &VersionUpRequest,
    vcs: &dyn Vcs,
    mut on_event: impl FnMut(VersionUpEvent),
) -> WorkflowResult<VersionUpOutcome> {
    let mut doc = ProjectDocument::detect_and_load(working_dir)?;
    on_event(VersionUpEvent::DocumentLoaded {
        path: doc.path().to_path_buf(),
        dialect: doc.dialect(),
    });

    let current = doc.version()?;
    on_event(VersionUpEvent::CurrentVersion(current.clone()));

    let mut outcome = VersionUpOutcome {
        config_file: doc.path().to_path_buf(),
        dialect: doc.dialect(),
        old_version: current,
        new_version: None,
        updated_files: Vec::new(),
        committed: false,
        tag: None,
    };

    let Some(new_version) = request.target_version() else {
        debug!("no new version requested, reporting only");
        return Ok(outcome);
    };

    let resolved = settings::resolve(&doc, new_version, &request.overrides)?;

    doc.set_version(new_version)?;
    doc.save()?;
    outcome.new_version = Some(new_version.to_string());
    on_event(VersionUpEvent::VersionSaved {
        path: doc.path().to_path_buf(),
        old_version: resolved.old_version.clone(),
        new_version: new_version.to_string(),
    });

    if doc.versionup_section().is_none() {
        for step in [VersionUpStep::Rewrite, VersionUpStep::Commit, VersionUpStep::Tag] {
            on_event(VersionUpEvent::Skipped {
                step,
                reason: NO_SECTION,
            });
        }
        info!(old = %outcome.old_version, new = %new_version, "version updated");
        return Ok(outcome);
    }

    outcome.updated_files = rewrite::rewrite_versions(
        working_dir,
        &resolved.target_files,
        &resolved.old_version,
        &resolved.new_version,
        |update| on_event(VersionUpEvent::FileUpdated(update.clone())),
    )?;

    if !resolved.do_commit {
        on_event(VersionUpEvent::Skipped {
            step: VersionUpStep::Commit,
            reason: "commit disabled",
        });
        on_event(VersionUpEvent::Skipped {
            step: VersionUpStep::Tag,
            reason: if resolved.do_tag {
                "a tag requires a commit"
            } else {
                "tag disabled"
            },
        });
        info!(old = %outcome.old_version, new = %new_version, "version updated");
        return Ok(outcome);
    }

    let output = vcs.stage(&resolved.target_files)?;
    on_event(VersionUpEvent::VcsOutput {
        step: VersionUpStep::Stage,
        output,
    });

    let output = vcs.commit(&resolved.commit_message())?;
    outcome.committed = true;
    on_event(VersionUpEvent::VcsOutput {
        step: VersionUpStep::Commit,
        output,
    });

    if resolved.do_tag {
        let tag = resolved.tag_name();
        let output = vcs.create_tag(&tag)?;
        outcome.tag = Some(tag);
        on_event(VersionUpEvent::VcsOutput {
            step: VersionUpStep::Tag,
            output,
        });
    } else {
        on_event(VersionUpEvent::Skipped {
            step: VersionUpStep::Tag,
            reason: "tag disabled",
        });
    }

    info!(
        old = %outcome.old_version,
        new = %new_version,
        committed = outcome.committed,
        tag = ?outcome.tag,
        "version updated"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::VcsResult;
    use indoc::indoc;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    /// Records every call instead of running git.
    #[derive(Default)]
    struct RecordingVcs {
        calls: RefCell<Vec<String>>,
        fail_commit: bool,
    }

    impl RecordingVcs {
        fn failing_commit() -> Self {
            Self {
                fail_commit: true,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn record(&self, call: String) -> VcsResult<CommandOutput> {
            self.calls.borrow_mut().push(call.clone());
            Ok(CommandOutput {
                command: call,
                ..CommandOutput::default()
            })
        }
    }

    impl Vcs for RecordingVcs {
        fn stage(&self, paths: &[Utf8PathBuf]) -> VcsResult<CommandOutput> {
            let paths: Vec<&str> = paths.iter().map(|path| path.as_str()).collect();
            self.record(format!("stage {}", paths.join(" ")))
        }

        fn commit(&self, message: &str) -> VcsResult<CommandOutput> {
            if self.fail_commit {
                return Err(VcsError::CommandFailed {
                    command: "commit".into(),
                    status: Some(1),
                    stdout: String::new(),
                    stderr: "nothing to see".into(),
                });
            }
            self.record(format!("commit {message}"))
        }

        fn create_tag(&self, name: &str) -> VcsResult<CommandOutput> {
            self.record(format!("tag {name}"))
        }
    }

    fn tmp_dir() -> (TempDir, Utf8PathBuf) {
        let tmp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        (tmp, dir)
    }

    fn request(version: &str) -> VersionUpRequest {
        VersionUpRequest {
            new_version: Some(version.into()),
            overrides: CliOverrides::default(),
        }
    }

    const PYPROJECT: &str = indoc! {r#"
        [tool.poetry]
        name = "demo"
        version = "1.0.0"

        [tool.versionup]
        files = ["foo.txt"]
        commit = true
        tag = true
        tag_prefix = "v"
    "#};

    #[test]
    fn full_run_rewrites_commits_and_tags() {
        let (_tmp, dir) = tmp_dir();
        fs::write(dir.join("pyproject.toml"), PYPROJECT).unwrap();
        fs::write(dir.join("foo.txt"), "1.0.0").unwrap();
        let vcs = RecordingVcs::default();

        let mut events = Vec::new();
        let outcome = run(&dir, &request("1.0.1"), &vcs, |e| events.push(e)).unwrap();

        assert_eq!(fs::read_to_string(dir.join("foo.txt")).unwrap(), "1.0.1");
        assert!(
            fs::read_to_string(dir.join("pyproject.toml"))
                .unwrap()
                .contains(r#"version = "1.0.1""#)
        );
        assert_eq!(
            vcs.calls(),
            vec![
                "stage pyproject.toml foo.txt",
                "commit [versionup] 1.0.0 -> 1.0.1",
                "tag v1.0.1",
            ]
        );
        assert!(outcome.committed);
        assert_eq!(outcome.tag.as_deref(), Some("v1.0.1"));
        assert_eq!(outcome.current_version(), "1.0.1");
        assert_eq!(
            outcome
                .updated_files
                .iter()
                .map(|u| u.path.as_str())
                .collect::<Vec<_>>(),
            vec!["pyproject.toml", "foo.txt"]
        );
        assert!(events.contains(&VersionUpEvent::CurrentVersion("1.0.0".into())));
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, VersionUpEvent::Skipped { .. }))
        );
    }

    #[test]
    fn empty_version_only_reports() {
        let (_tmp, dir) = tmp_dir();
        fs::write(dir.join("pyproject.toml"), PYPROJECT).unwrap();
        let vcs = RecordingVcs::default();

        for new_version in [None, Some(String::new())] {
            let req = VersionUpRequest {
                new_version,
                overrides: CliOverrides::default(),
            };
            let outcome = run(&dir, &req, &vcs, |_| {}).unwrap();
            assert_eq!(outcome.old_version, "1.0.0");
            assert_eq!(outcome.new_version, None);
        }

        assert_eq!(fs::read_to_string(dir.join("pyproject.toml")).unwrap(), PYPROJECT);
        assert!(vcs.calls().is_empty());
    }

    #[test]
    fn missing_section_skips_everything_after_save() {
        let (_tmp, dir) = tmp_dir();
        fs::write(dir.join("setup.cfg"), "[metadata]\nversion = 0.1\n").unwrap();
        fs::write(dir.join("foo.txt"), "0.1").unwrap();
        let vcs = RecordingVcs::default();
        let req = VersionUpRequest {
            new_version: Some("0.2".into()),
            overrides: CliOverrides {
                commit: Some(true),
                tag: Some(true),
                message: None,
            },
        };

        let mut skipped = Vec::new();
        let outcome = run(&dir, &req, &vcs, |e| {
            if let VersionUpEvent::Skipped { step, reason } = e {
                skipped.push((step, reason));
            }
        })
        .unwrap();

        assert_eq!(
            fs::read_to_string(dir.join("setup.cfg")).unwrap(),
            "[metadata]\nversion = 0.2\n"
        );
        assert_eq!(fs::read_to_string(dir.join("foo.txt")).unwrap(), "0.1");
        assert!(vcs.calls().is_empty());
        assert!(!outcome.committed);
        assert!(outcome.updated_files.is_empty());
        assert_eq!(
            skipped,
            vec![
                (VersionUpStep::Rewrite, NO_SECTION),
                (VersionUpStep::Commit, NO_SECTION),
                (VersionUpStep::Tag, NO_SECTION),
            ]
        );
    }

    #[test]
    fn tag_is_never_created_without_commit() {
        let (_tmp, dir) = tmp_dir();
        fs::write(
            dir.join("setup.cfg"),
            "[metadata]\nversion = 0.1\n\n[versionup]\ncommit = False\ntag = True\n",
        )
        .unwrap();
        let vcs = RecordingVcs::default();

        let mut events = Vec::new();
        let outcome = run(&dir, &request("0.2"), &vcs, |e| events.push(e)).unwrap();

        assert!(vcs.calls().is_empty());
        assert_eq!(outcome.tag, None);
        assert!(events.contains(&VersionUpEvent::Skipped {
            step: VersionUpStep::Tag,
            reason: "a tag requires a commit",
        }));
    }

    #[test]
    fn cli_overrides_disable_commit() {
        let (_tmp, dir) = tmp_dir();
        fs::write(dir.join("pyproject.toml"), PYPROJECT).unwrap();
        fs::write(dir.join("foo.txt"), "1.0.0").unwrap();
        let vcs = RecordingVcs::default();
        let req = VersionUpRequest {
            new_version: Some("1.1.0".into()),
            overrides: CliOverrides {
                commit: Some(false),
                ..CliOverrides::default()
            },
        };

        let outcome = run(&dir, &req, &vcs, |_| {}).unwrap();

        assert_eq!(fs::read_to_string(dir.join("foo.txt")).unwrap(), "1.1.0");
        assert!(vcs.calls().is_empty());
        assert!(!outcome.committed);
    }

    #[test]
    fn commit_without_tag() {
        let (_tmp, dir) = tmp_dir();
        fs::write(
            dir.join("setup.cfg"),
            "[metadata]\nversion = 0.1\n\n[versionup]\ncommit = true\nmessage = bump $new_version\n",
        )
        .unwrap();
        let vcs = RecordingVcs::default();

        let outcome = run(&dir, &request("0.2"), &vcs, |_| {}).unwrap();

        assert_eq!(vcs.calls(), vec!["stage setup.cfg", "commit bump 0.2"]);
        assert!(outcome.committed);
        assert_eq!(outcome.tag, None);
    }

    #[test]
    fn commit_failure_stops_before_tag() {
        let (_tmp, dir) = tmp_dir();
        fs::write(dir.join("pyproject.toml"), PYPROJECT).unwrap();
        fs::write(dir.join("foo.txt"), "1.0.0").unwrap();
        let vcs = RecordingVcs::failing_commit();

        let err = run(&dir, &request("1.0.1"), &vcs, |_| {}).unwrap_err();

        assert!(matches!(err, WorkflowError::Vcs(VcsError::CommandFailed { .. })));
        assert_eq!(vcs.calls(), vec!["stage pyproject.toml foo.txt"]);
        // files stay rewritten
        assert_eq!(fs::read_to_string(dir.join("foo.txt")).unwrap(), "1.0.1");
    }

    #[test]
    fn missing_target_file_aborts_before_vcs() {
        let (_tmp, dir) = tmp_dir();
        fs::write(dir.join("pyproject.toml"), PYPROJECT).unwrap();
        let vcs = RecordingVcs::default();

        let err = run(&dir, &request("1.0.1"), &vcs, |_| {}).unwrap_err();

        assert!(matches!(err, WorkflowError::Rewrite(_)));
        assert!(vcs.calls().is_empty());
    }

    #[test]
    fn missing_document_is_reported() {
        let (_tmp, dir) = tmp_dir();
        let err = run(&dir, &request("1.0.1"), &RecordingVcs::default(), |_| {}).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Document(DocumentError::ConfigNotFound(_))
        ));
    }

    #[test]
    fn rerunning_with_same_version_is_stable() {
        let (_tmp, dir) = tmp_dir();
        fs::write(dir.join("pyproject.toml"), PYPROJECT).unwrap();
        fs::write(dir.join("foo.txt"), "1.0.0").unwrap();
        let vcs = RecordingVcs::default();

        run(&dir, &request("1.0.1"), &vcs, |_| {}).unwrap();
        let first = fs::read_to_string(dir.join("pyproject.toml")).unwrap();
        let outcome = run(&dir, &request("1.0.1"), &vcs, |_| {}).unwrap();

        assert_eq!(outcome.old_version, "1.0.1");
        assert_eq!(fs::read_to_string(dir.join("pyproject.toml")).unwrap(), first);
        assert_eq!(fs::read_to_string(dir.join("foo.txt")).unwrap(), "1.0.1");
        // a second, empty commit is still made
        assert_eq!(
            vcs.calls()
                .iter()
                .filter(|c| c.starts_with("commit"))
                .count(),
            2
        );
    }
}
