//! The version update command: runs the core workflow and prints its progress.

use std::fmt::Display;

use anyhow::Context;
use camino::Utf8Path;
use owo_colors::{OwoColorize, Stream, Style};
use tracing::{debug, instrument};

use versionup_core::vcs::{CommandOutput, Git};
use versionup_core::workflow::{self, VersionUpEvent, VersionUpOutcome, VersionUpRequest};

/// How progress is reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputMode {
    /// Print the outcome as JSON instead of a progress trace.
    pub json: bool,
    /// Suppress the progress trace.
    pub quiet: bool,
}

/// Run a version update in `cwd`.
///
/// With no new version this prints the current one and changes nothing.
#[instrument(name = "cmd_versionup", skip_all, fields(json_output = output.json))]
pub fn cmd_versionup(
    request: &VersionUpRequest,
    output: OutputMode,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!(new_version = ?request.new_version, "executing versionup command");

    let git = Git::new(cwd);
    let show_progress = !output.json && !output.quiet;
    let outcome = workflow::run(cwd, request, &git, |event| {
        if show_progress {
            print_event(&event);
        }
    })
    .context("version update failed")?;

    if output.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if outcome.new_version.is_none() {
        println!("{}", outcome.old_version);
    } else if !output.quiet {
        print_summary(&outcome);
    }
    Ok(())
}

fn print_event(event: &VersionUpEvent) {
    match event {
        VersionUpEvent::DocumentLoaded { path, dialect } => {
            debug!(%path, %dialect, "document loaded");
        }
        // printed once the run ends, so that report mode output stays bare
        VersionUpEvent::CurrentVersion(_) => {}
        VersionUpEvent::VersionSaved {
            path,
            old_version,
            new_version,
        } => {
            let name = path.file_name().unwrap_or(path.as_str());
            println!(
                "{}: {} → {} {}",
                paint("Version", Style::new().bold()),
                paint(old_version, Style::new().dimmed()),
                paint(new_version, Style::new().green().bold()),
                paint(format!("({name})"), Style::new().dimmed())
            );
        }
        VersionUpEvent::FileUpdated(update) => {
            let noun = if update.replacements == 1 {
                "occurrence"
            } else {
                "occurrences"
            };
            println!(
                "  {} {} {}",
                paint("updated", Style::new().green()),
                update.path,
                paint(format!("({} {noun})", update.replacements), Style::new().dimmed())
            );
        }
        VersionUpEvent::VcsOutput { output, .. } => print_command_output(output),
        VersionUpEvent::Skipped { step, reason } => {
            println!("  {} {step}: {reason}", paint("skipped", Style::new().yellow()));
        }
    }
}

fn print_command_output(output: &CommandOutput) {
    println!(
        "  {} {}",
        paint("$", Style::new().dimmed()),
        paint(&output.command, Style::new().bold())
    );
    for stream in [&output.stdout, &output.stderr] {
        for line in stream.lines().filter(|line| !line.trim().is_empty()) {
            println!("    {}", paint(line, Style::new().dimmed()));
        }
    }
}

fn print_summary(outcome: &VersionUpOutcome) {
    let mut parts = vec![format!("{} file(s) rewritten", outcome.updated_files.len())];
    if outcome.committed {
        parts.push("committed".to_string());
    }
    if let Some(tag) = &outcome.tag {
        parts.push(format!("tagged {}", paint(tag, Style::new().cyan())));
    }
    println!(
        "{} {} ({})",
        paint("Done:", Style::new().green().bold()),
        outcome.current_version(),
        parts.join(", ")
    );
}

/// Style `text` when stdout supports color (honoring `--color`).
fn paint(text: impl Display, style: Style) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.style(style))
        .to_string()
}
