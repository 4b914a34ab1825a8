//! versionup CLI
#![deny(unsafe_code)]

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Parser;
use tracing::debug;
use versionup::Cli;
use versionup::commands::versionup::{OutputMode, cmd_versionup};
use versionup_core::config::ConfigLoader;
use versionup_core::workflow::VersionUpRequest;

mod observability;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.color.apply();

    if let Some(ref dir) = cli.chdir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("failed to change directory to {}", dir.display()))?;
    }

    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| {
        anyhow::anyhow!(
            "current directory is not valid UTF-8: {}",
            e.into_path_buf().display()
        )
    })?;

    let mut loader = ConfigLoader::new().with_project_search(&cwd);
    if let Some(ref settings_path) = cli.settings {
        let settings_path = Utf8PathBuf::try_from(settings_path.clone()).map_err(|e| {
            anyhow::anyhow!(
                "settings path is not valid UTF-8: {}",
                e.into_path_buf().display()
            )
        })?;
        loader = loader.with_file(&settings_path);
    }
    let config = loader.load().context("failed to load tool settings")?;

    let obs_config = observability::ObservabilityConfig::from_env_with_overrides(
        config
            .log_dir
            .as_ref()
            .map(|dir| dir.as_std_path().to_path_buf()),
    );
    let env_filter = observability::env_filter(cli.quiet, cli.verbose, config.log_level.as_str());
    let _guard = observability::init_observability(&obs_config, env_filter)
        .context("failed to initialize logging")?;

    debug!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        json = cli.json,
        color = ?cli.color,
        chdir = ?cli.chdir,
        "CLI initialized"
    );

    let request = VersionUpRequest {
        new_version: cli.new_version.clone(),
        overrides: cli.overrides(),
    };
    let output = OutputMode {
        json: cli.json,
        quiet: cli.quiet,
    };

    let result = cmd_versionup(&request, output, &cwd);
    if let Err(ref err) = result {
        tracing::error!(error = %err, "fatal error");
    }
    result
}
