//! Current command — print the latest version recorded in the changelog.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use logbump_core::changelog::{self, RecordedVersion, VersionSource};
use logbump_core::config::Config;

/// Arguments for the `current` subcommand.
#[derive(Args, Debug, Default)]
pub struct CurrentArgs {
    /// Changelog to read (default: CHANGELOG.md or the configured path)
    #[arg(long, value_name = "PATH")]
    pub changelog: Option<Utf8PathBuf>,
}

#[derive(Serialize)]
struct CurrentReport {
    changelog: Utf8PathBuf,
    #[serde(flatten)]
    recorded: RecordedVersion,
}

/// Print the recorded version.
#[instrument(name = "cmd_current", skip_all, fields(json_output))]
pub fn cmd_current(
    args: CurrentArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing current command");

    let path = super::changelog_path(config, cwd, args.changelog.as_deref());
    let recorded = changelog::read_recorded_version(&path)?;

    if global_json {
        let report = CurrentReport {
            changelog: path,
            recorded,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", recorded.version.to_string().green().bold());
    match recorded.source {
        VersionSource::Marker => {}
        VersionSource::NoMarker => {
            println!("{}", format!("No release heading in {path}").dimmed());
        }
        VersionSource::MissingFile => {
            println!("{}", format!("{path} does not exist yet").dimmed());
        }
    }

    Ok(())
}
