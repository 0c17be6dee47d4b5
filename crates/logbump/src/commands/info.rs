//! Info command — show package, configuration and changelog information.

use camino::Utf8Path;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use logbump_core::changelog::{self, RecordedVersion};
use logbump_core::config::Config;

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    repository: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            repository: env!("CARGO_PKG_REPOSITORY"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
struct SettingsInfo {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    config_files: Vec<String>,
    log_level: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    section: String,
    baseline: String,
    tag_prefix: String,
    on_error: String,
}

impl SettingsInfo {
    fn from_config(config: &Config) -> Self {
        Self {
            config_files: config.sources.iter().map(ToString::to_string).collect(),
            log_level: config.log_level.as_str(),
            log_dir: config.log_dir.as_ref().map(ToString::to_string),
            section: config.section().to_string(),
            baseline: config.tag_order().to_string(),
            tag_prefix: config.tag_prefix().to_string(),
            on_error: config.failure_policy().to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChangelogInfo {
    path: String,
    exists: bool,
    #[serde(flatten)]
    recorded: Option<RecordedVersion>,
}

#[derive(Serialize)]
struct FullInfo {
    #[serde(flatten)]
    package: PackageInfo,
    config: SettingsInfo,
    changelog: ChangelogInfo,
}

/// Print package, configuration and changelog information.
#[instrument(name = "cmd_info", skip_all, fields(json_output))]
pub fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing info command");

    let path = super::changelog_path(config, cwd, None);
    // An unreadable changelog is reported, not fatal.
    let recorded = match changelog::read_recorded_version(&path) {
        Ok(recorded) => Some(recorded),
        Err(e) => {
            tracing::warn!(error = %e, "could not read changelog");
            None
        }
    };

    let info = FullInfo {
        package: PackageInfo::new(),
        config: SettingsInfo::from_config(config),
        changelog: ChangelogInfo {
            exists: path.is_file(),
            path: path.to_string(),
            recorded,
        },
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!(
        "{} {}",
        info.package.name.bold(),
        info.package.version.green()
    );
    if !info.package.description.is_empty() {
        println!("{}", info.package.description);
    }
    if !info.package.license.is_empty() {
        println!("{}: {}", "License".dimmed(), info.package.license);
    }
    if !info.package.repository.is_empty() {
        println!("{}: {}", "Repository".dimmed(), info.package.repository.cyan());
    }

    println!();
    println!("{}", "Configuration".bold().underline());
    if info.config.config_files.is_empty() {
        println!("{}: {}", "Config file".dimmed(), "none loaded".yellow());
    }
    for path in &info.config.config_files {
        println!("{}: {}", "Config file".dimmed(), path.cyan());
    }
    println!("{}: {}", "Log level".dimmed(), info.config.log_level);
    if let Some(ref dir) = info.config.log_dir {
        println!("{}: {}", "Log directory".dimmed(), dir);
    }
    println!("{}: {}", "Section".dimmed(), info.config.section);
    println!("{}: {}", "Baseline".dimmed(), info.config.baseline);
    println!("{}: {:?}", "Tag prefix".dimmed(), info.config.tag_prefix);
    println!("{}: {}", "On error".dimmed(), info.config.on_error);

    println!();
    println!("{}", "Changelog".bold().underline());
    println!("{}: {}", "Path".dimmed(), info.changelog.path.cyan());
    match info.changelog.recorded {
        Some(ref recorded) if info.changelog.exists => {
            println!("{}: {}", "Latest version".dimmed(), recorded.version.to_string().green());
        }
        Some(_) => println!("  {} {}", "○".yellow(), "Not created yet".yellow()),
        None => println!("  {} {}", "✗".red(), "Unreadable".red()),
    }

    Ok(())
}
