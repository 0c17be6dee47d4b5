//! Doctor command — diagnose the repository, configuration and environment.

use std::time::Duration;

use camino::Utf8Path;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use logbump_core::changelog::{self, VersionSource};
use logbump_core::config::{self, Config};
use logbump_core::git;

/// Arguments for the `doctor` subcommand.
#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Ok,
    Warn,
    Fail,
}

#[derive(Serialize)]
struct Check {
    name: &'static str,
    status: Status,
    detail: String,
}

impl Check {
    fn new(name: &'static str, status: Status, detail: impl Into<String>) -> Self {
        Self {
            name,
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Serialize)]
struct DoctorReport {
    checks: Vec<Check>,
    config_files: Vec<String>,
    directories: DirectoryPaths,
    environment: Vec<EnvVar>,
}

#[derive(Serialize)]
struct DirectoryPaths {
    config: Option<String>,
    data_local: Option<String>,
}

#[derive(Serialize)]
struct EnvVar {
    name: &'static str,
    value: Option<String>,
    description: &'static str,
}

const ENV_VARS: &[(&str, &str)] = &[
    ("RUST_LOG", "Log filter directive"),
    ("LOGBUMP_LOG_PATH", "Explicit log file path"),
    ("LOGBUMP_LOG_DIR", "Log directory"),
    ("XDG_CONFIG_HOME", "Override config directory"),
];

impl DoctorReport {
    fn gather(config: &Config, cwd: &Utf8Path) -> Self {
        let config_files: Vec<String> = config.sources.iter().map(ToString::to_string).collect();
        let mut checks = git_checks(config, cwd);
        checks.push(changelog_check(config, cwd));
        checks.push(if config_files.is_empty() {
            Check::new("config", Status::Warn, "no config files loaded; using defaults")
        } else {
            Check::new("config", Status::Ok, config_files.join(", "))
        });

        Self {
            checks,
            config_files,
            directories: DirectoryPaths {
                config: config::user_config_dir().map(|p| p.to_string()),
                data_local: config::user_data_local_dir().map(|p| p.to_string()),
            },
            environment: ENV_VARS
                .iter()
                .map(|&(name, description)| EnvVar {
                    name,
                    value: std::env::var(name).ok(),
                    description,
                })
                .collect(),
        }
    }

    fn failures(&self) -> usize {
        self.checks.iter().filter(|c| c.status == Status::Fail).count()
    }
}

fn git_checks(config: &Config, cwd: &Utf8Path) -> Vec<Check> {
    if !git::git_available() {
        return vec![Check::new(
            "git",
            Status::Fail,
            "git not found on PATH; entries will carry a placeholder bullet",
        )];
    }
    let mut checks = vec![Check::new("git", Status::Ok, "git found on PATH")];

    match git::is_inside_repo(cwd) {
        Ok(true) => {}
        Ok(false) => {
            checks.push(Check::new(
                "repository",
                Status::Fail,
                format!("{cwd} is not inside a git work tree"),
            ));
            return checks;
        }
        Err(e) => {
            checks.push(Check::new("repository", Status::Fail, e.to_string()));
            return checks;
        }
    }
    checks.push(Check::new("repository", Status::Ok, "inside a git work tree"));

    checks.push(match git::list_tags(cwd, config.tag_order()) {
        Ok(tags) => match tags.last() {
            None => Check::new(
                "tags",
                Status::Warn,
                "no tags; the next entry will include the full history",
            ),
            Some(latest) => Check::new(
                "tags",
                Status::Ok,
                format!(
                    "{} tag(s), latest by {}: {latest}",
                    tags.len(),
                    config.tag_order()
                ),
            ),
        },
        Err(e) => Check::new("tags", Status::Fail, e.to_string()),
    });
    checks
}

fn changelog_check(config: &Config, cwd: &Utf8Path) -> Check {
    let path = super::changelog_path(config, cwd, None);
    match changelog::read_recorded_version(&path) {
        Ok(recorded) => match recorded.source {
            VersionSource::Marker => Check::new(
                "changelog",
                Status::Ok,
                format!("{path} at version {}", recorded.version),
            ),
            VersionSource::NoMarker => Check::new(
                "changelog",
                Status::Warn,
                format!("{path} has no release heading; next version will be 0.0.1"),
            ),
            VersionSource::MissingFile => Check::new(
                "changelog",
                Status::Warn,
                format!("{path} does not exist; it will be created"),
            ),
        },
        Err(e) => Check::new("changelog", Status::Fail, e.to_string()),
    }
}

/// Run diagnostics and report their status.
#[instrument(name = "cmd_doctor", skip_all, fields(json_output))]
pub fn cmd_doctor(
    _args: DoctorArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing doctor command");

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message("Gathering diagnostics...");
    spinner.enable_steady_tick(Duration::from_millis(80));

    let report = DoctorReport::gather(config, cwd);
    spinner.finish_and_clear();

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, cwd)?;
    }

    match report.failures() {
        0 => Ok(()),
        n => anyhow::bail!("{n} doctor check(s) failed"),
    }
}

fn print_report(report: &DoctorReport, cwd: &Utf8Path) -> anyhow::Result<()> {
    println!("{}", "Checks".bold().underline());
    for check in &report.checks {
        let marker = match check.status {
            Status::Ok => "✓".green().to_string(),
            Status::Warn => "○".yellow().to_string(),
            Status::Fail => "✗".red().to_string(),
        };
        println!("  {marker} {}: {}", check.name.bold(), check.detail);
    }
    println!();

    println!("{}", "Configuration".bold().underline());
    if report.config_files.is_empty() {
        println!("  {} No config file found", "○".yellow());
        offer_config_creation()?;
    }
    for path in &report.config_files {
        println!("  {} Config file: {}", "✓".green(), path.cyan());
    }
    println!();

    println!("{}", "Directories".bold().underline());
    print_dir("  Config", report.directories.config.as_deref());
    print_dir("  Data (local)", report.directories.data_local.as_deref());
    println!();

    println!("{}", "Environment".bold().underline());
    println!("  {}: {}", "Working directory".dimmed(), cwd.cyan());
    let set_vars: Vec<_> = report
        .environment
        .iter()
        .filter(|v| v.value.is_some())
        .collect();
    if set_vars.is_empty() {
        println!("  {} No logging or XDG overrides set", "○".dimmed());
    }
    for var in set_vars {
        println!(
            "  {}: {} {}",
            var.name.dimmed(),
            var.value.as_deref().unwrap_or_default().cyan(),
            format!("({})", var.description).dimmed()
        );
    }

    if report.failures() > 0 {
        println!();
        println!("{}", "Some checks failed.".red());
    }

    Ok(())
}

fn print_dir(label: &str, path: Option<&str>) {
    print!("{}: ", label.dimmed());
    match path {
        Some(p) => println!("{}", p.cyan()),
        None => println!("{}", "(unavailable)".yellow()),
    }
}

/// Offer to write a default user config when none exists.
fn offer_config_creation() -> anyhow::Result<()> {
    let Some(config_dir) = config::user_config_dir() else {
        return Ok(());
    };
    let config_path = config_dir.join("config.yaml");

    if config_path.exists() || !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Ok(());
    }

    let create = Confirm::new("Create a default config file?")
        .with_default(false)
        .with_help_message(&format!("Will create {config_path}"))
        .prompt();

    // Declined or interrupted prompts leave everything as is.
    if let Ok(true) = create {
        std::fs::create_dir_all(&config_dir)?;
        let yaml = serde_saphyr::to_string(&Config::default())?;
        std::fs::write(&config_path, yaml)?;
        println!("  {} Created {}", "✓".green(), config_path.cyan());
    }

    Ok(())
}
