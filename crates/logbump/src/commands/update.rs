//! Update command — thin CLI layer over `logbump_core::update`.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use logbump_core::changelog::VersionSource;
use logbump_core::chrono::NaiveDate;
use logbump_core::config::Config;
use logbump_core::history::{Baseline, FailurePolicy, TagOrder};
use logbump_core::update::{self, HistoryOutcome, UpdateOptions, UpdatePlan};
use logbump_core::GitCli;

/// Arguments for the `update` subcommand.
#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    /// Changelog to update (default: CHANGELOG.md or the configured path)
    #[arg(long, value_name = "PATH")]
    pub changelog: Option<Utf8PathBuf>,

    /// Show the entry without writing it
    #[arg(long)]
    pub dry_run: bool,

    /// Tag to fall back to when none matches the recorded version
    #[arg(long, value_enum, value_name = "ORDER")]
    pub baseline: Option<TagOrder>,

    /// Also accept tags named PREFIX<version> (empty string disables)
    #[arg(long, value_name = "PREFIX")]
    pub tag_prefix: Option<String>,

    /// Fail instead of writing a placeholder entry when git history is unavailable
    #[arg(long)]
    pub strict: bool,

    /// Date for the entry heading (default: today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,
}

impl UpdateArgs {
    /// Layer the flags over options derived from configuration.
    fn apply(&self, mut options: UpdateOptions, cwd: &Utf8Path) -> UpdateOptions {
        if let Some(ref path) = self.changelog {
            options.changelog_path = cwd.join(path);
        }
        if let Some(order) = self.baseline {
            options.history.order = order;
        }
        if let Some(ref prefix) = self.tag_prefix {
            options.history.tag_prefix = (!prefix.is_empty()).then(|| prefix.clone());
        }
        if self.strict {
            options.on_error = FailurePolicy::Abort;
        }
        if self.date.is_some() {
            options.date = self.date;
        }
        options
    }
}

/// Execute the update command.
#[instrument(name = "cmd_update", skip_all, fields(json_output))]
pub fn cmd_update(
    args: UpdateArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing update command");

    let options = args.apply(UpdateOptions::from_config(config, cwd), cwd);
    let scm = GitCli::new(cwd);
    let plan = update::plan_update(&scm, &options).context("changelog update failed")?;

    if global_json {
        if args.dry_run {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            return Ok(());
        }
    } else {
        print_plan(&plan);
        if args.dry_run {
            println!();
            print!("{}", plan.rendered_entry());
            println!("{}", "Dry run — no changes made.".yellow());
            return Ok(());
        }
    }

    let outcome = plan.execute().context("failed to write changelog")?;

    if global_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        let file_name = outcome
            .changelog_path
            .file_name()
            .unwrap_or(outcome.changelog_path.as_str());
        println!(
            "  {} {} {} with version {}",
            "✓".green(),
            file_name.cyan(),
            if outcome.created { "created" } else { "updated" },
            outcome.new.to_string().green().bold()
        );
    }

    Ok(())
}

/// Progress lines describing what the update is about to do.
fn print_plan(plan: &UpdatePlan) {
    if plan.recorded.source == VersionSource::MissingFile {
        println!(
            "{}",
            format!(
                "{} not found at {}. Creating a new one.",
                plan.changelog_path.file_name().unwrap_or("Changelog"),
                plan.changelog_path
            )
            .yellow()
        );
    }
    println!(
        "{}: {}",
        "Current version".dimmed(),
        plan.recorded.version
    );

    match plan.history {
        HistoryOutcome::Collected(ref history) => {
            if history.tags.is_empty() {
                println!("{}", "No tags found. Using all commit messages.".dimmed());
            } else {
                println!("{}: {}", "Tags".dimmed(), history.tags.join(", "));
            }
            if let Baseline::Tag { ref name, matched, .. } = history.baseline {
                if matched {
                    println!("{}: {}", "Found tag for version".dimmed(), name.cyan());
                } else {
                    println!(
                        "{}",
                        format!(
                            "No tag found for version {}. Using latest tag {name}.",
                            plan.recorded.version
                        )
                        .yellow()
                    );
                }
            }
            println!(
                "{}: {}",
                "Commit messages".dimmed(),
                history.subjects.len()
            );
        }
        HistoryOutcome::Failed { ref reason } => {
            println!(
                "{} {}",
                "Error getting commit messages:".red(),
                reason
            );
        }
    }

    println!(
        "{}: {} → {}",
        "Version".bold(),
        plan.recorded.version.to_string().dimmed(),
        plan.next.to_string().green().bold()
    );
}
