//! Changelog update planning and execution.
//!
//! All orchestration logic lives here. The CLI is purely a display layer.
//!
//! # Two-phase workflow
//!
//! 1. **Plan** ([`plan_update`]) — read the recorded version, compute the
//!    next one, collect history and build the entry. Nothing is written.
//! 2. **Execute** ([`UpdatePlan::execute`]) — prepend the rendered entry to
//!    the changelog.
//!
//! A dry run is simply a plan that is never executed.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{Local, NaiveDate};
use semver::Version;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::changelog::{self, ChangelogEntry, RecordedVersion};
use crate::config::Config;
use crate::git::GitError;
use crate::history::{
    self, FailurePolicy, History, HistoryOptions, PLACEHOLDER_SUBJECT, SourceControl,
};
use crate::version::{VersionError, next_patch};

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors from update operations.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Reading or writing the changelog failed.
    #[error(transparent)]
    Changelog(#[from] changelog::ChangelogError),

    /// The recorded version cannot be bumped.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// History could not be collected and the policy is [`FailurePolicy::Abort`].
    #[error("could not collect commit history: {0}")]
    History(#[from] GitError),
}

/// Result alias for update operations.
pub type UpdateResult<T> = Result<T, UpdateError>;

// ──────────────────────────────────────────────
// Options
// ──────────────────────────────────────────────

/// Everything [`plan_update`] needs besides source control.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Changelog to read and update.
    pub changelog_path: Utf8PathBuf,
    /// Subsection label for the new entry.
    pub section: String,
    /// Tag selection rules.
    pub history: HistoryOptions,
    /// What to do when history cannot be read.
    pub on_error: FailurePolicy,
    /// Date for the entry heading; today (local time) when `None`.
    pub date: Option<NaiveDate>,
}

impl UpdateOptions {
    /// Options from configuration, with relative paths resolved against
    /// `workdir`.
    pub fn from_config(config: &Config, workdir: &Utf8Path) -> Self {
        let prefix = config.tag_prefix();
        Self {
            changelog_path: workdir.join(config.changelog_path()),
            section: config.section().to_string(),
            history: HistoryOptions {
                order: config.tag_order(),
                tag_prefix: (!prefix.is_empty()).then(|| prefix.to_string()),
            },
            on_error: config.failure_policy(),
            date: None,
        }
    }
}

// ──────────────────────────────────────────────
// Plan
// ──────────────────────────────────────────────

/// Result of collecting history: the commits, or why they are missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum HistoryOutcome {
    /// History was read.
    Collected(History),
    /// History could not be read; the entry carries a placeholder bullet.
    Failed {
        /// The error message.
        reason: String,
    },
}

impl HistoryOutcome {
    /// Subjects to put in the entry.
    pub fn subjects(&self) -> Vec<String> {
        match self {
            Self::Collected(history) => history.subjects.clone(),
            Self::Failed { .. } => vec![PLACEHOLDER_SUBJECT.to_string()],
        }
    }
}

/// A fully computed update, ready to write.
#[derive(Debug, Clone, Serialize)]
pub struct UpdatePlan {
    /// Changelog that will be written.
    pub changelog_path: Utf8PathBuf,
    /// Version found in the changelog before the update.
    pub recorded: RecordedVersion,
    /// Version of the new entry.
    pub next: Version,
    /// Commits that went into the entry.
    pub history: HistoryOutcome,
    /// The entry itself.
    pub entry: ChangelogEntry,
}

/// Plan an update: read the recorded version, bump it, collect history.
///
/// With [`FailurePolicy::Placeholder`] a history failure still produces a
/// plan whose entry has the single bullet [`PLACEHOLDER_SUBJECT`]; with
/// [`FailurePolicy::Abort`] it is returned as [`UpdateError::History`].
#[instrument(skip(scm, options), fields(changelog = %options.changelog_path))]
pub fn plan_update<S: SourceControl + ?Sized>(
    scm: &S,
    options: &UpdateOptions,
) -> UpdateResult<UpdatePlan> {
    let recorded = changelog::read_recorded_version(&options.changelog_path)?;
    let next = next_patch(&recorded.version)?;
    info!(current = %recorded.version, %next, "computed next version");

    let history = match history::collect_history(scm, &recorded.version, &options.history) {
        Ok(history) => HistoryOutcome::Collected(history),
        Err(e) => match options.on_error {
            FailurePolicy::Abort => return Err(e.into()),
            FailurePolicy::Placeholder => {
                warn!(error = %e, "failed to collect history, using placeholder");
                HistoryOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        },
    };

    let date = options.date.unwrap_or_else(|| Local::now().date_naive());
    let entry = ChangelogEntry {
        version: next.clone(),
        date,
        section: options.section.clone(),
        changes: history.subjects(),
    };

    Ok(UpdatePlan {
        changelog_path: options.changelog_path.clone(),
        recorded,
        next,
        history,
        entry,
    })
}

// ──────────────────────────────────────────────
// Execute
// ──────────────────────────────────────────────

/// Result of a successful update.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    /// The version recorded before the update.
    pub previous: Version,
    /// The version of the new entry.
    pub new: Version,
    /// The changelog that was written.
    pub changelog_path: Utf8PathBuf,
    /// Whether the changelog was created by this update.
    pub created: bool,
    /// Number of bullets in the new entry.
    pub bullets: usize,
}

impl UpdatePlan {
    /// The entry as it will appear in the file.
    pub fn rendered_entry(&self) -> String {
        self.entry.render()
    }

    /// Prepend the entry to the changelog.
    #[instrument(skip(self), fields(changelog = %self.changelog_path, next = %self.next))]
    pub fn execute(&self) -> UpdateResult<UpdateOutcome> {
        let created = changelog::prepend_entry(&self.changelog_path, &self.rendered_entry())?;
        let bullets = self.entry.bullets().count();

        info!(
            previous = %self.recorded.version,
            new = %self.next,
            bullets,
            created,
            "changelog updated"
        );

        Ok(UpdateOutcome {
            previous: self.recorded.version.clone(),
            new: self.next.clone(),
            changelog_path: self.changelog_path.clone(),
            created,
            bullets,
        })
    }
}
