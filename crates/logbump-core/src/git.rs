//! Git operations for collecting release history.
//!
//! Shells out to `git` for all operations. This ensures we inherit the user's
//! configuration (safe directories, alternates, includes) without linking a
//! git implementation.

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::history::{SourceControl, TagOrder};

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "log").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// [`SourceControl`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: Utf8PathBuf,
}

impl GitCli {
    /// Run git commands from `workdir`.
    pub fn new(workdir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// The directory git commands run in.
    pub fn workdir(&self) -> &Utf8Path {
        &self.workdir
    }
}

impl SourceControl for GitCli {
    fn list_tags(&self, order: TagOrder) -> GitResult<Vec<String>> {
        list_tags(&self.workdir, order)
    }

    fn resolve_commit(&self, reference: &str) -> GitResult<String> {
        resolve_commit(&self.workdir, reference)
    }

    fn subjects_since(&self, commit: Option<&str>) -> GitResult<Vec<String>> {
        commit_subjects(&self.workdir, commit)
    }
}

/// Whether a `git` executable is on `PATH`.
pub fn git_available() -> bool {
    which::which("git").is_ok()
}

/// Check if `workdir` is inside a git work tree.
#[instrument]
pub fn is_inside_repo(workdir: &Utf8Path) -> GitResult<bool> {
    let result = git(workdir, &["rev-parse", "--is-inside-work-tree"]);
    match result {
        Ok(output) => Ok(output.trim() == "true"),
        Err(GitError::Command { .. } | GitError::NotARepo) => Ok(false),
        Err(e) => Err(e),
    }
}

/// List every tag in the repository in the requested order.
#[instrument]
pub fn list_tags(workdir: &Utf8Path, order: TagOrder) -> GitResult<Vec<String>> {
    let mut args = vec!["tag", "--list"];
    match order {
        TagOrder::Listing => {}
        TagOrder::Created => args.push("--sort=creatordate"),
        TagOrder::Semver => args.push("--sort=version:refname"),
    }

    let output = git(workdir, &args)?;
    let tags: Vec<String> = output
        .split_whitespace()
        .map(ToString::to_string)
        .collect();

    debug!(count = tags.len(), ?order, "listed tags");
    Ok(tags)
}

/// Resolve a tag or other reference to the commit it points at.
#[instrument]
pub fn resolve_commit(workdir: &Utf8Path, reference: &str) -> GitResult<String> {
    let output = git(workdir, &["rev-list", "-n", "1", reference])?;
    let commit = output.trim().to_string();
    debug!(%reference, %commit, "resolved reference");
    Ok(commit)
}

/// Subject lines of the commits after `since` up to `HEAD`, or of all of
/// `HEAD`'s history when `since` is `None`.
///
/// Order is whatever `git log` produces (newest first). Commits with an empty
/// message show up as empty strings.
#[instrument]
pub fn commit_subjects(workdir: &Utf8Path, since: Option<&str>) -> GitResult<Vec<String>> {
    let range = since.map(|commit| format!("{commit}..HEAD"));
    let mut args = vec!["log"];
    if let Some(ref range) = range {
        args.push(range);
    }
    args.push("--pretty=format:%s");

    let output = git(workdir, &args)?;
    let subjects = split_subjects(&output);

    debug!(count = subjects.len(), "collected commit subjects");
    Ok(subjects)
}

/// Split `--pretty=format:%s` output into one entry per commit.
///
/// The format uses separator semantics, so there is no trailing newline and a
/// trailing empty line is a commit with an empty subject.
fn split_subjects(output: &str) -> Vec<String> {
    if output.is_empty() {
        return Vec::new();
    }
    output
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

/// Run a git command in `workdir` and return its stdout.
fn git(workdir: &Utf8Path, args: &[&str]) -> GitResult<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(workdir.as_std_path())
        .output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        // Detect "not a git repo" specifically
        if stderr.contains("not a git repository") {
            return Err(GitError::NotARepo);
        }

        Err(GitError::Command {
            command: args.first().unwrap_or(&"").to_string(),
            stderr,
        })
    }
}
