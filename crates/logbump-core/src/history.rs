//! Commit history since the last release.
//!
//! The baseline for "this release" is the tag matching the version recorded
//! in the changelog. When no such tag exists, the last tag in the configured
//! [`TagOrder`] is used instead, and with no tags at all the whole history
//! of `HEAD` counts.

use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::git::GitResult;

/// Subject used in place of the commit list when history could not be read.
pub const PLACEHOLDER_SUBJECT: &str = "Error retrieving commit messages";

/// The read-only queries logbump needs from source control.
pub trait SourceControl {
    /// All tag names, in the requested order.
    fn list_tags(&self, order: TagOrder) -> GitResult<Vec<String>>;

    /// Resolve a tag (or any reference) to a commit id.
    fn resolve_commit(&self, reference: &str) -> GitResult<String>;

    /// Subject lines of the commits after `commit` up to `HEAD`, or of the
    /// full history when `commit` is `None`.
    fn subjects_since(&self, commit: Option<&str>) -> GitResult<Vec<String>>;
}

/// Which tag counts as "latest" when none matches the recorded version.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TagOrder {
    /// Plain `git tag` listing order (alphabetical).
    Listing,
    /// Tag creation date; the most recently created tag wins.
    #[default]
    Created,
    /// Semantic version order; the highest version wins.
    Semver,
}

impl fmt::Display for TagOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listing => write!(f, "listing"),
            Self::Created => write!(f, "created"),
            Self::Semver => write!(f, "semver"),
        }
    }
}

/// What to do when history cannot be collected.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Write the entry anyway with a single placeholder bullet.
    #[default]
    Placeholder,
    /// Stop without touching the changelog.
    Abort,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Placeholder => "placeholder",
            Self::Abort => "abort",
        })
    }
}

/// The commit the release range starts after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Baseline {
    /// No tags exist; every commit reachable from `HEAD` is included.
    FullHistory,
    /// Commits after this tag's commit are included.
    Tag {
        /// Tag name.
        name: String,
        /// Commit the tag resolves to.
        commit: String,
        /// Whether the tag matched the recorded version (vs. the fallback).
        matched: bool,
    },
}

impl fmt::Display for Baseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullHistory => write!(f, "full history"),
            Self::Tag {
                name,
                matched: true,
                ..
            } => write!(f, "tag {name}"),
            Self::Tag {
                name,
                matched: false,
                ..
            } => write!(f, "tag {name} (latest)"),
        }
    }
}

/// Commit subjects belonging to the upcoming release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct History {
    /// Every tag seen, in the order used for the fallback.
    pub tags: Vec<String>,
    /// Where the range starts.
    pub baseline: Baseline,
    /// Subject lines in `git log` order. May contain empty strings.
    pub subjects: Vec<String>,
}

/// Options for [`collect_history`].
#[derive(Debug, Clone, Default)]
pub struct HistoryOptions {
    /// Ordering used to pick the fallback tag.
    pub order: TagOrder,
    /// Prefix also accepted on a matching tag (e.g. `v` for `v1.2.3`).
    pub tag_prefix: Option<String>,
}

/// Collect the commit subjects since the release recorded as `current`.
///
/// Any source-control failure is returned as-is; callers decide whether to
/// substitute [`PLACEHOLDER_SUBJECT`] or abort.
#[instrument(skip(scm, options), fields(%current))]
pub fn collect_history<S: SourceControl + ?Sized>(
    scm: &S,
    current: &Version,
    options: &HistoryOptions,
) -> GitResult<History> {
    let tags = scm.list_tags(options.order)?;
    debug!(?tags, "tags");

    let Some(tag) = pick_baseline_tag(&tags, current, options) else {
        info!("no tags found, using full history");
        let subjects = scm.subjects_since(None)?;
        return Ok(History {
            tags,
            baseline: Baseline::FullHistory,
            subjects,
        });
    };

    let (name, matched) = tag;
    let commit = scm.resolve_commit(&name)?;
    if matched {
        info!(tag = %name, %commit, "found tag for recorded version");
    } else {
        info!(tag = %name, %commit, "no tag for recorded version, using latest tag");
    }

    let subjects = scm.subjects_since(Some(&commit))?;
    Ok(History {
        tags,
        baseline: Baseline::Tag {
            name,
            commit,
            matched,
        },
        subjects,
    })
}

/// Choose the tag to start from: an exact match for `current`, then a
/// prefixed match, then the last tag listed. `None` when there are no tags.
fn pick_baseline_tag(
    tags: &[String],
    current: &Version,
    options: &HistoryOptions,
) -> Option<(String, bool)> {
    let plain = current.to_string();
    let prefixed = options
        .tag_prefix
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|p| format!("{p}{plain}"));

    let matched = std::iter::once(plain)
        .chain(prefixed)
        .find(|candidate| tags.contains(candidate));

    matched
        .map(|name| (name, true))
        .or_else(|| tags.last().map(|name| (name.clone(), false)))
}


#[cfg(test)]
mod tests {
    use super::fake::FakeScm;
    use super::*;

    fn opts() -> HistoryOptions {
        HistoryOptions {
            order: TagOrder::Created,
            tag_prefix: Some("v".into()),
        }
    }

    #[test]
    fn no_tags_uses_full_history_in_log_order() {
        let scm = FakeScm::with_history(&["fix bug", "add feature", ""]);
        let history = collect_history(&scm, &Version::new(0, 0, 0), &opts()).unwrap();

        assert_eq!(history.baseline, Baseline::FullHistory);
        assert_eq!(history.subjects, vec!["fix bug", "add feature", ""]);
        assert!(history.tags.is_empty());
    }

    #[test]
    fn matching_tag_is_the_baseline() {
        let scm = FakeScm::default()
            .tagged("0.9.0", "aaa", &["old", "improve perf"])
            .tagged("1.0.0", "bbb", &["improve perf"]);
        let history = collect_history(&scm, &Version::new(1, 0, 0), &opts()).unwrap();

        assert_eq!(
            history.baseline,
            Baseline::Tag {
                name: "1.0.0".into(),
                commit: "bbb".into(),
                matched: true,
            }
        );
        assert_eq!(history.subjects, vec!["improve perf"]);
    }

    #[test]
    fn prefixed_tag_matches_recorded_version() {
        let scm = FakeScm::default()
            .tagged("v1.0.0", "aaa", &["one"])
            .tagged("v1.1.0", "bbb", &["two"]);
        let history = collect_history(&scm, &Version::new(1, 0, 0), &opts()).unwrap();

        assert!(matches!(
            history.baseline,
            Baseline::Tag { ref name, matched: true, .. } if name == "v1.0.0"
        ));
        assert_eq!(history.subjects, vec!["one"]);
    }

    #[test]
    fn exact_tag_wins_over_prefixed() {
        let scm = FakeScm::default()
            .tagged("1.0.0", "aaa", &["exact"])
            .tagged("v1.0.0", "bbb", &["prefixed"]);
        let history = collect_history(&scm, &Version::new(1, 0, 0), &opts()).unwrap();
        assert_eq!(history.subjects, vec!["exact"]);
    }

    #[test]
    fn prefix_ignored_when_unset() {
        let scm = FakeScm::default()
            .tagged("v1.0.0", "aaa", &["one"])
            .tagged("v2.0.0", "bbb", &["two"]);
        let options = HistoryOptions {
            tag_prefix: None,
            ..opts()
        };
        let history = collect_history(&scm, &Version::new(1, 0, 0), &options).unwrap();
        assert!(matches!(
            history.baseline,
            Baseline::Tag { ref name, matched: false, .. } if name == "v2.0.0"
        ));
    }

    #[test]
    fn falls_back_to_last_listed_tag() {
        let scm = FakeScm::default()
            .tagged("0.1.0", "aaa", &["a", "b"])
            .tagged("0.2.0", "bbb", &["b"]);
        let history = collect_history(&scm, &Version::new(0, 0, 0), &opts()).unwrap();

        assert_eq!(
            history.baseline,
            Baseline::Tag {
                name: "0.2.0".into(),
                commit: "bbb".into(),
                matched: false,
            }
        );
        assert_eq!(history.subjects, vec!["b"]);
    }

    #[test]
    fn requested_order_reaches_source_control() {
        let scm = FakeScm::with_history(&[]);
        let options = HistoryOptions {
            order: TagOrder::Semver,
            tag_prefix: None,
        };
        collect_history(&scm, &Version::new(0, 0, 0), &options).unwrap();
        assert_eq!(*scm.requested_order.borrow(), Some(TagOrder::Semver));
    }

    #[test]
    fn tag_listing_failure_propagates() {
        let scm = FakeScm {
            fail: true,
            ..FakeScm::default()
        };
        let result = collect_history(&scm, &Version::new(1, 0, 0), &opts());
        assert!(result.is_err());
    }

    #[test]
    fn unresolvable_tag_propagates() {
        let mut scm = FakeScm::default();
        scm.tags.push("broken".into());
        let result = collect_history(&scm, &Version::new(1, 0, 0), &opts());
        assert!(result.is_err());
    }

    #[test]
    fn baseline_display() {
        assert_eq!(Baseline::FullHistory.to_string(), "full history");
        let tag = Baseline::Tag {
            name: "1.0.0".into(),
            commit: "abc".into(),
            matched: false,
        };
        assert_eq!(tag.to_string(), "tag 1.0.0 (latest)");
    }

    #[test]
    fn tag_order_defaults_to_created() {
        assert_eq!(TagOrder::default(), TagOrder::Created);
        assert_eq!(FailurePolicy::default(), FailurePolicy::Placeholder);
    }

    #[test]
    fn history_against_real_git() {
        let Some(repo) = crate::git::testing::TempRepo::init() else {
            return;
        };
        repo.commit("initial");
        repo.tag("1.0.0");
        repo.commit("improve perf");

        let git = crate::git::GitCli::new(repo.path.clone());
        let history = collect_history(&git, &Version::new(1, 0, 0), &opts()).unwrap();
        assert_eq!(history.subjects, vec!["improve perf"]);
    }
}
