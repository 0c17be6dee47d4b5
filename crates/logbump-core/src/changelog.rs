//! Reading and writing the changelog file.
//!
//! The file is treated as opaque text with one recognized marker: the first
//! `## [X.Y.Z]` heading names the latest release. New entries are rendered
//! in the Keep a Changelog style and prepended to whatever is already there.

use std::fs;
use std::io::{self, Write};
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use regex::Regex;
use semver::Version;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::version::{VersionError, from_components, initial_version};

/// Default subsection label for new entries.
pub const DEFAULT_SECTION: &str = "Added";

/// Matches a release heading such as `## [1.2.3]`.
static VERSION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"## \[(\d+)\.(\d+)\.(\d+)\]").expect("Invalid version marker regex")
});

/// Errors from changelog file operations.
#[derive(Error, Debug)]
pub enum ChangelogError {
    /// The changelog exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Changelog path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The first release heading names a version logbump cannot represent.
    #[error("unusable release heading in {path}: {source}")]
    Marker {
        /// Changelog path.
        path: Utf8PathBuf,
        /// Why the version was rejected.
        source: VersionError,
    },

    /// The new content could not be written to a temporary file.
    #[error("failed to write changelog next to {path}: {source}")]
    Write {
        /// Changelog path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The temporary file could not be moved over the changelog.
    #[error("failed to replace {path}: {source}")]
    Persist {
        /// Changelog path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Result alias for changelog operations.
pub type ChangelogResult<T> = Result<T, ChangelogError>;

/// Where a [`RecordedVersion`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionSource {
    /// Parsed from a `## [X.Y.Z]` heading.
    Marker,
    /// The file exists but has no release heading.
    NoMarker,
    /// The file does not exist yet.
    MissingFile,
}

/// The latest version recorded in the changelog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedVersion {
    /// The version (`0.0.0` unless a marker was found).
    pub version: Version,
    /// How the version was determined.
    pub source: VersionSource,
}

/// Read the latest recorded version from the changelog at `path`.
///
/// A missing file or a file without a release heading yields `0.0.0`.
/// I/O failures and a heading whose numbers do not fit in 64 bits are errors.
#[instrument]
pub fn read_recorded_version(path: &Utf8Path) -> ChangelogResult<RecordedVersion> {
    let Some(content) = read_existing(path)? else {
        info!(%path, "changelog not found, a new one will be created");
        return Ok(RecordedVersion {
            version: initial_version(),
            source: VersionSource::MissingFile,
        });
    };

    let marker = find_version_marker(&content).map_err(|source| ChangelogError::Marker {
        path: path.to_path_buf(),
        source,
    })?;
    let recorded = marker.map_or_else(
        || RecordedVersion {
            version: initial_version(),
            source: VersionSource::NoMarker,
        },
        |version| RecordedVersion {
            version,
            source: VersionSource::Marker,
        },
    );
    debug!(version = %recorded.version, source = ?recorded.source, "recorded version");
    Ok(recorded)
}

/// Find the version in the first `## [X.Y.Z]` heading of `content`.
///
/// `Ok(None)` when there is no such heading.
pub fn find_version_marker(content: &str) -> Result<Option<Version>, VersionError> {
    let Some(caps) = VERSION_MARKER.captures(content) else {
        return Ok(None);
    };
    from_components(&caps[1], &caps[2], &caps[3])
        .map(Some)
        .inspect_err(|e| warn!(marker = &caps[0], %e, "release heading out of range"))
}

/// One release entry, ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangelogEntry {
    /// Version in the heading.
    pub version: Version,
    /// Release date in the heading.
    pub date: NaiveDate,
    /// Subsection label (normally `Added`).
    pub section: String,
    /// Change descriptions in commit order. Blank ones are skipped on render.
    pub changes: Vec<String>,
}

impl ChangelogEntry {
    /// Build an entry under the default `Added` section.
    pub fn new(version: Version, date: NaiveDate, changes: Vec<String>) -> Self {
        Self {
            version,
            date,
            section: DEFAULT_SECTION.to_string(),
            changes,
        }
    }

    /// Changes that will actually become bullets.
    pub fn bullets(&self) -> impl Iterator<Item = &str> {
        self.changes
            .iter()
            .map(String::as_str)
            .filter(|change| !change.trim().is_empty())
    }

    /// Render the entry as Markdown, including the trailing blank line that
    /// separates it from the previous entry.
    pub fn render(&self) -> String {
        let bullets: Vec<String> = self.bullets().map(|c| format!("- {c}")).collect();
        format!(
            "## [{version}] - {date}\n\n### {section}\n{bullets}\n\n",
            version = self.version,
            date = self.date.format("%Y-%m-%d"),
            section = self.section,
            bullets = bullets.join("\n"),
        )
    }
}

/// Prepend `entry` to the changelog at `path`, creating the file if needed.
///
/// The new content is written to a temporary file in the same directory and
/// renamed over `path`, so readers never observe a partial file. Returns
/// `true` when the file was newly created.
#[instrument(skip(entry), fields(entry_len = entry.len()))]
pub fn prepend_entry(path: &Utf8Path, entry: &str) -> ChangelogResult<bool> {
    let existing = read_existing(path)?;
    let created = existing.is_none();

    let write_err = |source| ChangelogError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = parent_dir(path);
    let mut tmp = tempfile::NamedTempFile::new_in(dir.as_std_path()).map_err(write_err)?;
    tmp.write_all(entry.as_bytes()).map_err(write_err)?;
    if let Some(ref content) = existing {
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;
    match_permissions(path, tmp.path(), created).map_err(write_err)?;

    tmp.persist(path.as_std_path())
        .map_err(|e| ChangelogError::Persist {
            path: path.to_path_buf(),
            source: e.error,
        })?;

    info!(%path, created, "changelog written");
    Ok(created)
}

/// Read the file, mapping "not found" to `None`.
fn read_existing(path: &Utf8Path) -> ChangelogResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ChangelogError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Directory holding `path`; `.` for bare file names.
fn parent_dir(path: &Utf8Path) -> &Utf8Path {
    match path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir,
        _ => Utf8Path::new("."),
    }
}

/// Give the temporary file the permissions the changelog has (or would get).
///
/// Temporary files are created owner-only.
fn match_permissions(path: &Utf8Path, tmp: &std::path::Path, created: bool) -> io::Result<()> {
    if !created {
        let perms = fs::metadata(path)?.permissions();
        return fs::set_permissions(tmp, perms);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp, fs::Permissions::from_mode(0o644))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    fn changelog_in(tmp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(tmp.path().join("CHANGELOG.md")).unwrap()
    }

    #[test]
    fn marker_found() {
        let content = "# Changelog\n\n## [1.2.3] - 2024-01-01\n\n### Added\n- thing\n";
        assert_eq!(find_version_marker(content).unwrap(), Some(Version::new(1, 2, 3)));
    }

    #[test]
    fn first_marker_wins() {
        let content = "## [2.0.1] - 2024-02-01\n\n## [2.0.0] - 2024-01-01\n";
        assert_eq!(find_version_marker(content).unwrap(), Some(Version::new(2, 0, 1)));
    }

    #[test]
    fn malformed_marker_is_skipped() {
        assert_eq!(find_version_marker("## [1.2] - 2024-01-01\n").unwrap(), None);
        assert_eq!(find_version_marker("## [Unreleased]\n").unwrap(), None);
        assert_eq!(find_version_marker("## 1.2.3\n").unwrap(), None);
    }

    #[test]
    fn leading_zero_marker_is_read_as_integers() {
        assert_eq!(
            find_version_marker("## [01.2.3] - 2024-01-01\n").unwrap(),
            Some(Version::new(1, 2, 3))
        );
        assert_eq!(
            find_version_marker("## [1.02.007]\n").unwrap(),
            Some(Version::new(1, 2, 7))
        );
    }

    #[test]
    fn oversized_marker_is_an_error_not_zero() {
        let tmp = TempDir::new().unwrap();
        let path = changelog_in(&tmp);
        fs::write(&path, "## [1.2.99999999999999999999999] - 2024-01-01\n").unwrap();

        assert!(matches!(
            read_recorded_version(&path),
            Err(ChangelogError::Marker { .. })
        ));
    }

    #[test]
    fn reads_version_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = changelog_in(&tmp);
        fs::write(&path, "## [1.2.3] - 2024-01-01\n...").unwrap();

        let recorded = read_recorded_version(&path).unwrap();
        assert_eq!(recorded.version.to_string(), "1.2.3");
        assert_eq!(recorded.source, VersionSource::Marker);
    }

    #[test]
    fn missing_file_defaults_to_zero() {
        let tmp = TempDir::new().unwrap();
        let recorded = read_recorded_version(&changelog_in(&tmp)).unwrap();
        assert_eq!(recorded.version.to_string(), "0.0.0");
        assert_eq!(recorded.source, VersionSource::MissingFile);
    }

    #[test]
    fn no_marker_defaults_to_zero() {
        let tmp = TempDir::new().unwrap();
        let path = changelog_in(&tmp);
        fs::write(&path, "# Changelog\n\nNothing released yet.\n").unwrap();

        let recorded = read_recorded_version(&path).unwrap();
        assert_eq!(recorded.version.to_string(), "0.0.0");
        assert_eq!(recorded.source, VersionSource::NoMarker);
    }

    #[test]
    fn directory_is_a_read_error() {
        let tmp = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        assert!(matches!(
            read_recorded_version(&path),
            Err(ChangelogError::Read { .. })
        ));
    }

    #[test]
    fn render_entry() {
        let entry = ChangelogEntry::new(
            Version::new(1, 2, 4),
            date(),
            vec!["fix bug".into(), "add feature".into()],
        );
        assert_eq!(
            entry.render(),
            "## [1.2.4] - 2024-03-05\n\n### Added\n- fix bug\n- add feature\n\n"
        );
    }

    #[test]
    fn render_skips_blank_subjects() {
        let entry = ChangelogEntry::new(
            Version::new(0, 0, 1),
            date(),
            vec!["fix bug".into(), "add feature".into(), String::new(), "  ".into()],
        );
        let rendered = entry.render();
        let bullets: Vec<&str> = rendered.lines().filter(|l| l.starts_with("- ")).collect();
        assert_eq!(bullets, vec!["- fix bug", "- add feature"]);
    }

    #[test]
    fn render_keeps_duplicates_and_order() {
        let entry = ChangelogEntry::new(
            Version::new(0, 0, 1),
            date(),
            vec!["b".into(), "a".into(), "b".into()],
        );
        assert!(entry.render().contains("- b\n- a\n- b\n"));
    }

    #[test]
    fn render_empty_has_section_without_bullets() {
        let entry = ChangelogEntry::new(Version::new(0, 0, 1), date(), Vec::new());
        let rendered = entry.render();
        assert_eq!(rendered, "## [0.0.1] - 2024-03-05\n\n### Added\n\n\n");
        assert_eq!(entry.bullets().count(), 0);
    }

    #[test]
    fn render_custom_section() {
        let mut entry = ChangelogEntry::new(Version::new(0, 0, 1), date(), vec!["x".into()]);
        entry.section = "Changed".into();
        assert!(entry.render().contains("### Changed\n- x\n"));
    }

    #[test]
    fn prepend_creates_missing_file() {
        let tmp = TempDir::new().unwrap();
        let path = changelog_in(&tmp);

        let created = prepend_entry(&path, "## [0.0.1] - 2024-03-05\n\n").unwrap();
        assert!(created);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "## [0.0.1] - 2024-03-05\n\n"
        );
    }

    #[test]
    fn prepend_keeps_existing_content() {
        let tmp = TempDir::new().unwrap();
        let path = changelog_in(&tmp);
        fs::write(&path, "## [1.0.0] - 2024-01-01\n\n### Added\n- first\n").unwrap();

        let created = prepend_entry(&path, "## [1.0.1] - 2024-03-05\n\n").unwrap();
        assert!(!created);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "## [1.0.1] - 2024-03-05\n\n## [1.0.0] - 2024-01-01\n\n### Added\n- first\n"
        );
    }

    #[test]
    fn written_entry_becomes_latest() {
        let tmp = TempDir::new().unwrap();
        let path = changelog_in(&tmp);
        fs::write(&path, "## [1.2.3] - 2024-01-01\n").unwrap();

        let entry = ChangelogEntry::new(Version::new(1, 2, 4), date(), vec!["x".into()]);
        prepend_entry(&path, &entry.render()).unwrap();

        let recorded = read_recorded_version(&path).unwrap();
        assert_eq!(recorded.version.to_string(), "1.2.4");
    }

    #[test]
    fn prepend_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let path = changelog_in(&tmp);
        prepend_entry(&path, "entry\n").unwrap();
        prepend_entry(&path, "entry\n").unwrap();

        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["CHANGELOG.md"]);
    }

    #[test]
    fn prepend_into_missing_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().join("nope").join("CHANGELOG.md")).unwrap();
        assert!(matches!(
            prepend_entry(&path, "entry\n"),
            Err(ChangelogError::Write { .. })
        ));
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn prepend_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let path = changelog_in(&tmp);
        fs::write(&path, "old\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        prepend_entry(&path, "new\n").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn parent_dir_of_bare_name() {
        assert_eq!(parent_dir(Utf8Path::new("CHANGELOG.md")), Utf8Path::new("."));
        assert_eq!(
            parent_dir(Utf8Path::new("docs/CHANGELOG.md")),
            Utf8Path::new("docs")
        );
    }
}
