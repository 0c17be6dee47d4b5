//! Configuration loading and discovery.
//!
//! Configuration is merged from, lowest precedence first:
//! 1. Built-in defaults
//! 2. User config from the XDG config directory
//! 3. Project config, found by walking up from the working directory
//! 4. Files passed explicitly (`--config`)
//!
//! # Supported formats
//!
//! - TOML (`.toml`)
//! - YAML (`.yaml`, `.yml`)
//! - JSON (`.json`)
//!
//! # Config file locations (in order of precedence, highest first):
//! - `.logbump.<ext>` in current directory or any parent
//! - `logbump.<ext>` in current directory or any parent
//! - `~/.config/logbump/config.<ext>` (user config)
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use logbump_core::config::ConfigLoader;
//!
//! let cwd = std::env::current_dir().unwrap();
//! let cwd = Utf8PathBuf::try_from(cwd).expect("current directory is not valid UTF-8");
//! let config = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! println!("changelog: {}", config.changelog_path());
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::changelog::DEFAULT_SECTION;
use crate::error::{ConfigError, ConfigResult};
use crate::history::{FailurePolicy, TagOrder};

/// Changelog file name used when nothing is configured.
pub const DEFAULT_CHANGELOG: &str = "CHANGELOG.md";

/// Tag prefix accepted when matching the recorded version.
pub const DEFAULT_TAG_PREFIX: &str = "v";

/// The configuration for logbump.
///
/// Deserialized from config files found during discovery (TOML, YAML, or JSON).
/// Every section is optional; the accessor methods supply defaults and CLI
/// flags override them.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Files merged into this configuration, lowest precedence first.
    #[serde(skip)]
    pub sources: Vec<Utf8PathBuf>,
    /// Changelog file settings.
    pub changelog: Option<ChangelogConfig>,
    /// History collection settings.
    pub history: Option<HistoryConfig>,
}

/// Changelog file settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChangelogConfig {
    /// Path to the changelog, relative to the working directory.
    pub path: Option<Utf8PathBuf>,
    /// Subsection label for new entries (default: `Added`).
    pub section: Option<String>,
}

/// History collection settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Which tag to fall back to when none matches the recorded version.
    pub baseline: Option<TagOrder>,
    /// Prefix also accepted on release tags (default: `v`). Empty disables.
    pub tag_prefix: Option<String>,
    /// What to do when git history cannot be read.
    pub on_error: Option<FailurePolicy>,
}

impl Config {
    /// Configured changelog path, or `CHANGELOG.md`.
    pub fn changelog_path(&self) -> Utf8PathBuf {
        self.changelog
            .as_ref()
            .and_then(|c| c.path.clone())
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CHANGELOG))
    }

    /// Configured subsection label, or `Added`.
    pub fn section(&self) -> &str {
        self.changelog
            .as_ref()
            .and_then(|c| c.section.as_deref())
            .unwrap_or(DEFAULT_SECTION)
    }

    /// Configured fallback tag ordering.
    pub fn tag_order(&self) -> TagOrder {
        self.history
            .as_ref()
            .and_then(|h| h.baseline)
            .unwrap_or_default()
    }

    /// Configured tag prefix, or `v`.
    pub fn tag_prefix(&self) -> &str {
        self.history
            .as_ref()
            .and_then(|h| h.tag_prefix.as_deref())
            .unwrap_or(DEFAULT_TAG_PREFIX)
    }

    /// Configured history failure policy.
    pub fn failure_policy(&self) -> FailurePolicy {
        self.history
            .as_ref()
            .and_then(|h| h.on_error)
            .unwrap_or_default()
    }
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "logbump";

/// Builder for loading configuration from multiple sources.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Directory the project config search starts from.
    search_root: Option<Utf8PathBuf>,
    /// Whether `~/.config/logbump/config.<ext>` is consulted.
    user_config: bool,
    /// Parent directories containing this entry end the upward search.
    boundary: Option<String>,
    /// Files added with [`ConfigLoader::with_file`], lowest precedence first.
    explicit: Vec<Utf8PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader with user config enabled and a `.git` search boundary.
    pub fn new() -> Self {
        Self {
            search_root: None,
            user_config: true,
            boundary: Some(".git".to_string()),
            explicit: Vec::new(),
        }
    }

    /// Walk up from `path` looking for `.logbump.<ext>` / `logbump.<ext>`.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Include or skip the user config file.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.user_config = include;
        self
    }

    /// Stop the upward search at a parent directory containing `marker`.
    ///
    /// The starting directory itself never counts as a boundary.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary = Some(marker.into());
        self
    }

    /// Search all the way to the filesystem root.
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary = None;
        self
    }

    /// Add a config file; later files take precedence over earlier ones and
    /// over everything discovered.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit.push(path.as_ref().to_path_buf());
        self
    }

    /// Merge defaults, user config, project config and explicit files.
    ///
    /// The merged files are recorded in [`Config::sources`].
    #[tracing::instrument(skip(self), fields(search_root = ?self.search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        let sources = self.config_files();
        let figment = sources.iter().fold(
            Figment::new().merge(Serialized::defaults(Config::default())),
            |figment, path| {
                tracing::debug!(%path, "merging config file");
                merge_file(figment, path)
            },
        );

        let mut config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        config.sources = sources;
        tracing::info!(
            log_level = config.log_level.as_str(),
            changelog = %config.changelog_path(),
            files = config.sources.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// The files [`ConfigLoader::load`] merges, lowest precedence first.
    pub fn config_files(&self) -> Vec<Utf8PathBuf> {
        let user = self.user_config.then(find_user_config).flatten();
        let project = self
            .search_root
            .as_deref()
            .and_then(|root| self.find_project_config(root));
        user.into_iter()
            .chain(project)
            .chain(self.explicit.iter().cloned())
            .collect()
    }

    /// Closest project config at or above `start`, honoring the boundary.
    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        for dir in start.ancestors() {
            let at_boundary = dir != start
                && self
                    .boundary
                    .as_ref()
                    .is_some_and(|marker| dir.join(marker).exists());
            if at_boundary {
                break;
            }
            if let Some(found) = config_file_in(dir) {
                return Some(found);
            }
        }
        None
    }
}

/// The first config file in `dir`, preferring the dotfile for each extension.
fn config_file_in(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    CONFIG_EXTENSIONS.iter().find_map(|ext| {
        [format!(".{APP_NAME}.{ext}"), format!("{APP_NAME}.{ext}")]
            .into_iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

/// `config.<ext>` in the user config directory.
fn find_user_config() -> Option<Utf8PathBuf> {
    let dir = user_config_dir()?;
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("config.{ext}")))
        .find(|path| path.is_file())
}

/// Merge a config file into the figment, detecting format from extension.
fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
    match path.extension() {
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
        Some("json") => figment.merge(Json::file_exact(path.as_str())),
        _ => figment.merge(Toml::file_exact(path.as_str())),
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// The user config directory (`~/.config/logbump/` on Linux).
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf()).ok()
}

/// The machine-local data directory (`~/.local/share/logbump/` on Linux).
pub fn user_data_local_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.data_local_dir().to_path_buf()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(tmp: &TempDir, name: &str, body: &str) -> Utf8PathBuf {
        let path = tmp.path().join(name);
        fs::write(&path, body).unwrap();
        Utf8PathBuf::try_from(path).unwrap()
    }

    fn load_file(path: &Utf8Path) -> Config {
        ConfigLoader::new()
            .with_user_config(false)
            .with_file(path)
            .load()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.log_dir.is_none());
        assert_eq!(config.changelog_path(), "CHANGELOG.md");
        assert_eq!(config.section(), "Added");
        assert_eq!(config.tag_order(), TagOrder::Created);
        assert_eq!(config.tag_prefix(), "v");
        assert_eq!(config.failure_policy(), FailurePolicy::Placeholder);
    }

    #[test]
    fn test_loader_builds_with_defaults() {
        let loader = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker();

        // Should succeed with defaults even if no files found
        let config = loader.load().unwrap();
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_single_file_overrides_default() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            "config.toml",
            r#"log_level = "debug"
log_dir = "/tmp/logbump"
"#,
        );

        let config = load_file(&path);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(
            config.log_dir.as_ref().map(|dir| dir.as_str()),
            Some("/tmp/logbump")
        );
    }

    #[test]
    fn test_later_file_overrides_earlier() {
        let tmp = TempDir::new().unwrap();
        let base = write_config(&tmp, "base.toml", r#"log_level = "warn""#);
        let over = write_config(&tmp, "override.toml", r#"log_level = "error""#);

        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_file(&base)
            .with_file(&over)
            .load()
            .unwrap();

        // Later file wins
        assert_eq!(config.log_level, LogLevel::Error);
    }

    #[test]
    fn test_project_config_discovery() {
        let tmp = TempDir::new().unwrap();
        let project_dir = tmp.path().join("project");
        let sub_dir = project_dir.join("src").join("deep");
        fs::create_dir_all(&sub_dir).unwrap();
        fs::write(project_dir.join(".logbump.toml"), r#"log_level = "debug""#).unwrap();

        let sub_dir = Utf8PathBuf::try_from(sub_dir).unwrap();
        let config = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .with_project_search(&sub_dir)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_boundary_marker_stops_search() {
        let tmp = TempDir::new().unwrap();

        // /parent/.logbump.toml, /parent/child/.git/, /parent/child/work/
        let parent = tmp.path().join("parent");
        let child = parent.join("child");
        let work = child.join("work");
        fs::create_dir_all(&work).unwrap();
        fs::write(parent.join(".logbump.toml"), r#"log_level = "warn""#).unwrap();
        fs::create_dir(child.join(".git")).unwrap();

        let work = Utf8PathBuf::try_from(work).unwrap();
        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_boundary_marker(".git")
            .with_project_search(&work)
            .load()
            .unwrap();

        // Config beyond the boundary is ignored
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_explicit_file_overrides_project_config() {
        let tmp = TempDir::new().unwrap();
        let project = write_config(&tmp, ".logbump.toml", r#"log_level = "warn""#);
        let over = write_config(&tmp, "override.toml", r#"log_level = "error""#);
        let tmp_path = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        let config = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .with_project_search(&tmp_path)
            .with_file(&over)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Error);
        assert_eq!(config.sources, [project, over]);
    }

    #[test]
    fn test_dotfile_preferred_over_regular_name() {
        let tmp = TempDir::new().unwrap();
        write_config(&tmp, ".logbump.toml", r#"log_level = "debug""#);
        write_config(&tmp, "logbump.toml", r#"log_level = "error""#);
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        let files = ConfigLoader::new()
            .with_user_config(false)
            .with_project_search(&dir)
            .config_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name(), Some(".logbump.toml"));
    }

    #[test]
    fn test_user_config_dir() {
        if let Some(path) = user_config_dir() {
            assert!(path.as_str().contains("logbump"));
        }
    }

    #[test]
    fn test_changelog_section() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            "config.toml",
            r#"
[changelog]
path = "docs/CHANGES.md"
section = "Changed"
"#,
        );

        let config = load_file(&path);
        assert_eq!(config.changelog_path(), "docs/CHANGES.md");
        assert_eq!(config.section(), "Changed");
    }

    #[test]
    fn test_history_section() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            "config.toml",
            r#"
[history]
baseline = "listing"
tag_prefix = "release-"
on_error = "abort"
"#,
        );

        let config = load_file(&path);
        assert_eq!(config.tag_order(), TagOrder::Listing);
        assert_eq!(config.tag_prefix(), "release-");
        assert_eq!(config.failure_policy(), FailurePolicy::Abort);
    }

    #[test]
    fn test_yaml_config() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            "config.yaml",
            "history:\n  baseline: semver\nchangelog:\n  path: HISTORY.md\n",
        );

        let config = load_file(&path);
        assert_eq!(config.tag_order(), TagOrder::Semver);
        assert_eq!(config.changelog_path(), "HISTORY.md");
    }

    #[test]
    fn test_json_config() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            "config.json",
            r#"{"log_level": "warn", "history": {"on_error": "abort"}}"#,
        );

        let config = load_file(&path);
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.failure_policy(), FailurePolicy::Abort);
    }

    #[test]
    fn test_invalid_baseline_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "config.toml", "[history]\nbaseline = \"newest\"\n");

        let result = ConfigLoader::new()
            .with_user_config(false)
            .with_file(&path)
            .load();
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn test_default_config_has_no_sections() {
        let config = Config::default();
        assert!(config.changelog.is_none());
        assert!(config.history.is_none());
    }
}
