//! Core library for logbump.
//!
//! logbump keeps a `CHANGELOG.md` in step with git: it reads the latest
//! `## [X.Y.Z]` heading, bumps the patch version, collects the commit
//! subjects since the matching tag and prepends a new entry.
//!
//! # Modules
//!
//! - [`changelog`] - Reading the recorded version, rendering and writing entries
//! - [`config`] - Configuration loading and management
//! - [`error`] - Error types and result aliases
//! - [`git`] - Git operations backing [`history::SourceControl`]
//! - [`history`] - Commit history since the last release
//! - [`update`] - Update planning and execution
//! - [`version`] - Version parsing and the patch bump
//!
//! # Quick Start
//!
//! ```no_run
//! use camino::Utf8Path;
//! use logbump_core::{ConfigLoader, GitCli, UpdateOptions, plan_update};
//!
//! let workdir = Utf8Path::new(".");
//! let config = ConfigLoader::new()
//!     .with_project_search(workdir)
//!     .load()
//!     .expect("Failed to load configuration");
//!
//! let options = UpdateOptions::from_config(&config, workdir);
//! let plan = plan_update(&GitCli::new(workdir), &options).expect("planning failed");
//! print!("{}", plan.rendered_entry());
//! ```
#![deny(unsafe_code)]

pub mod changelog;

pub mod config;

pub mod error;

pub mod git;

pub mod history;

pub mod update;

pub mod version;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult};

pub use git::GitCli;

pub use update::{UpdateOptions, UpdatePlan, plan_update};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;

// Re-export chrono for callers that pass an explicit entry date.
pub use chrono;
