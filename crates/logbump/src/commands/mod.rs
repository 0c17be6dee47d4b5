//! Command implementations

pub mod current;

pub mod doctor;

pub mod info;

pub mod update;

use camino::{Utf8Path, Utf8PathBuf};
use logbump_core::config::Config;

/// The changelog a command works on: `--changelog` if given, else the
/// configured path, relative to `cwd`.
pub fn changelog_path(config: &Config, cwd: &Utf8Path, flag: Option<&Utf8Path>) -> Utf8PathBuf {
    flag.map_or_else(
        || cwd.join(config.changelog_path()),
        |path| cwd.join(path),
    )
}
