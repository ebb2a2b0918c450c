//! Path utilities for config file detection.

use crate::env_vars;
use std::path::{Path, PathBuf};

/// Project config file name
pub const CONFIG_FILE: &str = "extbuild.toml";

/// Hidden alternative to [`CONFIG_FILE`]
pub const HIDDEN_CONFIG_FILE: &str = ".extbuild.toml";

/// Find the project config for the current directory.
/// Priority: `EXTBUILD_CONFIG` env var -> extbuild.toml -> .extbuild.toml.
#[must_use]
pub fn find_config() -> Option<PathBuf> {
    if let Some(config) = env_vars::extbuild_config() {
        return Some(PathBuf::from(config));
    }

    find_config_in(".")
}

/// Find the project config in `dir`, checking extbuild.toml first.
#[must_use]
pub fn find_config_in(dir: impl AsRef<Path>) -> Option<PathBuf> {
    let dir = dir.as_ref();

    [CONFIG_FILE, HIDDEN_CONFIG_FILE]
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}
