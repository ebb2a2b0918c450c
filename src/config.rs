//! Configuration file management
//!
//! Reads the project's `extbuild.toml` and the optional user-level
//! `~/.config/extbuild/config.toml`, which may only supply `[tools]` defaults.
//!
//! ```toml
//! package_root = "src"
//! build_dir = "build/extbuild"
//! stub_dir = "typings"
//! mode = "release"
//!
//! [tools]
//! cmake = "/usr/bin/cmake"
//! stubgen_args = ["--ignore-all-errors"]
//!
//! [[target]]
//! name = "aimbot.xwayland_capture"
//! source_dir = "cpp"
//! ```

use crate::extensions::types::{BuildMode, BuildTarget};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default parent of the per-target workspaces, relative to the project root
pub const DEFAULT_BUILD_DIR: &str = "build/extbuild";

/// Default stub output root, relative to the project root
pub const DEFAULT_STUB_DIR: &str = "typings";

/// Problems with the contents of an otherwise readable config
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No extbuild.toml or .extbuild.toml found in {}", dir.display())]
    NotFound { dir: PathBuf },

    #[error("No [[target]] entries in {}", path.display())]
    NoTargets { path: PathBuf },

    #[error("Invalid target name `{name}`: expected a dotted identifier like `pkg.module`")]
    InvalidName { name: String },

    #[error("Invalid module path `{module}` for target {target}")]
    InvalidModule { target: String, module: String },

    #[error("Target `{name}` is defined more than once")]
    DuplicateTarget { name: String },

    #[error("Unknown target `{name}` (available: {available})")]
    UnknownTarget { name: String, available: String },

    #[error("`jobs` must be at least 1")]
    ZeroJobs,
}

/// Tool locations, from the project or the user config
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    /// `cmake` executable
    pub cmake: Option<PathBuf>,
    /// Interpreter passed as `PYTHON_EXECUTABLE`
    pub python: Option<PathBuf>,
    /// Stub generation tool
    pub stubgen: Option<String>,
    /// Extra arguments for the stub tool
    pub stubgen_args: Option<Vec<String>>,
}

impl ToolsConfig {
    /// Fill unset values from `fallback`
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            cmake: self.cmake.or(fallback.cmake),
            python: self.python.or(fallback.python),
            stubgen: self.stubgen.or(fallback.stubgen),
            stubgen_args: self.stubgen_args.or(fallback.stubgen_args),
        }
    }
}

/// One `[[target]]` entry
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Identifier and workspace directory name
    pub name: String,
    /// CMake source tree
    pub source_dir: PathBuf,
    /// Dotted module path, defaults to `name`
    pub module: Option<String>,
    /// Overrides the top-level `mode`
    pub mode: Option<BuildMode>,
    /// Extra directory names to skip while fingerprinting
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default = "default_true")]
    pub stubs: bool,
}

const fn default_true() -> bool {
    true
}

/// Project configuration loaded from `extbuild.toml`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Import root holding the package tree (defaults to the project root)
    pub package_root: Option<PathBuf>,
    pub build_dir: Option<PathBuf>,
    pub stub_dir: Option<PathBuf>,
    /// Default build mode for all targets
    pub mode: Option<BuildMode>,
    /// Parallel compile jobs, defaults to the logical CPU count
    pub jobs: Option<usize>,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default, rename = "target")]
    pub targets: Vec<TargetConfig>,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub root: PathBuf,
}

impl Config {
    /// Load configuration, merged with the user config's `[tools]`.
    /// Priority: `custom_path` -> `EXTBUILD_CONFIG` -> ./extbuild.toml -> ./.extbuild.toml
    ///
    /// # Errors
    ///
    /// Returns an error if no config is found or a file fails to read, parse or
    /// validate.
    pub fn load(custom_path: Option<&Path>) -> Result<Self> {
        let path = match custom_path {
            Some(path) => path.to_path_buf(),
            None => crate::paths::find_config().ok_or_else(|| ConfigError::NotFound {
                dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            })?,
        };

        let mut config = Self::load_from(&path)?;

        if let Some(user_config) = Self::user_config_dir().map(|dir| dir.join("config.toml"))
            && user_config.is_file()
        {
            let user_tools = Self::load_user_tools(&user_config)?;
            config.tools = config.tools.or(user_tools);
        }

        Ok(config)
    }

    /// Load and validate a project config file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        // Paths handed to cmake are used from inside the workspace
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let root = std::path::absolute(parent)
            .with_context(|| format!("Failed to resolve {}", parent.display()))?;

        let config = Self::parse(&contents, root)
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        if config.targets.is_empty() {
            return Err(ConfigError::NoTargets {
                path: path.to_path_buf(),
            }
            .into());
        }
        Ok(config)
    }

    /// Parse and validate config text rooted at `root`
    ///
    /// # Errors
    ///
    /// Returns an error on malformed TOML, invalid names, duplicates or `jobs = 0`.
    pub fn parse(contents: &str, root: PathBuf) -> Result<Self> {
        let mut config: Self = toml::from_str(contents)?;
        config.root = root;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == Some(0) {
            return Err(ConfigError::ZeroJobs);
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if !is_dotted_identifier(&target.name) {
                return Err(ConfigError::InvalidName {
                    name: target.name.clone(),
                });
            }
            if let Some(module) = &target.module
                && !is_dotted_identifier(module)
            {
                return Err(ConfigError::InvalidModule {
                    target: target.name.clone(),
                    module: module.clone(),
                });
            }
            if !seen.insert(target.name.as_str()) {
                return Err(ConfigError::DuplicateTarget {
                    name: target.name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Read the `[tools]` table of a user config, ignoring other keys
    fn load_user_tools(path: &Path) -> Result<ToolsConfig> {
        #[derive(Deserialize)]
        struct UserConfig {
            #[serde(default)]
            tools: ToolsConfig,
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read user config: {}", path.display()))?;
        let user: UserConfig = toml::from_str(&contents)
            .with_context(|| format!("Invalid user config: {}", path.display()))?;
        Ok(user.tools)
    }

    fn user_config_dir() -> Option<PathBuf> {
        // Check XDG_CONFIG_HOME first
        if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg_config).join("extbuild"));
        }

        // Fall back to ~/.config/extbuild
        dirs::home_dir().map(|home| home.join(".config").join("extbuild"))
    }

    /// Resolve a configured path against the project root
    #[must_use]
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    #[must_use]
    pub fn package_root(&self) -> PathBuf {
        self.package_root
            .as_deref()
            .map_or_else(|| self.root.clone(), |p| self.resolve_path(p))
    }

    #[must_use]
    pub fn build_dir(&self) -> PathBuf {
        self.resolve_path(
            self.build_dir
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_BUILD_DIR)),
        )
    }

    #[must_use]
    pub fn stub_dir(&self) -> PathBuf {
        self.resolve_path(
            self.stub_dir
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_STUB_DIR)),
        )
    }

    /// Configured tool path; bare names like `cmake3` are kept for a PATH lookup
    #[must_use]
    pub fn tool_path(&self, path: &Path) -> PathBuf {
        if path.components().count() == 1 {
            path.to_path_buf()
        } else {
            self.resolve_path(path)
        }
    }

    /// Build targets in declaration order, optionally restricted to `selected`
    ///
    /// `mode_override` (the `--mode` flag) beats per-target and top-level modes.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownTarget` if a selected name isn't configured.
    pub fn targets(
        &self,
        mode_override: Option<BuildMode>,
        selected: &[String],
    ) -> Result<Vec<BuildTarget>, ConfigError> {
        if let Some(unknown) = selected
            .iter()
            .find(|name| !self.targets.iter().any(|t| &t.name == *name))
        {
            return Err(ConfigError::UnknownTarget {
                name: unknown.clone(),
                available: self
                    .targets
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        Ok(self
            .targets
            .iter()
            .filter(|t| selected.is_empty() || selected.contains(&t.name))
            .map(|t| BuildTarget {
                name: t.name.clone(),
                source_dir: self.resolve_path(&t.source_dir),
                module: t.module.clone().unwrap_or_else(|| t.name.clone()),
                mode: mode_override.or(t.mode).or(self.mode).unwrap_or_default(),
                exclude: t.exclude.clone(),
                stubs: t.stubs,
            })
            .collect())
    }
}

/// `pkg.sub.module`: non-empty segments of letters, digits and `_`, not
/// starting with a digit
#[must_use]
pub fn is_dotted_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
