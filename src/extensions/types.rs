//! Extension type definitions
//!
//! A native extension is a CMake project whose shared library is imported from
//! a Python package. This module defines the build target, the orchestration
//! states it moves through, and the result of one target's run.

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Build configuration requested for a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Unoptimized build with debug info
    Debug,
    /// Optimized build (default)
    #[default]
    Release,
}

impl BuildMode {
    /// CMake configuration name (`Debug` / `Release`)
    #[must_use]
    #[inline]
    pub const fn config_name(self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::Release => "Release",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

/// A native component to configure, compile and place
///
/// Created once per invocation from configuration and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    /// Identifier, also the name of the target's workspace directory
    pub name: String,
    /// Root of the CMake source tree (contains `CMakeLists.txt`)
    pub source_dir: PathBuf,
    /// Package-qualified module path, e.g. `aimbot.xwayland_capture`
    pub module: String,
    /// Debug or release build
    pub mode: BuildMode,
    /// Extra directory names skipped while fingerprinting
    pub exclude: Vec<String>,
    /// Regenerate type stubs after a successful build
    pub stubs: bool,
}

impl BuildTarget {
    /// Create a target whose identifier is its module path
    #[must_use]
    pub fn new(module: impl Into<String>, source_dir: impl Into<PathBuf>, mode: BuildMode) -> Self {
        let module = module.into();
        Self {
            name: module.clone(),
            source_dir: source_dir.into(),
            module,
            mode,
            exclude: Vec::new(),
            stubs: true,
        }
    }
}

/// Orchestration state of a single target
///
/// ```text
/// Checking -> UpToDate
///          -> Building -> BuildFailed
///                      -> Placing -> Stubbing -> Caching -> Done
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Checking,
    UpToDate,
    Building,
    BuildFailed,
    Placing,
    Stubbing,
    Caching,
    Done,
}

impl BuildState {
    /// Whether no further transition can happen from this state
    #[must_use]
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::UpToDate | Self::BuildFailed | Self::Done)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::UpToDate => "up-to-date",
            Self::Building => "building",
            Self::BuildFailed => "build-failed",
            Self::Placing => "placing",
            Self::Stubbing => "stubbing",
            Self::Caching => "caching",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal errors for a single target
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{tool} executable not found. {hint}")]
    ToolchainNotFound { tool: String, hint: String },

    #[error("CMake configuration failed for {target} ({status}){output}")]
    Configure {
        target: String,
        status: String,
        output: String,
    },

    #[error("CMake build failed for {target} ({status}){output}")]
    Compile {
        target: String,
        status: String,
        output: String,
    },

    #[error("Failed to run {program} for {target}: {source}")]
    Spawn {
        target: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Wrap an IO error with path context for use in `map_err`
    pub fn wrap_io(path: impl Into<PathBuf>) -> impl Fn(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io {
            path: path.clone(),
            source,
        }
    }

    /// Whether the error comes from the environment rather than the sources
    #[must_use]
    pub const fn is_environment(&self) -> bool {
        matches!(self, Self::ToolchainNotFound { .. })
    }
}

/// Result of running one target through the orchestrator
#[derive(Debug)]
pub struct TargetReport {
    /// Target identifier
    pub target: String,

    /// Terminal state reached
    pub state: BuildState,

    /// Wall time spent on the target
    pub duration: Duration,

    /// Non-fatal problems (stub failures, missing artifact after build)
    pub warnings: Vec<String>,

    /// Fatal error if the build failed
    pub error: Option<BuildError>,

    /// States visited, in order
    pub trace: Vec<BuildState>,
}

impl TargetReport {
    /// Target was already up to date
    #[must_use]
    pub const fn up_to_date(target: String, duration: Duration) -> Self {
        Self {
            target,
            state: BuildState::UpToDate,
            duration,
            warnings: Vec::new(),
            error: None,
            trace: Vec::new(),
        }
    }

    /// Target was rebuilt
    #[must_use]
    pub const fn built(target: String, duration: Duration, warnings: Vec<String>) -> Self {
        Self {
            target,
            state: BuildState::Done,
            duration,
            warnings,
            error: None,
            trace: Vec::new(),
        }
    }

    /// Target build failed
    #[must_use]
    pub const fn failed(target: String, duration: Duration, error: BuildError) -> Self {
        Self {
            target,
            state: BuildState::BuildFailed,
            duration,
            warnings: Vec::new(),
            error: Some(error),
            trace: Vec::new(),
        }
    }

    #[must_use]
    #[inline]
    pub const fn success(&self) -> bool {
        self.error.is_none()
    }
}
