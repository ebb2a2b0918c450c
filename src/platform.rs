//! Host platform detection
//!
//! Describes the machine extbuild runs on in the terms the CMake parameter
//! resolver cares about: operating system family, pointer width and the number
//! of logical CPUs available for parallel compilation.

use std::env;
use std::sync::LazyLock;

/// Cached host detection (computed once, reused throughout execution)
static CURRENT_HOST: LazyLock<HostPlatform> = LazyLock::new(detect_host_impl);

/// Operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Windows,
    MacOs,
    Linux,
    /// Any other Unix-like system (BSDs, ...)
    OtherUnix,
}

impl HostOs {
    /// Map a `std::env::consts::OS` value to a family
    #[must_use]
    pub fn from_os_str(os: &str) -> Self {
        match os {
            "windows" => Self::Windows,
            "macos" => Self::MacOs,
            "linux" => Self::Linux,
            _ => Self::OtherUnix,
        }
    }

    /// Visual Studio generators are multi-config and take the configuration at
    /// build time rather than configure time
    #[must_use]
    #[inline]
    pub const fn uses_multi_config_generator(self) -> bool {
        matches!(self, Self::Windows)
    }
}

/// Host description consumed by the parameter resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: HostOs,
    /// Pointer width is 64 bits
    pub is_64bit: bool,
    /// Logical CPUs (always at least 1)
    pub logical_cpus: usize,
}

impl HostPlatform {
    #[must_use]
    pub fn new(os: HostOs, is_64bit: bool, logical_cpus: usize) -> Self {
        Self {
            os,
            is_64bit,
            logical_cpus: logical_cpus.max(1),
        }
    }

    /// Same host with a different CPU budget (`--jobs` override)
    #[must_use]
    pub fn with_jobs(self, jobs: usize) -> Self {
        Self::new(self.os, self.is_64bit, jobs)
    }
}

/// Detect the current host
///
/// Uses a cached result: detection runs once on first call.
#[must_use]
pub fn detect_host_platform() -> HostPlatform {
    *CURRENT_HOST
}

fn detect_host_impl() -> HostPlatform {
    let cpus = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    HostPlatform::new(
        HostOs::from_os_str(env::consts::OS),
        cfg!(target_pointer_width = "64"),
        cpus,
    )
}
