//! CMake parameter resolution
//!
//! Turns (host platform, build mode) into the argument lists for the configure
//! and build phases. Nothing here spawns a process.
//!
//! Windows (Visual Studio generator, multi-config):
//! ```bash
//! cmake <src> -DCMAKE_LIBRARY_OUTPUT_DIRECTORY=<dest> \
//!             -DCMAKE_LIBRARY_OUTPUT_DIRECTORY_RELEASE=<dest> -A x64
//! cmake --build . --config Release -- /m
//! ```
//!
//! Linux/macOS (Makefile generator, single-config):
//! ```bash
//! cmake <src> -DCMAKE_LIBRARY_OUTPUT_DIRECTORY=<dest> -DCMAKE_BUILD_TYPE=Release
//! cmake --build . --config Release -- -j<cpus>
//! ```

use super::types::BuildMode;
use crate::platform::HostPlatform;
use std::path::{Path, PathBuf};

/// Optional values forwarded to CMake as cache definitions
///
/// Usually filled from the environment (`PYTHON`, `CC`, `CXX`, ...), see
/// [`ParamInputs::from_env`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamInputs {
    /// Interpreter the bindings are built against (`PYTHON_EXECUTABLE`)
    pub python: Option<PathBuf>,
    pub cc: Option<String>,
    pub cxx: Option<String>,
    pub cflags: Option<String>,
    pub cxxflags: Option<String>,
    pub ldflags: Option<String>,
}

impl ParamInputs {
    /// Collect overrides from the environment
    ///
    /// The interpreter is the explicit one, then `PYTHON`, then the first
    /// `python3` or `python` on `PATH`.
    #[must_use]
    pub fn from_env(python: Option<PathBuf>) -> Self {
        Self {
            python: python
                .or_else(|| crate::env_vars::python().map(PathBuf::from))
                .or_else(crate::env_vars::find_python),
            cc: crate::env_vars::cc(),
            cxx: crate::env_vars::cxx(),
            cflags: crate::env_vars::cflags(),
            cxxflags: crate::env_vars::cxxflags(),
            ldflags: crate::env_vars::ldflags(),
        }
    }
}

/// Resolved arguments for both build phases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildParams {
    /// Arguments after the source directory in the configure phase
    pub configure_args: Vec<String>,
    /// Arguments after `--build .` in the build phase
    pub build_args: Vec<String>,
    /// `Debug` / `Release`
    pub config_name: &'static str,
}

/// Resolve configure and build arguments for `host` and `mode`
///
/// `output_dir` is where the build tool must write the shared library.
#[must_use]
pub fn resolve(
    host: &HostPlatform,
    mode: BuildMode,
    output_dir: &Path,
    inputs: &ParamInputs,
) -> BuildParams {
    let config_name = mode.config_name();
    let dest = output_dir.display();

    let mut configure_args = vec![format!("-DCMAKE_LIBRARY_OUTPUT_DIRECTORY={dest}")];
    if let Some(python) = &inputs.python {
        configure_args.push(format!("-DPYTHON_EXECUTABLE={}", python.display()));
    }

    let defines = [
        ("CMAKE_C_COMPILER", &inputs.cc),
        ("CMAKE_CXX_COMPILER", &inputs.cxx),
        ("CMAKE_C_FLAGS", &inputs.cflags),
        ("CMAKE_CXX_FLAGS", &inputs.cxxflags),
        ("CMAKE_SHARED_LINKER_FLAGS", &inputs.ldflags),
    ];
    for (name, value) in defines {
        if let Some(value) = value {
            configure_args.push(format!("-D{name}={value}"));
        }
    }

    let mut build_args = vec!["--config".to_string(), config_name.to_string()];

    if host.os.uses_multi_config_generator() {
        // Multi-config generators ignore the generic variable for per-config output
        configure_args.push(format!(
            "-DCMAKE_LIBRARY_OUTPUT_DIRECTORY_{}={dest}",
            config_name.to_uppercase()
        ));
        if host.is_64bit {
            configure_args.extend(["-A".to_string(), "x64".to_string()]);
        }
        // MSBuild picks its own parallelism with /m
        build_args.extend(["--".to_string(), "/m".to_string()]);
    } else {
        configure_args.push(format!("-DCMAKE_BUILD_TYPE={config_name}"));
        build_args.extend(["--".to_string(), format!("-j{}", host.logical_cpus)]);
    }

    BuildParams {
        configure_args,
        build_args,
        config_name,
    }
}
