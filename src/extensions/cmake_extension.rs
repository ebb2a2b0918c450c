//! `CMake` extension building
//!
//! Runs the two external phases for a target inside its build workspace:
//! ```bash
//! mkdir -p <workspace>
//! cd <workspace>
//! cmake <source_dir> <configure args>
//! cmake --build . <build args>
//! ```
//!
//! The output directory arguments make `CMake` write the shared library
//! straight into the package tree, so there is no install/copy step.

use super::params::BuildParams;
use super::types::{BuildError, BuildTarget};
use crate::debug;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Instant;

/// Lines of captured tool output attached to a failure
const FAILURE_TAIL_LINES: usize = 20;

/// `CMake` extension builder
///
/// Holds the discovered `cmake` executable. Discovery never spawns a process,
/// so a missing toolchain is reported before anything runs.
#[derive(Debug)]
pub struct CMakeExtensionBuilder {
    /// Path to `CMake` executable
    cmake_path: PathBuf,
    /// Pass tool output through instead of capturing it
    verbose: bool,
}

impl CMakeExtensionBuilder {
    /// Create a new `CMake` extension builder
    ///
    /// Priority order:
    /// 1. Explicit path (`tools.cmake` in the config)
    /// 2. `CMAKE` environment variable
    /// 3. `cmake` in `PATH`
    ///
    /// # Errors
    ///
    /// Returns `BuildError::ToolchainNotFound` if no executable is found.
    pub fn new(explicit: Option<&Path>, verbose: bool) -> Result<Self, BuildError> {
        let cmake_path = Self::find_cmake_executable(explicit)?;
        debug!("using cmake at {}", cmake_path.display());

        Ok(Self {
            cmake_path,
            verbose,
        })
    }

    /// Find `CMake` executable on the system
    fn find_cmake_executable(explicit: Option<&Path>) -> Result<PathBuf, BuildError> {
        let not_found = |hint: String| BuildError::ToolchainNotFound {
            tool: "CMake".to_string(),
            hint,
        };

        if let Some(path) = explicit {
            return resolve_program(path).ok_or_else(|| {
                not_found(format!("Configured path does not exist: {}", path.display()))
            });
        }

        if let Some(cmake_env) = crate::env_vars::cmake() {
            let path = PathBuf::from(&cmake_env);
            return resolve_program(&path)
                .ok_or_else(|| not_found(format!("CMAKE points to a missing file: {cmake_env}")));
        }

        crate::env_vars::find_in_path("cmake")
            .ok_or_else(|| not_found("Install CMake from https://cmake.org".to_string()))
    }

    /// Path of the `cmake` executable in use
    #[must_use]
    pub fn cmake_path(&self) -> &Path {
        &self.cmake_path
    }

    /// Configure and build `target` inside `workspace`.
    ///
    /// The workspace is created if missing. Any non-zero exit aborts the target.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Configure` / `BuildError::Compile` on a failed phase,
    /// `BuildError::Spawn` if `cmake` cannot be started and `BuildError::Io` if
    /// the workspace cannot be created.
    pub fn build(
        &self,
        target: &BuildTarget,
        workspace: &Path,
        params: &BuildParams,
    ) -> Result<(), BuildError> {
        let start_time = Instant::now();

        std::fs::create_dir_all(workspace).map_err(BuildError::wrap_io(workspace))?;

        // Step 1: Run cmake to configure
        let mut configure = Command::new(&self.cmake_path);
        configure
            .arg(&target.source_dir)
            .args(&params.configure_args)
            .current_dir(workspace);

        debug!(
            "configure {}: cmake {} {}",
            target.name,
            target.source_dir.display(),
            params.configure_args.join(" ")
        );
        self.run_phase(target, configure, Phase::Configure)?;

        // Step 2: Run cmake --build to compile
        let mut compile = Command::new(&self.cmake_path);
        compile
            .arg("--build")
            .arg(".")
            .args(&params.build_args)
            .current_dir(workspace);

        debug!(
            "build {}: cmake --build . {}",
            target.name,
            params.build_args.join(" ")
        );
        self.run_phase(target, compile, Phase::Compile)?;

        debug!(
            "{} configured and built in {:?}",
            target.name,
            start_time.elapsed()
        );
        Ok(())
    }

    fn run_phase(
        &self,
        target: &BuildTarget,
        mut cmd: Command,
        phase: Phase,
    ) -> Result<(), BuildError> {
        cmd.stdin(Stdio::null());

        let spawn_error = |source| BuildError::Spawn {
            target: target.name.clone(),
            program: self.cmake_path.display().to_string(),
            source,
        };

        let (status, output) = if self.verbose {
            (cmd.status().map_err(spawn_error)?, String::new())
        } else {
            let out = cmd.output().map_err(spawn_error)?;
            (out.status, failure_tail(&out))
        };

        if status.success() {
            return Ok(());
        }

        let status = status
            .code()
            .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit code {c}"));

        Err(match phase {
            Phase::Configure => BuildError::Configure {
                target: target.name.clone(),
                status,
                output,
            },
            Phase::Compile => BuildError::Compile {
                target: target.name.clone(),
                status,
                output,
            },
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Configure,
    Compile,
}

/// Executable for a configured tool path, `None` if it doesn't exist
fn resolve_program(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }

    // Bare names like "cmake3" are looked up on PATH
    if path.components().count() == 1 {
        return path.to_str().and_then(crate::env_vars::find_in_path);
    }

    None
}

/// Last lines of captured stdout+stderr, prefixed with a newline (empty if none)
fn failure_tail(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    let lines: Vec<&str> = stdout
        .lines()
        .chain(stderr.lines())
        .filter(|line| !line.trim().is_empty())
        .collect();
    let skip = lines.len().saturating_sub(FAILURE_TAIL_LINES);

    lines
        .iter()
        .skip(skip)
        .fold(String::new(), |mut tail, line| {
            tail.push_str("\n  ");
            tail.push_str(line);
            tail
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::types::BuildMode;
    use tempfile::TempDir;

    #[test]
    fn explicit_missing_path_is_toolchain_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("bin").join("cmake");

        let err = CMakeExtensionBuilder::new(Some(&missing), false).unwrap_err();

        assert!(err.is_environment());
        assert!(err.to_string().contains("CMake executable not found"));
    }

    #[test]
    fn explicit_existing_path_is_used() {
        let temp = TempDir::new().unwrap();
        let fake = temp.path().join("cmake");
        std::fs::write(&fake, "").unwrap();

        let builder = CMakeExtensionBuilder::new(Some(&fake), false).unwrap();

        assert_eq!(builder.cmake_path(), fake.as_path());
    }

    #[test]
    fn spawn_failure_is_reported() {
        let temp = TempDir::new().unwrap();
        let builder = CMakeExtensionBuilder {
            cmake_path: temp.path().join("gone"),
            verbose: false,
        };
        let target = BuildTarget::new("pkg.mod", temp.path(), BuildMode::Release);
        let params = BuildParams {
            configure_args: Vec::new(),
            build_args: Vec::new(),
            config_name: "Release",
        };

        let err = builder
            .build(&target, &temp.path().join("ws"), &params)
            .unwrap_err();

        assert!(matches!(err, BuildError::Spawn { .. }));
        assert!(temp.path().join("ws").is_dir(), "workspace is created");
    }

    #[cfg(unix)]
    #[test]
    fn configure_failure_stops_before_build() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let log = temp.path().join("calls.log");
        let script = temp.path().join("cmake");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\necho \"$1\" >> \"{}\"\necho 'CMake Error: boom' >&2\nexit 3\n",
                log.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let builder = CMakeExtensionBuilder::new(Some(&script), false).unwrap();
        let target = BuildTarget::new("pkg.mod", temp.path(), BuildMode::Release);
        let params = BuildParams {
            configure_args: Vec::new(),
            build_args: Vec::new(),
            config_name: "Release",
        };

        let err = builder
            .build(&target, &temp.path().join("ws"), &params)
            .unwrap_err();

        assert!(matches!(&err, BuildError::Configure { status, .. } if status == "exit code 3"));
        assert!(err.to_string().contains("CMake Error: boom"));
        let calls = std::fs::read_to_string(&log).unwrap();
        assert_eq!(calls.lines().count(), 1, "build phase never ran");
    }

    #[cfg(unix)]
    #[test]
    fn failure_tail_keeps_last_lines() {
        use std::os::unix::process::ExitStatusExt;

        let text: String = (0..30).map(|i| format!("line {i}\n")).collect();
        let output = Output {
            status: std::process::ExitStatus::from_raw(256),
            stdout: text.into_bytes(),
            stderr: b"fatal\n".to_vec(),
        };

        let tail = failure_tail(&output);

        assert_eq!(
            tail.lines().filter(|l| !l.is_empty()).count(),
            FAILURE_TAIL_LINES
        );
        assert!(tail.ends_with("fatal"));
        assert!(!tail.contains("line 0\n"));
    }
}
