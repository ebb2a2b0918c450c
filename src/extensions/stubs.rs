//! Type stub regeneration
//!
//! Compiled modules are opaque to type checkers. After a successful build every
//! compiled module in the destination directory gets its `.pyi` stub
//! regenerated by an external tool:
//!
//! ```bash
//! PYTHONPATH=<import_root>:$PYTHONPATH pybind11-stubgen aimbot.xwayland_capture -o typings
//! ```
//!
//! Stubs only help tooling, so a failure for one module is recorded and the
//! remaining modules are still processed.

use super::placement::{Placement, compiled_modules, module_name_from_file};
use crate::debug;
use crate::env_vars;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Default stub generation tool
pub const DEFAULT_STUBGEN: &str = "pybind11-stubgen";

/// Outcome of regenerating the stub for one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubOutcome {
    /// Fully qualified module name
    pub module: String,
    /// Failure reason, `None` on success
    pub error: Option<String>,
}

impl StubOutcome {
    #[must_use]
    #[inline]
    pub const fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Stub generator invocation settings
#[derive(Debug, Clone)]
pub struct StubGenerator {
    /// Stub tool executable
    program: PathBuf,
    /// Extra arguments placed before the module name
    args: Vec<String>,
    /// Output root passed with `-o`
    stub_dir: PathBuf,
    /// Pass tool output through to the terminal
    verbose: bool,
}

impl StubGenerator {
    #[must_use]
    pub fn new(
        program: impl Into<PathBuf>,
        args: Vec<String>,
        stub_dir: impl Into<PathBuf>,
        verbose: bool,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            stub_dir: stub_dir.into(),
            verbose,
        }
    }

    /// Output root for generated stubs
    #[must_use]
    pub fn stub_dir(&self) -> &Path {
        &self.stub_dir
    }

    /// Regenerate stubs for every compiled module in the placement's output directory
    ///
    /// Never fails as a whole: each module gets its own outcome.
    #[must_use]
    pub fn generate(&self, placement: &Placement) -> Vec<StubOutcome> {
        let search_path = env_vars::prepend_module_search_path(placement.import_root.clone());

        compiled_modules(&placement.output_dir)
            .iter()
            .filter_map(|path| {
                let file_name = path.file_name()?.to_str()?;
                module_name_from_file(file_name).map(|name| placement.qualify(name))
            })
            .map(|module| {
                let error = self.generate_one(&module, &search_path).err();
                StubOutcome { module, error }
            })
            .collect()
    }

    fn generate_one(&self, module: &str, search_path: &std::ffi::OsStr) -> Result<(), String> {
        debug!(
            "stubgen: {} {} {module} -o {}",
            self.program.display(),
            self.args.join(" "),
            self.stub_dir.display()
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(module)
            .arg("-o")
            .arg(&self.stub_dir)
            .env(env_vars::MODULE_SEARCH_PATH_VAR, search_path)
            .stdin(Stdio::null());

        if self.verbose {
            let status = cmd
                .status()
                .map_err(|e| format!("failed to run {}: {e}", self.program.display()))?;
            return if status.success() {
                Ok(())
            } else {
                Err(format!("stub tool exited with {status}"))
            };
        }

        let output = cmd
            .output()
            .map_err(|e| format!("failed to run {}: {e}", self.program.display()))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        match stderr.lines().rev().find(|line| !line.trim().is_empty()) {
            Some(reason) => Err(format!(
                "stub tool exited with {}: {}",
                output.status,
                reason.trim()
            )),
            None => Err(format!("stub tool exited with {}", output.status)),
        }
    }
}
