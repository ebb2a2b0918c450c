//! Artifact placement
//!
//! Maps a package-qualified module path (`aimbot.xwayland_capture`) onto the
//! package tree and prepares the destination so the build tool can write the
//! shared library straight into it:
//!
//! ```text
//! <package_root>/
//!   aimbot/
//!     __init__.py                                   (created if missing)
//!     xwayland_capture.cpython-312-x86_64-linux-gnu.so
//! ```

use super::types::BuildError;
use std::path::{Path, PathBuf};

/// Empty file that makes a directory an importable package
pub const PACKAGE_MARKER: &str = "__init__.py";

/// File extensions of compiled extension modules
/// (`.so` on Linux/macOS, `.pyd` on Windows, `.dylib` for some macOS toolchains)
pub const MODULE_SUFFIXES: &[&str] = &["so", "pyd", "dylib"];

/// Whether `path` looks like a compiled extension module
#[must_use]
pub fn is_compiled_module(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MODULE_SUFFIXES.contains(&ext))
}

/// Importable module name of a compiled module file
///
/// Strips everything from the first `.`, which drops ABI/platform tags:
/// - `capture.cpython-312-x86_64-linux-gnu.so` -> `capture`
/// - `capture.cp312-win_amd64.pyd` -> `capture`
/// - `capture.so` -> `capture`
#[must_use]
pub fn module_name_from_file(file_name: &str) -> Option<&str> {
    file_name.split('.').next().filter(|name| !name.is_empty())
}

/// Compiled modules directly inside `dir`, sorted by file name
///
/// Returns an empty list if `dir` doesn't exist.
#[must_use]
pub fn compiled_modules(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut modules: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_compiled_module(path))
        .collect();
    modules.sort();
    modules
}

/// Resolved destination of one target's module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Directory the shared library is written to
    pub output_dir: PathBuf,
    /// Directory holding the top-level package (goes on the module search path)
    pub import_root: PathBuf,
    /// Dotted package name, `None` for a top-level module
    pub package: Option<String>,
    /// Module leaf name
    pub module_name: String,
}

impl Placement {
    /// Resolve `module` (dotted path) under `package_root`
    #[must_use]
    pub fn resolve(package_root: &Path, module: &str) -> Self {
        let (package, module_name) = match module.rsplit_once('.') {
            Some((package, name)) => (Some(package.to_string()), name.to_string()),
            None => (None, module.to_string()),
        };

        let mut output_dir = package_root.to_path_buf();
        if let Some(package) = &package {
            output_dir.extend(package.split('.'));
        }

        Self {
            output_dir,
            import_root: package_root.to_path_buf(),
            package,
            module_name,
        }
    }

    /// Fully qualified name for a module living in the output directory
    #[must_use]
    pub fn qualify(&self, module_name: &str) -> String {
        match &self.package {
            Some(package) => format!("{package}.{module_name}"),
            None => module_name.to_string(),
        }
    }

    /// Create the output directory and its package marker
    ///
    /// Idempotent; an existing marker is left untouched. Returns `true` if a
    /// marker was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or marker cannot be created.
    pub fn prepare(&self) -> Result<bool, BuildError> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(BuildError::wrap_io(&self.output_dir))?;

        if self.package.is_none() {
            return Ok(false);
        }

        let marker = self.output_dir.join(PACKAGE_MARKER);
        if marker.exists() {
            return Ok(false);
        }

        std::fs::write(&marker, b"").map_err(BuildError::wrap_io(&marker))?;
        Ok(true)
    }

    /// Locate the compiled module for this target, if one was built before
    #[must_use]
    pub fn find_artifact(&self) -> Option<PathBuf> {
        compiled_modules(&self.output_dir).into_iter().find(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .and_then(module_name_from_file)
                == Some(self.module_name.as_str())
        })
    }
}
