//! Source tree fingerprinting
//!
//! Hashes every build-relevant file under a native source tree into a single
//! digest. Two trees produce the same fingerprint iff they contain the same set
//! of tracked files (by relative path) with identical bytes.
//!
//! Tracked files:
//! - C/C++ sources and headers (`.c`, `.cc`, `.cpp`, `.cxx`, `.h`, `.hpp`, ...)
//! - Build descriptions (`CMakeLists.txt`, `*.cmake`)
//!
//! Directories named like CMake's `FetchContent` cache (`_deps`) are skipped so
//! auto-fetched dependencies never trigger rebuilds. Callers may also pass
//! specific directories to skip, such as a build workspace or stub output
//! placed inside the source tree.
//!
//! Symlinked files are hashed through the link under the link's own path.
//! Symlinked directories are not descended.

use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Source and header extensions that affect the compiled output
pub const TRACKED_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "h", "hh", "hpp", "hxx", "inl"];

/// Build-description file names
pub const BUILD_DESCRIPTION_FILES: &[&str] = &["CMakeLists.txt"];

/// Directory names holding fetched dependencies
pub const FETCH_CACHE_DIRS: &[&str] = &["_deps"];

/// Hex-encoded SHA-256 digest of a source tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hex length of a fingerprint
    pub const LEN: usize = 64;

    /// Parse a stored fingerprint, rejecting anything that isn't 64 lowercase hex digits
    #[must_use]
    pub fn from_hex(value: &str) -> Option<Self> {
        let value = value.trim();
        (value.len() == Self::LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)))
        .then(|| Self(value.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("Source directory not found: {}", path.display())]
    MissingRoot { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Whether a file participates in the fingerprint
#[must_use]
pub fn is_tracked(path: &Path) -> bool {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    if BUILD_DESCRIPTION_FILES.contains(&file_name) {
        return true;
    }

    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == "cmake" || TRACKED_EXTENSIONS.contains(&ext))
}

/// Collect tracked files under `root`, sorted by `/`-joined relative path
///
/// Directories named in `exclude` are skipped at any depth. Directories in
/// `skip_dirs` are skipped when the walk reaches them.
///
/// # Errors
///
/// Returns an error if `root` is missing or any directory cannot be listed.
pub fn tracked_files(
    root: &Path,
    exclude: &[String],
    skip_dirs: &[PathBuf],
) -> Result<Vec<(String, PathBuf)>, FingerprintError> {
    if !root.is_dir() {
        return Err(FingerprintError::MissingRoot {
            path: root.to_path_buf(),
        });
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !FETCH_CACHE_DIRS.contains(&&*name)
                && !exclude.iter().any(|e| e.as_str() == &*name)
                && !skip_dirs.iter().any(|dir| dir == entry.path())
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            FingerprintError::Unreadable {
                path,
                source: e.into(),
            }
        })?;

        // `Path::is_file` follows symlinks, `DirEntry::file_type` doesn't
        if !entry.path().is_file() || !is_tracked(entry.path()) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or_else(|_| entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((relative, entry.into_path()));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Compute the fingerprint of a source tree
///
/// Each tracked file contributes its relative path, its byte length and its
/// contents, in sorted path order.
///
/// # Errors
///
/// Returns an error if the tree cannot be enumerated or a file cannot be read.
/// Callers treat this as "stale" and rebuild.
pub fn fingerprint_tree(
    root: &Path,
    exclude: &[String],
    skip_dirs: &[PathBuf],
) -> Result<Fingerprint, FingerprintError> {
    let mut hasher = Sha256::new();

    for (relative, path) in tracked_files(root, exclude, skip_dirs)? {
        let contents = std::fs::read(&path).map_err(|source| FingerprintError::Unreadable {
            path: path.clone(),
            source,
        })?;

        hasher.update(relative.as_bytes());
        hasher.update([0_u8]);
        hasher.update((contents.len() as u64).to_le_bytes());
        hasher.update(&contents);
    }

    let digest = hasher.finalize();
    Ok(Fingerprint(format!("{digest:x}")))
}
