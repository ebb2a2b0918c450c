//! Build cache
//!
//! Persists the fingerprint of the last successful build inside the target's
//! build workspace. Cleaning the workspace therefore forces a rebuild.
//!
//! Writes go through a temporary file in the same directory followed by an
//! atomic rename, so a reader never sees a half-written fingerprint.

use super::fingerprint::Fingerprint;
use crate::debug;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File name of the cache record inside a workspace
pub const CACHE_FILE_NAME: &str = ".source-fingerprint";

/// Cache record for one build target
#[derive(Debug, Clone)]
pub struct BuildCache {
    path: PathBuf,
}

impl BuildCache {
    /// Cache backed by `<workspace>/.source-fingerprint`
    #[must_use]
    pub fn for_workspace(workspace: &Path) -> Self {
        Self {
            path: workspace.join(CACHE_FILE_NAME),
        }
    }

    /// Path of the record file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last recorded fingerprint
    ///
    /// A missing file is `None`. A record that doesn't parse as a fingerprint is
    /// also `None` so the next build overwrites it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn read(&self) -> Result<Option<Fingerprint>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no cache record at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read build cache: {}", self.path.display())
                });
            }
        };

        let fingerprint = Fingerprint::from_hex(&contents);
        match &fingerprint {
            Some(fingerprint) => {
                debug!("cached fingerprint {fingerprint} in {}", self.path.display());
            }
            None => debug!("ignoring malformed cache record {}", self.path.display()),
        }
        Ok(fingerprint)
    }

    /// Record `fingerprint` as the last successful build
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace cannot be created or the file cannot
    /// be written and renamed into place.
    pub fn write(&self, fingerprint: &Fingerprint) -> Result<()> {
        let dir = self
            .path
            .parent()
            .context("Build cache path has no parent directory")?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create workspace: {}", dir.display()))?;

        let mut temp_file = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        writeln!(temp_file, "{fingerprint}").context("Failed to write build cache")?;
        temp_file.as_file().sync_all().context("Failed to flush build cache")?;

        // Atomic rename
        temp_file
            .persist(&self.path)
            .with_context(|| format!("Failed to save build cache: {}", self.path.display()))?;

        debug!("recorded fingerprint {fingerprint} in {}", self.path.display());
        Ok(())
    }
}
