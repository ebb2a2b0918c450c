//! Extension build orchestration
//!
//! Drives each target through its states:
//!
//! ```text
//! Checking -> UpToDate
//!          -> Building -> BuildFailed
//!                      -> Placing -> Stubbing -> Caching -> Done
//! ```
//!
//! A target is rebuilt when forced, when its compiled module is missing from
//! the package, or when its source fingerprint differs from the cache record.
//! The record is only written after a successful build, so an interrupted or
//! failed run is retried next time.

use super::cache::BuildCache;
use super::cmake_extension::CMakeExtensionBuilder;
use super::fingerprint::{Fingerprint, fingerprint_tree};
use super::params::{ParamInputs, resolve};
use super::placement::Placement;
use super::stubs::StubGenerator;
use super::types::{BuildError, BuildState, BuildTarget, TargetReport};
use crate::debug;
use crate::platform::HostPlatform;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Switches that change how targets are processed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Rebuild even if the fingerprint matches
    pub force: bool,
    /// Regenerate type stubs after a build
    pub stubs: bool,
    /// Pass tool output through
    pub verbose: bool,
    /// Only report failures
    pub quiet: bool,
}

/// Locations and tool inputs shared by every target of one invocation
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Directory holding the top-level Python package
    pub package_root: PathBuf,
    /// Parent of the per-target workspaces
    pub build_dir: PathBuf,
    /// Host the parameters are resolved for
    pub host: HostPlatform,
    /// Interpreter and compiler overrides
    pub inputs: ParamInputs,
    /// Configured `cmake` executable, discovered on PATH if `None`
    pub cmake: Option<PathBuf>,
}

impl BuildSettings {
    /// Workspace directory of `target`
    #[must_use]
    pub fn workspace(&self, target: &BuildTarget) -> PathBuf {
        self.build_dir.join(&target.name)
    }
}

/// Why a target has to be rebuilt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    Forced,
    MissingArtifact,
    NoCacheRecord,
    SourcesChanged,
    FingerprintUnavailable,
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Forced => "forced",
            Self::MissingArtifact => "compiled module missing",
            Self::NoCacheRecord => "no previous build",
            Self::SourcesChanged => "sources changed",
            Self::FingerprintUnavailable => "sources could not be fingerprinted",
        })
    }
}

/// Decide whether a target needs building
///
/// `None` means up to date. The artifact check comes first so a deleted
/// module is rebuilt even when the sources are unchanged.
#[must_use]
pub fn rebuild_reason(
    force: bool,
    artifact_present: bool,
    current: Option<&Fingerprint>,
    recorded: Option<&Fingerprint>,
) -> Option<RebuildReason> {
    if force {
        return Some(RebuildReason::Forced);
    }
    if !artifact_present {
        return Some(RebuildReason::MissingArtifact);
    }
    let Some(current) = current else {
        return Some(RebuildReason::FingerprintUnavailable);
    };
    match recorded {
        None => Some(RebuildReason::NoCacheRecord),
        Some(recorded) if recorded != current => Some(RebuildReason::SourcesChanged),
        Some(_) => None,
    }
}

/// Extension build coordinator
///
/// Targets are processed one at a time, in order. The `CMake` driver is
/// created on the first target that actually needs building, so a run where
/// everything is up to date never looks for the toolchain.
#[derive(Debug)]
pub struct ExtensionBuilder {
    settings: BuildSettings,
    options: BuildOptions,
    stubs: StubGenerator,
    /// `CMake` extension builder (lazy-initialized)
    cmake_builder: Option<CMakeExtensionBuilder>,
}

impl ExtensionBuilder {
    /// Create a new extension builder.
    #[must_use]
    pub const fn new(settings: BuildSettings, options: BuildOptions, stubs: StubGenerator) -> Self {
        Self {
            settings,
            options,
            stubs,
            cmake_builder: None,
        }
    }

    /// Run one target to a terminal state
    #[must_use]
    pub fn build_target(&mut self, target: &BuildTarget) -> TargetReport {
        let start = Instant::now();
        let mut trace = Vec::new();

        let mut report = self.run_target(target, start, &mut trace);
        debug_assert!(trace.last().is_some_and(|state| state.is_terminal()));
        report.trace = trace;
        report
    }

    fn run_target(
        &mut self,
        target: &BuildTarget,
        start: Instant,
        trace: &mut Vec<BuildState>,
    ) -> TargetReport {
        let placement = Placement::resolve(&self.settings.package_root, &target.module);
        let workspace = self.settings.workspace(target);
        let cache = BuildCache::for_workspace(&workspace);
        let skip_dirs = self.generated_dirs();

        enter(trace, target, BuildState::Checking);
        let current = match fingerprint_tree(&target.source_dir, &target.exclude, &skip_dirs) {
            Ok(fingerprint) => Some(fingerprint),
            Err(e) => {
                debug!("{}: {e}", target.name);
                None
            }
        };
        let recorded = cache.read().unwrap_or_else(|e| {
            debug!("{}: {e:#}", target.name);
            None
        });
        let artifact = placement.find_artifact();

        let Some(reason) = rebuild_reason(
            self.options.force,
            artifact.is_some(),
            current.as_ref(),
            recorded.as_ref(),
        ) else {
            enter(trace, target, BuildState::UpToDate);
            if !self.options.quiet {
                println!("✓ {} is up to date, skipping build", target.name);
            }
            return TargetReport::up_to_date(target.name.clone(), start.elapsed());
        };

        enter(trace, target, BuildState::Building);
        debug!("{}: rebuilding ({reason})", target.name);
        if !self.options.quiet {
            println!("Building {}...", target.name);
        }

        if let Err(error) = self.compile(target, &placement, &workspace) {
            enter(trace, target, BuildState::BuildFailed);
            eprintln!("✗ {} failed: {error}", target.name);
            return TargetReport::failed(target.name.clone(), start.elapsed(), error);
        }

        let mut warnings = Vec::new();

        enter(trace, target, BuildState::Placing);
        warnings.extend(self.place(&placement));

        enter(trace, target, BuildState::Stubbing);
        if self.options.stubs && target.stubs {
            warnings.extend(self.generate_stubs(&placement));
        } else {
            debug!("{}: stub generation disabled", target.name);
        }

        enter(trace, target, BuildState::Caching);
        warnings.extend(Self::record(target, &cache, current, &skip_dirs));

        enter(trace, target, BuildState::Done);
        let duration = start.elapsed();
        if !self.options.quiet {
            println!("✓ {} built successfully", target.name);
        }
        TargetReport::built(target.name.clone(), duration, warnings)
    }

    /// Configure and compile into the package directory
    fn compile(
        &mut self,
        target: &BuildTarget,
        placement: &Placement,
        workspace: &Path,
    ) -> Result<(), BuildError> {
        // Lazy-initialize CMake builder
        let cmake = match &mut self.cmake_builder {
            Some(cmake) => cmake,
            slot => slot.insert(CMakeExtensionBuilder::new(
                self.settings.cmake.as_deref(),
                self.options.verbose,
            )?),
        };

        // The library is written straight into the package
        placement.prepare()?;

        let params = resolve(
            &self.settings.host,
            target.mode,
            &placement.output_dir,
            &self.settings.inputs,
        );
        if self.options.verbose {
            let program = cmake.cmake_path().display();
            println!(
                "  {program} {} {}",
                target.source_dir.display(),
                params.configure_args.join(" ")
            );
            println!("  {program} --build . {}", params.build_args.join(" "));
        }
        cmake.build(target, workspace, &params)
    }

    fn place(&self, placement: &Placement) -> Vec<String> {
        let mut warnings = Vec::new();

        match placement.prepare() {
            Ok(true) => debug!("created package marker in {}", placement.output_dir.display()),
            Ok(false) => {}
            Err(e) => warnings.push(e.to_string()),
        }

        match placement.find_artifact() {
            Some(artifact) => debug!("compiled module at {}", artifact.display()),
            None => warnings.push(format!(
                "no compiled module named {} found in {}",
                placement.module_name,
                placement.output_dir.display()
            )),
        }

        for warning in &warnings {
            self.warn(warning);
        }
        warnings
    }

    fn generate_stubs(&self, placement: &Placement) -> Vec<String> {
        let mut warnings = Vec::new();

        for outcome in self.stubs.generate(placement) {
            if outcome.success() {
                debug!(
                    "stubs for {} written to {}",
                    outcome.module,
                    self.stubs.stub_dir().display()
                );
                continue;
            }
            let error = outcome.error.unwrap_or_default();
            let warning = format!("stub generation failed for {}: {error}", outcome.module);
            self.warn(&warning);
            warnings.push(warning);
        }

        warnings
    }

    /// Directories extbuild writes into that may sit inside a source tree
    ///
    /// The package root is not listed: sources may live under it and nothing
    /// placed there is a tracked file type.
    fn generated_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.settings.build_dir.clone(),
            self.stubs.stub_dir().to_path_buf(),
        ]
    }

    /// Store the fingerprint taken before the build
    ///
    /// Falls back to fingerprinting again if the sources couldn't be read
    /// earlier. If that also fails nothing is written and the target is
    /// rebuilt next time.
    fn record(
        target: &BuildTarget,
        cache: &BuildCache,
        fingerprint: Option<Fingerprint>,
        skip_dirs: &[PathBuf],
    ) -> Option<String> {
        let fingerprint = match fingerprint {
            Some(fingerprint) => fingerprint,
            None => match fingerprint_tree(&target.source_dir, &target.exclude, skip_dirs) {
                Ok(fingerprint) => fingerprint,
                Err(e) => return Some(format!("build cache not updated: {e}")),
            },
        };

        cache.write(&fingerprint).err().map(|e| {
            format!(
                "build cache not updated ({}): {e:#}",
                cache.path().display()
            )
        })
    }

    fn warn(&self, message: &str) {
        if !self.options.quiet {
            eprintln!("  Warning: {message}");
        }
    }

    /// Build targets in order
    ///
    /// A failed target doesn't stop the ones after it.
    #[must_use]
    pub fn build_many(&mut self, targets: &[BuildTarget]) -> Vec<TargetReport> {
        targets
            .iter()
            .map(|target| self.build_target(target))
            .collect()
    }

    /// Get summary statistics
    ///
    /// # Returns
    /// (`built_count`, `up_to_date_count`, `failed_count`, `total_duration`)
    #[must_use]
    pub fn summarize(results: &[TargetReport]) -> (usize, usize, usize, Duration) {
        let failed = results.iter().filter(|r| !r.success()).count();
        let up_to_date = results
            .iter()
            .filter(|r| r.state == BuildState::UpToDate)
            .count();
        let built = results.len() - failed - up_to_date;
        let total_duration = results.iter().map(|r| r.duration).sum();

        (built, up_to_date, failed, total_duration)
    }
}

fn enter(trace: &mut Vec<BuildState>, target: &BuildTarget, state: BuildState) {
    debug!("{}: {state}", target.name);
    trace.push(state);
}
