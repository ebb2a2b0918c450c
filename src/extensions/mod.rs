//! Native extension building
//!
//! Builds the CMake-based extension modules of a Python package. Each target
//! is fingerprinted, rebuilt only when stale, written straight into the
//! package tree and followed by type stub regeneration.
//!
//! Pipeline per target:
//! - `fingerprint` hashes the source tree
//! - `cache` compares it with the last successful build
//! - `params` resolves host-specific `CMake` arguments
//! - `cmake_extension` runs configure and build
//! - `placement` prepares and checks the package directory
//! - `stubs` regenerates `.pyi` files

pub mod builder;
pub mod cache;
pub mod cmake_extension;
pub mod fingerprint;
pub mod params;
pub mod placement;
pub mod stubs;
pub mod types;

pub use builder::{BuildOptions, BuildSettings, ExtensionBuilder, RebuildReason, rebuild_reason};
pub use cache::BuildCache;
pub use cmake_extension::CMakeExtensionBuilder;
pub use fingerprint::{Fingerprint, FingerprintError, fingerprint_tree};
pub use params::{BuildParams, ParamInputs};
pub use placement::Placement;
pub use stubs::{StubGenerator, StubOutcome};
pub use types::{BuildError, BuildMode, BuildState, BuildTarget, TargetReport};
