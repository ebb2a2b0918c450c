//! Common test utilities and helpers
//!
//! This module provides shared functionality used across integration tests:
//! - Binary path resolution (via `get_extbuild_binary`)
//! - Project fixtures with fake `cmake` and stub tools (via `helpers`)

pub(crate) mod helpers;

// Re-export for convenient access
#[allow(unused_imports)]
pub(crate) use helpers::{Project, get_extbuild_binary};
