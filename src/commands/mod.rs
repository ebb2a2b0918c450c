//! Command implementations

pub(crate) mod build;
