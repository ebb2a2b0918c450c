//! extbuild internal library code

pub mod config;
pub mod debug;
pub mod env_vars;
pub mod extensions;
pub mod paths;
pub mod platform;

// Re-export common types for convenience
pub use config::{Config, ConfigError, TargetConfig, ToolsConfig};
pub use debug::{init_debug, is_debug_enabled};
pub use extensions::{
    BuildError, BuildMode, BuildOptions, BuildSettings, BuildState, BuildTarget, ExtensionBuilder,
    Fingerprint, ParamInputs, StubGenerator, TargetReport, fingerprint_tree,
};
pub use paths::{find_config, find_config_in};
pub use platform::{HostOs, HostPlatform, detect_host_platform};
