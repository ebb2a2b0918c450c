//! Build command
//!
//! Load the project config and bring every selected extension target up to date

use anyhow::{Context, Result};
use extbuild::env_vars;
use extbuild::extensions::stubs::DEFAULT_STUBGEN;
use extbuild::{
    BuildMode, BuildOptions, BuildSettings, Config, ExtensionBuilder, ParamInputs, StubGenerator,
    debug, detect_host_platform,
};
use std::path::{Path, PathBuf};

/// Command-line inputs for a build
#[derive(Debug, Clone, Copy)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct BuildArgs<'a> {
    /// Explicit config file (`--config`)
    pub(crate) config: Option<&'a Path>,
    /// Target names to restrict the run to
    pub(crate) targets: &'a [String],
    pub(crate) mode: Option<BuildMode>,
    pub(crate) jobs: Option<usize>,
    pub(crate) force: bool,
    pub(crate) stubs: bool,
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
}

/// Build all selected targets
///
/// Returns `Ok(false)` if any target failed; configuration problems are errors.
pub(crate) fn run(args: &BuildArgs<'_>) -> Result<bool> {
    let config = Config::load(args.config).context("Failed to load configuration")?;
    let targets = config.targets(args.mode, args.targets)?;

    let options = BuildOptions {
        force: args.force || env_vars::extbuild_force(),
        stubs: args.stubs,
        verbose: args.verbose,
        quiet: args.quiet,
    };
    let settings = build_settings(&config, args.jobs);
    let stubs = stub_generator(&config, args.verbose);

    debug!(
        "package root {}, workspaces in {}, {} job(s)",
        settings.package_root.display(),
        settings.build_dir.display(),
        settings.host.logical_cpus
    );

    let mut builder = ExtensionBuilder::new(settings, options, stubs);
    let results = builder.build_many(&targets);

    let (built, up_to_date, failed, duration) = ExtensionBuilder::summarize(&results);
    if !args.quiet && results.len() > 1 {
        println!(
            "{built} built, {up_to_date} up to date, {failed} failed in {:.2}s",
            duration.as_secs_f64()
        );
    }

    Ok(failed == 0)
}

/// Resolve locations and tool inputs.
/// Priority for each value: flag -> environment -> project config -> user config -> default.
fn build_settings(config: &Config, jobs: Option<usize>) -> BuildSettings {
    let mut host = detect_host_platform();
    if let Some(jobs) = jobs
        .or_else(env_vars::extbuild_jobs)
        .or(config.jobs)
    {
        host = host.with_jobs(jobs);
    }

    let cmake = env_vars::cmake()
        .map(PathBuf::from)
        .or_else(|| config.tools.cmake.as_deref().map(|p| config.tool_path(p)));
    let python = env_vars::python()
        .map(PathBuf::from)
        .or_else(|| config.tools.python.as_deref().map(|p| config.tool_path(p)));

    BuildSettings {
        package_root: config.package_root(),
        build_dir: config.build_dir(),
        host,
        inputs: ParamInputs::from_env(python),
        cmake,
    }
}

fn stub_generator(config: &Config, verbose: bool) -> StubGenerator {
    let program = env_vars::extbuild_stubgen()
        .map(PathBuf::from)
        .or_else(|| {
            config
                .tools
                .stubgen
                .as_deref()
                .map(|p| config.tool_path(Path::new(p)))
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STUBGEN));

    StubGenerator::new(
        program,
        config.tools.stubgen_args.clone().unwrap_or_default(),
        config.stub_dir(),
        verbose,
    )
}
