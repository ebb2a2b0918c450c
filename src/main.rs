//! extbuild command-line interface
//!
//! Incremental `CMake` build orchestrator for native Python extension modules

use clap::Parser;
use extbuild::BuildMode;
use std::path::PathBuf;
use std::process;

/// Display an error with optional backtrace information
fn display_error(err: &anyhow::Error, backtrace_enabled: bool) {
    eprintln!("error: {err}");

    // Show error chain
    let mut source = err.source();
    while let Some(err) = source {
        eprintln!("caused by: {err}");
        source = err.source();
    }

    // Show backtrace if enabled
    if backtrace_enabled {
        let backtrace = err.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            eprintln!("\nBacktrace:");
            eprintln!("{backtrace}");
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "extbuild")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Rebuild native extension modules when their sources change",
    long_about = None
)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct Cli {
    /// Targets to build (default: all configured targets)
    #[arg(value_name = "TARGETS")]
    targets: Vec<String>,

    /// Path to extbuild.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Build mode for every target
    #[arg(long, value_enum)]
    mode: Option<BuildMode>,

    /// Parallel compile jobs (default: logical CPUs)
    #[arg(long, short = 'j', value_parser = clap::value_parser!(u16).range(1..))]
    jobs: Option<u16>,

    /// Rebuild even if sources are unchanged
    #[arg(long)]
    force: bool,

    /// Skip type stub regeneration
    #[arg(long)]
    no_stubs: bool,

    /// Show tool output and resolved arguments
    #[arg(long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, short, conflicts_with = "verbose")]
    quiet: bool,

    /// Enable debug output
    #[arg(long)]
    debug: bool,

    /// Show backtrace on error
    #[arg(long)]
    backtrace: bool,
}

fn main() {
    let cli = Cli::parse();

    // Initialize debug mode
    extbuild::init_debug(cli.debug);

    let backtrace = cli.backtrace;
    let result = commands::build::run(&commands::build::BuildArgs {
        config: cli.config.as_deref(),
        targets: &cli.targets,
        mode: cli.mode,
        jobs: cli.jobs.map(usize::from),
        force: cli.force,
        stubs: !cli.no_stubs,
        verbose: cli.verbose,
        quiet: cli.quiet,
    });

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            // Display error with formatting
            display_error(&e, backtrace);
            process::exit(1);
        }
    }
}

mod commands;
