//! livepack - Package a running Java process into a relocatable directory
//!
//! Finds a local JVM, reads its startup parameters with `jcmd`, and produces a
//! directory with a trimmed runtime, every classpath entry, and a launcher
//! script that can be double-clicked on another machine.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use livepack::core::{
    locator, ConsoleSelector, FirstMatchSelector, PackConfig, PidSelector, Pipeline,
    ProcessLocator, ProcessSelector, SystemRunner,
};
use livepack::{APP_NAME, APP_VERSION};

#[derive(Parser)]
#[command(name = "livepack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Package a running Java process into a relocatable directory", long_about = None)]
struct Cli {
    /// Config file (JSON); defaults to the user config directory
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Package the process with this pid without prompting
    #[arg(long, conflicts_with = "first")]
    pid: Option<u32>,

    /// Package the first matching process without prompting
    #[arg(long)]
    first: bool,

    /// Do not regenerate the runtime image
    #[arg(long)]
    skip_runtime_image: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.verbose);
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(cli.verbose || config.debug_logging);

    info!("{} v{} starting...", APP_NAME, APP_VERSION);

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Build the one configuration value used for the whole run
fn load_config(cli: &Cli) -> Result<PackConfig> {
    let mut config = match cli.config {
        Some(ref path) => PackConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PackConfig::load_or_default().context("Failed to load default config")?,
    };
    if cli.skip_runtime_image {
        config.build_runtime_image = false;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli, config: &PackConfig) -> Result<()> {
    let mut locator = ProcessLocator::new(config.process_filter.clone(), config.main_class.clone());
    let candidates = locator.candidates();

    let selector: Box<dyn ProcessSelector> = match (cli.pid, cli.first) {
        (Some(pid), _) => Box::new(PidSelector(pid)),
        (None, true) => Box::new(FirstMatchSelector),
        (None, false) => Box::new(ConsoleSelector),
    };
    let handle = locator::select_process(candidates, selector.as_ref())?;

    let runner = SystemRunner::new(config.tool_timeout());
    let summary = Pipeline::new(config, &runner)
        .run(&handle)
        .with_context(|| format!("Failed to package process {}", handle.id))?;

    if !summary.mirror.is_complete() {
        warn!(
            "{} entries missing, {} failed to copy; the package may be incomplete",
            summary.mirror.skipped.len(),
            summary.mirror.failed.len()
        );
    }
    info!(
        "Packaged {} into {}",
        summary.main_class,
        summary.pack_dir.display()
    );
    println!("{}", summary.launcher_path.display());
    Ok(())
}

/// Initialize the logging system
fn init_logging(verbose: bool) {
    let default = if verbose {
        "livepack=debug"
    } else {
        "livepack=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
