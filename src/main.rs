//! confx -- render config files from templates.
//!
//! Every `.toml` document in the config directory names a template, a
//! destination, and the sources its values come from.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use confx::Runner;

const DEFAULT_CONFIG_DIR: &str = "/etc/confx/conf.d";
const DEFAULT_TEMPLATE_DIR: &str = "/etc/confx/templates";

/// Render config files from templates
#[derive(Parser)]
#[command(name = "confx")]
#[command(version, about = "Render config files from templates with values from env and KV sources")]
struct Cli {
    /// Configuration directory
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,

    /// Template directory
    #[arg(short = 't', long, default_value = DEFAULT_TEMPLATE_DIR)]
    template_dir: PathBuf,

    /// Keep processing remaining documents after a failure
    #[arg(short = 'k', long)]
    keep_going: bool,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let report = Runner::builder()
        .with_config_dir(&cli.config_dir)
        .with_template_dir(&cli.template_dir)
        .keep_going(cli.keep_going)
        .build()?
        .run()?;

    if report.is_success() {
        return Ok(ExitCode::SUCCESS);
    }

    eprintln!(
        "{} of {} document(s) failed:",
        report.failed.len(),
        report.failed.len() + report.rendered.len()
    );
    for (_, err) in &report.failed {
        eprintln!("  {err}");
    }
    Ok(ExitCode::FAILURE)
}
