//! # provision-cli
//!
//! Command line front end for install list resolution.
//!
//! Parses the command, layers resolver settings, sets up logging and
//! dispatches to the command handlers. Errors are reported with
//! suggestions and their source chain.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Filter used by `--verbose`
const VERBOSE_FILTER: &str =
    "provision=debug,provision_core=debug,provision_catalog=debug,provision_config=debug,provision_resolver=debug";

/// Resolve feature and sample install lists from catalog manifests
#[derive(Parser)]
#[command(name = "provision", version, about = "Resolve feature and sample install lists")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit log records as JSON
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve names into ordered install lists
    Resolve {
        /// Feature names, short names, `name/version` or sample short names
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,
        /// Fail on conflicting singleton versions
        #[arg(long)]
        strict: bool,
        /// Catalog manifest to load, repeatable
        #[arg(long = "catalog", value_name = "FILE")]
        catalogs: Vec<PathBuf>,
        /// Feature strict resolution must not select, repeatable
        #[arg(long = "exclude", value_name = "NAME")]
        exclude: Vec<String>,
        /// Print install lists as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load and validate catalog manifests
    Check {
        /// Catalog manifest to load, repeatable
        #[arg(long = "catalog", value_name = "FILE")]
        catalogs: Vec<PathBuf>,
    },
    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    setup_panic_handler();

    if let Err(e) = run_cli(cli) {
        let formatter = ErrorFormatter::new();
        match e.downcast_ref::<provision_core::error::ProvisionError>() {
            Some(error) => eprint!("{}", formatter.format_error(error)),
            None => eprintln!("{}", formatter.format_simple(&format!("{e:#}"))),
        }
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let ctx = CommandContext::load(&cli.command)?;
    setup_logging(ctx.settings.log.as_deref(), cli.verbose, cli.log_json);

    info!("Starting provision v{}", env!("CARGO_PKG_VERSION"));
    commands::dispatch_command(cli.command, &ctx)?;
    Ok(())
}

fn setup_logging(directive: Option<&str>, verbose: bool, json: bool) {
    let mut invalid = None;
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        match directive {
            Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|e| {
                invalid = Some(format!("{directive}: {e}"));
                EnvFilter::new("warn")
            }),
            None => EnvFilter::new("warn"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    if let Some(invalid) = invalid {
        tracing::warn!("Ignoring invalid log filter {}", invalid);
    }
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("provision encountered an unexpected error: {}", panic_info);
        eprintln!("provision crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/provision-rs/provision/issues");
        eprintln!("Error: {panic_info}");
    }));
}
