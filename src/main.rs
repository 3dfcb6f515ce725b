//! kbuild CLI
//!
//! Entry point for the `kbuild` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use kbuild::config::{self, KbuildConfig};
use kbuild::registry::Registry;
use kbuild::{preflight, KernelUpdater, SystemRunner, UpdateError, UpdateMode};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kbuild")]
#[command(about = "Build and install a new kernel, then retire old ones", version)]
struct Cli {
    /// Use the .config already in the source tree instead of the newest installed one
    #[arg(long, short = 'm', conflicts_with_all = ["clean_only", "list"])]
    manual_edit: bool,

    /// Only delete old kernels
    #[arg(long, short = 'c', conflicts_with = "list")]
    clean_only: bool,

    /// List installed kernels, newest first, and exit
    #[arg(long, short = 'l')]
    list: bool,

    /// Output the list in JSON format
    #[arg(long, requires = "list")]
    json: bool,

    /// Show what retention would delete without deleting anything
    #[arg(long)]
    dry_run: bool,

    /// Number of kernel versions to keep (overrides the config file)
    #[arg(long, value_name = "N")]
    keep: Option<usize>,

    /// Path to config file (default: ./kbuild.toml, then ~/.config/kbuild.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Cli {
    fn mode(&self) -> UpdateMode {
        if self.clean_only {
            UpdateMode::CleanOnly
        } else if self.manual_edit {
            UpdateMode::ManualConfig
        } else {
            UpdateMode::Full
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<i32, UpdateError> {
    let path = config::locate(cli.config.as_deref())?;
    let overrides = cli.keep.map(KbuildConfig::keep_override);
    let config = KbuildConfig::load(&path, overrides)?;
    tracing::debug!(path = %path.display(), "loaded configuration");

    if cli.list {
        return run_list(&config, cli.json);
    }

    let mode = cli.mode();
    // A clean-only dry run reads /boot and nothing else.
    if !(cli.dry_run && mode == UpdateMode::CleanOnly) {
        preflight::require_root()?;
    }

    let mut updater = KernelUpdater::from_config(&config, SystemRunner);
    if cli.dry_run {
        updater = updater.with_dry_run();
    }
    updater.preflight(mode)?;

    let outcome = updater.run(mode)?;

    let Some(report) = outcome.retention else {
        return Ok(0);
    };
    print!("{}", report.to_human());
    if report.is_clean() {
        Ok(0)
    } else {
        Ok(1)
    }
}

fn run_list(config: &KbuildConfig, json: bool) -> Result<i32, UpdateError> {
    let layout = config.layout();
    let registry = Registry::discover(layout.install_dir(), &config.naming())?;

    if json {
        match registry.to_json() {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                return Ok(1);
            }
        }
    } else {
        println!("{}", registry.to_human().trim_end());
    }
    Ok(0)
}
