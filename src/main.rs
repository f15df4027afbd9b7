#![forbid(unsafe_code)]
//! cake-magic Command Line Interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use magic::commands::{execute_apply, execute_init, ApplyOptions, InitOptions};
use magic::config::DEFAULT_CONFIG_FILE;
use magic::Config;

#[derive(Parser)]
#[command(name = "cake-magic")]
#[command(about = "Add @property annotations for CakePHP magic properties")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file with the default transform table
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Add missing @property annotations
    Apply {
        /// Files or directories to process
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Remove existing @property lines before adding the current set
        #[arg(long)]
        remove: bool,

        /// Print a unified diff of every change
        #[arg(long)]
        diff: bool,

        /// Number of parallel workers
        #[arg(short = 'j', long, env = "CAKE_MAGIC_WORKERS")]
        workers: Option<usize>,
    },
}

/// Log to stderr; RUST_LOG overrides the level chosen by -v / -q
fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Init { force } => {
            let options = InitOptions {
                config_path: cli.config,
                force,
            };
            execute_init(options)?;
        }

        Commands::Apply {
            sources,
            dry_run,
            remove,
            diff,
            workers,
        } => {
            let config = match Config::load_or_default(&cli.config) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("{} {}", style("✗").red(), e);
                    std::process::exit(2);
                }
            };

            let options = ApplyOptions {
                sources,
                dry_run,
                remove,
                diff,
                workers,
            };
            let outcome = match execute_apply(options, config) {
                Ok(outcome) => outcome,
                Err(e) => {
                    eprintln!("{} {}", style("✗").red(), e);
                    std::process::exit(2);
                }
            };
            std::process::exit(outcome.exit_code());
        }
    }

    Ok(())
}
