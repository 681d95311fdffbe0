use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use durable_clock::{ClockConfig, Result};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dclock")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Crash-recoverable stopwatch", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (default: ./dclock.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding clock state (overrides the config file)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a clock and control it interactively
    Run {
        /// Clock ID (a new one is generated when omitted)
        id: Option<String>,
    },

    /// Show the saved state of a clock without opening it
    Status {
        /// Clock ID
        id: String,

        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },

    /// Delete all saved state of a clock
    Destroy {
        /// Clock ID
        id: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    // Default stays quiet so log lines do not break the live display
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<ClockConfig> {
    let mut config = match &cli.config {
        Some(path) => ClockConfig::load(path)?,
        None => ClockConfig::load_or_default(&std::env::current_dir()?)?,
    };
    if let Some(dir) = &cli.state_dir {
        config.state_dir = dir.clone();
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = &cli.command {
        generate(*shell, &mut Cli::command(), "dclock", &mut io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    tracing::debug!(state_dir = %config.state_dir.display(), "configuration loaded");

    match &cli.command {
        Commands::Run { id } => {
            durable_clock::cli::run::run(id.as_deref(), &config)?;
        }

        Commands::Status { id, json } => {
            durable_clock::cli::status::run(id, *json, &config)?;
        }

        Commands::Destroy { id } => {
            durable_clock::cli::destroy::run(id, &config)?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
