//! ionroute Command-Line Interface
//!
//! Routes circuits onto multi-zone trapped-ion architectures and inspects
//! the built-in trap layouts.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{archs, inspect, route, version};

/// ionroute - qubit routing for multi-zone trapped-ion traps
#[derive(Parser)]
#[command(name = "ionroute")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route a circuit onto a trap architecture
    Route {
        /// Input circuit (JSON)
        #[arg(short, long)]
        input: String,

        /// Architecture name or path to a JSON/YAML architecture file
        #[arg(short, long, default_value = "four_zones_in_a_line")]
        arch: String,

        /// Compilation settings file (JSON or YAML)
        #[arg(short, long, env = "IONROUTE_SETTINGS")]
        settings: Option<String>,

        /// Output file for the routed circuit (JSON)
        #[arg(short, long)]
        output: Option<String>,

        /// Replay the routed circuit and check every gate placement
        #[arg(long)]
        validate: bool,
    },

    /// List the built-in architectures
    Archs,

    /// Print zones and connections of an architecture
    Inspect {
        /// Architecture name or path to a JSON/YAML architecture file
        arch: String,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Route {
            input,
            arch,
            settings,
            output,
            validate,
        } => route::execute(&input, &arch, settings.as_deref(), output.as_deref(), validate),

        Commands::Archs => archs::execute(),

        Commands::Inspect { arch } => inspect::execute(&arch),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
