mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::approximate::ApproximateArgs;
use logging::LogFormat;

/// Approximate an ETF as a long-only blend of baseline ETFs
#[derive(Parser)]
#[command(
    name = "etfb",
    version,
    about = "Approximate an ETF as a long-only blend of baseline ETFs",
    long_about = "Finds the non-negative baseline weights, summing to one, whose blended \
                  holdings come closest (least squares) to a target ETF's holdings. \
                  Reads a self-contained JSON request or a holdings CSV/JSON file."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log filter when RUST_LOG is unset (e.g. "info", "etf_blend_core=debug")
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Log line format
    #[arg(long, default_value = "pretty", global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve for the baseline weights that best reproduce the target
    Approximate(ApproximateArgs),
    /// Show the resolved symbol universe without solving
    Universe(ApproximateArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_format);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Approximate(args) => commands::approximate::run_approximate(args),
        Commands::Universe(args) => commands::universe::run_universe(args),
        Commands::Version => {
            println!("etfb {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
