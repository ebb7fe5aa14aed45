mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::monte_carlo::{run_monte_carlo, MonteCarloArgs};
use commands::run::{run_scenarios, RunArgs};

/// FERS household retirement projection and Monte Carlo engine
#[derive(Parser)]
#[command(
    name = "fers",
    version,
    about = "FERS household retirement projection and Monte Carlo engine",
    long_about = "A CLI for projecting FERS household retirement cash flow with decimal \
                  precision. Loads a JSON configuration, runs the scenario comparison engine, \
                  and optionally runs a seeded Monte Carlo ensemble."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every scenario in a configuration plus the pre-retirement baseline
    Run(RunArgs),
    /// Run a seeded Monte Carlo ensemble for one scenario in a configuration
    MonteCarlo(MonteCarloArgs),
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
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Run(args) => run_scenarios(args),
        Commands::MonteCarlo(args) => run_monte_carlo(args),
        Commands::Version => {
            println!("fers {}", env!("CARGO_PKG_VERSION"));
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
