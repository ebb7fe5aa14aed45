use chrono::Datelike;
use clap::{Args, ValueEnum};
use fers_retirement_core::historical::HistoricalDataset;
use fers_retirement_core::model::Configuration;
use fers_retirement_core::monte_carlo::{self, MonteCarloMode};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MonteCarloModeArg {
    Historical,
    Statistical,
}

impl From<MonteCarloModeArg> for MonteCarloMode {
    fn from(arg: MonteCarloModeArg) -> Self {
        match arg {
            MonteCarloModeArg::Historical => MonteCarloMode::Historical,
            MonteCarloModeArg::Statistical => MonteCarloMode::Statistical,
        }
    }
}

/// Arguments for the Monte Carlo ensemble
#[derive(Args)]
pub struct MonteCarloArgs {
    /// Path to JSON configuration file
    #[arg(long)]
    pub input: Option<String>,

    /// Name of the scenario (from the configuration's `scenarios` list) to run
    #[arg(long)]
    pub scenario: String,

    /// Number of trials
    #[arg(long, default_value_t = 1000)]
    pub trials: usize,

    /// Root RNG seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Sampling mode
    #[arg(long, value_enum, default_value_t = MonteCarloModeArg::Statistical)]
    pub mode: MonteCarloModeArg,

    /// First projection year; defaults to the current calendar year
    #[arg(long)]
    pub start_year: Option<i32>,

    /// Trial succeeds only if every year's net income meets this floor,
    /// instead of the default "TSP not depleted by year 20" rule
    #[arg(long)]
    pub success_threshold: Option<Decimal>,
}

pub fn run_monte_carlo(args: MonteCarloArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config: Configuration = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for the Monte Carlo ensemble".into());
    };
    config.validate()?;

    let scenario = config
        .scenarios
        .iter()
        .find(|s| s.name == args.scenario)
        .ok_or_else(|| format!("no scenario named '{}' in configuration", args.scenario))?;

    let start_year = args.start_year.unwrap_or_else(|| chrono::Local::now().year());
    let dataset = HistoricalDataset::embedded();

    let result = monte_carlo::run(
        &config.personal_details,
        &scenario.retirements,
        scenario.mortality.as_ref(),
        &config.global_assumptions,
        &dataset,
        args.mode.into(),
        args.trials,
        args.seed,
        start_year,
        args.success_threshold,
    )?;
    Ok(serde_json::to_value(result)?)
}
