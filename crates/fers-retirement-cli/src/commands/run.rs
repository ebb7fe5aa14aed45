use chrono::Datelike;
use clap::Args;
use fers_retirement_core::model::Configuration;
use fers_retirement_core::scenario_runner;
use serde_json::Value;

use crate::input;

/// Arguments for the scenario comparison run
#[derive(Args)]
pub struct RunArgs {
    /// Path to JSON configuration file
    #[arg(long)]
    pub input: Option<String>,

    /// First projection year; defaults to the current calendar year
    #[arg(long)]
    pub start_year: Option<i32>,
}

pub fn run_scenarios(args: RunArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config: Configuration = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for the scenario run".into());
    };
    config.validate()?;

    let start_year = args.start_year.unwrap_or_else(|| chrono::Local::now().year());
    let comparison = scenario_runner::run_all(&config, start_year)?;
    Ok(serde_json::to_value(comparison)?)
}
