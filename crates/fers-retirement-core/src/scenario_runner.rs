//! Runs every scenario in a configuration through the projection engine
//! (C10), builds the pre-retirement baseline, and derives comparison
//! metrics: year-5/10 net income, lifetime present value, TSP longevity,
//! and a recommendation.

use chrono::{Datelike, NaiveDate};
use log::info;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::round_cents;
use crate::model::{Configuration, RetirementScenario};
use crate::projection::{project, AnnualCashFlow, DeterministicMarketPath};
use crate::FersResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub name: String,
    pub first_year_net_income: Decimal,
    pub year_5_net_income: Option<Decimal>,
    pub year_10_net_income: Option<Decimal>,
    pub total_lifetime_income: Decimal,
    pub tsp_longevity: usize,
    pub initial_tsp_balance: Decimal,
    pub final_tsp_balance: Decimal,
    pub net_income_2030: Option<Decimal>,
    pub net_income_2035: Option<Decimal>,
    pub net_income_2040: Option<Decimal>,
    pub rows: Vec<AnnualCashFlow>,
}

fn tsp_total(row: &AnnualCashFlow) -> Decimal {
    row.a.tsp_traditional_balance + row.a.tsp_roth_balance + row.b.tsp_traditional_balance + row.b.tsp_roth_balance
}

fn net_income_in_year(rows: &[AnnualCashFlow], year: i32) -> Option<Decimal> {
    rows.iter().find(|r| r.year == year).map(|r| r.net_income)
}

/// Present-value lifetime income at a fixed 3% discount rate.
fn total_lifetime_income(rows: &[AnnualCashFlow]) -> Decimal {
    let discount_rate = dec!(0.03);
    rows.iter()
        .enumerate()
        .map(|(y, row)| {
            let discount_factor = (Decimal::ONE + discount_rate).powi((y + 1) as i64);
            row.net_income / discount_factor
        })
        .sum()
}

fn tsp_longevity(rows: &[AnnualCashFlow]) -> usize {
    rows.iter()
        .position(|row| tsp_total(row) <= Decimal::ZERO)
        .unwrap_or(rows.len())
}

pub fn summarize(name: &str, rows: Vec<AnnualCashFlow>) -> ScenarioSummary {
    let first_year_net_income = rows
        .iter()
        .find(|r| r.is_retired)
        .map(|r| r.net_income)
        .unwrap_or(Decimal::ZERO);
    let initial_tsp_balance = rows.first().map(tsp_total).unwrap_or(Decimal::ZERO);
    let final_tsp_balance = rows.last().map(tsp_total).unwrap_or(Decimal::ZERO);

    ScenarioSummary {
        name: name.to_string(),
        first_year_net_income: round_cents(first_year_net_income),
        year_5_net_income: rows.get(4).map(|r| round_cents(r.net_income)),
        year_10_net_income: rows.get(9).map(|r| round_cents(r.net_income)),
        total_lifetime_income: round_cents(total_lifetime_income(&rows)),
        tsp_longevity: tsp_longevity(&rows),
        initial_tsp_balance: round_cents(initial_tsp_balance),
        final_tsp_balance: round_cents(final_tsp_balance),
        net_income_2030: net_income_in_year(&rows, 2030).map(round_cents),
        net_income_2035: net_income_in_year(&rows, 2035).map(round_cents),
        net_income_2040: net_income_in_year(&rows, 2040).map(round_cents),
        rows,
    }
}

/// First year index where A's cumulative net income reaches or exceeds B's,
/// or `None` if that never happens within the shorter horizon.
pub fn break_even_year(a: &[AnnualCashFlow], b: &[AnnualCashFlow]) -> Option<i32> {
    let mut cumulative_a = Decimal::ZERO;
    let mut cumulative_b = Decimal::ZERO;
    let len = a.len().min(b.len());
    for i in 0..len {
        cumulative_a += a[i].net_income;
        cumulative_b += b[i].net_income;
        if cumulative_a >= cumulative_b {
            return Some(a[i].year);
        }
    }
    None
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub scenario_name: String,
    pub delta_vs_baseline: Decimal,
    pub delta_pct_vs_baseline: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub baseline: ScenarioSummary,
    pub scenarios: Vec<ScenarioSummary>,
    pub recommendation: Option<Recommendation>,
}

/// Pushes every employee's retirement date past the end of the projection
/// horizon, yielding the pre-retirement "keep working" comparator.
fn baseline_retirements(original: &std::collections::BTreeMap<String, RetirementScenario>) -> std::collections::BTreeMap<String, RetirementScenario> {
    let far_future = NaiveDate::from_ymd_opt(9999, 12, 31).unwrap();
    original
        .iter()
        .map(|(key, retirement)| {
            (
                key.clone(),
                RetirementScenario {
                    retirement_date: far_future,
                    ss_start_age: retirement.ss_start_age,
                    withdrawal_strategy: retirement.withdrawal_strategy.clone(),
                },
            )
        })
        .collect()
}

/// Runs every scenario in `config` plus a shared "no-one-retires" baseline,
/// and recommends the scenario with the highest first-year net income.
pub fn run_all(config: &Configuration, start_year: i32) -> FersResult<ScenarioComparison> {
    let assumptions = &config.global_assumptions;
    let market_path = DeterministicMarketPath::from_assumptions(assumptions);

    let first_scenario_retirements = config
        .scenarios
        .first()
        .map(|s| &s.retirements)
        .cloned()
        .unwrap_or_default();
    let baseline_retirements = baseline_retirements(&first_scenario_retirements);
    info!("running baseline (no-one-retires) projection");
    let baseline_rows = project(&config.personal_details, &baseline_retirements, None, assumptions, &market_path, start_year)?;
    let baseline = summarize("baseline", baseline_rows);

    let mut summaries = Vec::with_capacity(config.scenarios.len());
    for scenario in &config.scenarios {
        info!("running scenario '{}'", scenario.name);
        let rows = project(
            &config.personal_details,
            &scenario.retirements,
            scenario.mortality.as_ref(),
            assumptions,
            &market_path,
            start_year,
        )?;
        summaries.push(summarize(&scenario.name, rows));
    }
    summaries.sort_by(|a, b| a.name.cmp(&b.name));

    let recommendation = summaries
        .iter()
        .max_by(|a, b| a.first_year_net_income.cmp(&b.first_year_net_income))
        .map(|best| {
            let delta = best.first_year_net_income - baseline.first_year_net_income;
            let delta_pct = if baseline.first_year_net_income.is_zero() {
                Decimal::ZERO
            } else {
                delta / baseline.first_year_net_income
            };
            Recommendation {
                scenario_name: best.name.clone(),
                delta_vs_baseline: round_cents(delta),
                delta_pct_vs_baseline: delta_pct,
            }
        });

    Ok(ScenarioComparison {
        baseline,
        scenarios: summaries,
        recommendation,
    })
}
