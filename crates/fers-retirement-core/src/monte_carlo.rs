//! Seeded, parallel Monte Carlo ensemble over the projection engine (C10).
//! Each trial builds its own market path — historical block-bootstrap or
//! statistical sampling — runs one full projection, and reports outcome
//! metrics; aggregation is order-independent because trial seeds are
//! derived deterministically from the root seed and reduced in trial-id
//! order.

use std::collections::BTreeMap;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;

use crate::decimal::round_cents;
use crate::error::FersError;
use crate::historical::{HistoricalDataset, HistoricalSeries};
use crate::model::{Employee, GlobalAssumptions, Mortality, RetirementScenario, TspAllocation};
use crate::projection::{project, AnnualCashFlow, MarketPath};
use crate::FersResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonteCarloMode {
    Historical,
    Statistical,
}

const RETURN_CLIP_MIN: f64 = -0.95;
const RETURN_CLIP_MAX: f64 = 2.0;
const INFLATION_CLIP_MIN: f64 = -0.05;
const INFLATION_CLIP_MAX: f64 = 0.20;
const BLOCK_LENGTH: usize = 5;
const FUND_ORDER: [HistoricalSeries; 5] = [
    HistoricalSeries::TspC,
    HistoricalSeries::TspS,
    HistoricalSeries::TspI,
    HistoricalSeries::TspF,
    HistoricalSeries::TspG,
];

/// A fully precomputed year-by-year market path: every draw (historical
/// lookup or statistical sample) happens once up front, so the `MarketPath`
/// trait implementation itself is a pure lookup.
struct PrecomputedMarketPath {
    tsp_fund_returns: Vec<[Decimal; 5]>,
    inflation: Vec<Decimal>,
    cola: Vec<Decimal>,
    cpi: Vec<Decimal>,
}

impl MarketPath for PrecomputedMarketPath {
    fn tsp_return(&self, year_index: usize, allocation: TspAllocation, _is_retired: bool) -> Decimal {
        let funds = self.tsp_fund_returns.get(year_index).copied().unwrap_or([Decimal::ZERO; 5]);
        allocation.c * funds[0] + allocation.s * funds[1] + allocation.i * funds[2] + allocation.f * funds[3] + allocation.g * funds[4]
    }

    fn inflation(&self, year_index: usize) -> Decimal {
        self.inflation.get(year_index).copied().unwrap_or(Decimal::ZERO)
    }

    fn cola(&self, year_index: usize) -> Decimal {
        self.cola.get(year_index).copied().unwrap_or(Decimal::ZERO)
    }

    fn cpi(&self, year_index: usize) -> Decimal {
        self.cpi.get(year_index).copied().unwrap_or(Decimal::ZERO)
    }
}

/// Splitmix64-style finalizer: derives a distinct, deterministic per-trial
/// seed from the root seed and trial index.
fn trial_seed(root: u64, trial_index: usize) -> u64 {
    let mut x = root ^ (trial_index as u64).wrapping_mul(0x9E3779B97F4A7C15);
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58476D1CE4E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D049BB133111EB);
    x ^= x >> 31;
    x
}

fn build_historical_path(rng: &mut StdRng, dataset: &HistoricalDataset, projection_years: usize) -> FersResult<PrecomputedMarketPath> {
    let (min_year, max_year) = dataset.year_range(HistoricalSeries::TspC).ok_or_else(|| FersError::DataMissingError {
        series: "tsp_c".to_string(),
        year: 0,
    })?;
    let span = (max_year - min_year + 1) as usize;

    let mut years = Vec::with_capacity(projection_years);
    while years.len() < projection_years {
        let start_offset = rng.gen_range(0..span);
        for i in 0..BLOCK_LENGTH {
            if years.len() >= projection_years {
                break;
            }
            years.push(min_year + ((start_offset + i) % span) as i32);
        }
    }

    let mut tsp_fund_returns = Vec::with_capacity(projection_years);
    let mut inflation = Vec::with_capacity(projection_years);
    let mut cola = Vec::with_capacity(projection_years);
    let mut cpi = Vec::with_capacity(projection_years);
    for &year in &years {
        let mut funds = [Decimal::ZERO; 5];
        for (i, series) in FUND_ORDER.iter().enumerate() {
            funds[i] = dataset.get(*series, year).map_err(|_| FersError::DataMissingError {
                series: format!("{series:?}"),
                year,
            })?;
        }
        tsp_fund_returns.push(funds);
        let cpi_value = dataset.get(HistoricalSeries::Cpi, year).unwrap_or(Decimal::ZERO);
        inflation.push(cpi_value);
        cpi.push(cpi_value);
        cola.push(dataset.get(HistoricalSeries::SsCola, year).unwrap_or(cpi_value));
    }

    Ok(PrecomputedMarketPath { tsp_fund_returns, inflation, cola, cpi })
}

fn clipped_normal(rng: &mut StdRng, mean: Decimal, std_dev: Decimal, min: f64, max: f64) -> Decimal {
    let mean_f = mean.to_f64().unwrap_or(0.0);
    let std_f = std_dev.to_f64().unwrap_or(0.0);
    let draw = if std_f > 0.0 {
        Normal::new(mean_f, std_f).map(|d| rng.sample(d)).unwrap_or(mean_f)
    } else {
        mean_f
    };
    let clamped = draw.clamp(min, max);
    Decimal::from_f64_retain(clamped).unwrap_or(mean)
}

fn build_statistical_path(rng: &mut StdRng, assumptions: &GlobalAssumptions, projection_years: usize) -> PrecomputedMarketPath {
    let stats = &assumptions.tsp_fund_stats;
    let fund_stats = [stats.c, stats.s, stats.i, stats.f, stats.g];
    let mut tsp_fund_returns = Vec::with_capacity(projection_years);
    let mut inflation = Vec::with_capacity(projection_years);
    let mut cola = Vec::with_capacity(projection_years);
    let mut cpi = Vec::with_capacity(projection_years);
    for _ in 0..projection_years {
        let mut funds = [Decimal::ZERO; 5];
        for (i, fs) in fund_stats.iter().enumerate() {
            funds[i] = clipped_normal(rng, fs.mean, fs.std_dev, RETURN_CLIP_MIN, RETURN_CLIP_MAX);
        }
        tsp_fund_returns.push(funds);
        inflation.push(clipped_normal(
            rng,
            assumptions.inflation_rate,
            assumptions.mc_variability.inflation_variability,
            INFLATION_CLIP_MIN,
            INFLATION_CLIP_MAX,
        ));
        let cola_draw = clipped_normal(
            rng,
            assumptions.cola_general_rate,
            assumptions.mc_variability.cola_variability,
            INFLATION_CLIP_MIN,
            INFLATION_CLIP_MAX,
        );
        cola.push(cola_draw);
        cpi.push(cola_draw);
    }
    PrecomputedMarketPath { tsp_fund_returns, inflation, cola, cpi }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NetIncomeMetrics {
    pub first: Decimal,
    pub y5: Decimal,
    pub y10: Decimal,
    pub min: Decimal,
    pub max: Decimal,
    pub mean: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TspMetrics {
    pub longevity: usize,
    pub depleted: bool,
}

/// One trial's full result: the metrics used for aggregation plus the
/// complete per-year cash flow sequence for the primary scenario, so a
/// caller can inspect any individual trial rather than only the ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub trial_id: usize,
    pub success: bool,
    pub net_income: NetIncomeMetrics,
    pub tsp: TspMetrics,
    pub rows: Vec<AnnualCashFlow>,
}

fn run_trial(
    trial_id: usize,
    seed: u64,
    mode: MonteCarloMode,
    employees: &BTreeMap<String, Employee>,
    retirements: &BTreeMap<String, RetirementScenario>,
    mortality: Option<&Mortality>,
    assumptions: &GlobalAssumptions,
    dataset: &HistoricalDataset,
    start_year: i32,
    success_threshold: Option<Decimal>,
) -> FersResult<SimulationOutcome> {
    let mut rng = StdRng::seed_from_u64(seed);
    let projection_years = assumptions.projection_years as usize;
    let market_path = match mode {
        MonteCarloMode::Historical => build_historical_path(&mut rng, dataset, projection_years)?,
        MonteCarloMode::Statistical => build_statistical_path(&mut rng, assumptions, projection_years),
    };

    let rows = project(employees, retirements, mortality, assumptions, &market_path, start_year)?;
    Ok(summarize_trial(trial_id, rows, success_threshold))
}

fn tsp_total(row: &AnnualCashFlow) -> Decimal {
    row.a.tsp_traditional_balance + row.a.tsp_roth_balance + row.b.tsp_traditional_balance + row.b.tsp_roth_balance
}

fn summarize_trial(trial_id: usize, rows: Vec<AnnualCashFlow>, success_threshold: Option<Decimal>) -> SimulationOutcome {
    let net_income_by_year: Vec<Decimal> = rows.iter().map(|r| r.net_income).collect();
    let tsp_total_by_year: Vec<Decimal> = rows.iter().map(tsp_total).collect();

    let first = rows.iter().find(|r| r.is_retired).map(|r| r.net_income).unwrap_or(Decimal::ZERO);
    let y5 = rows.get(4).map(|r| r.net_income).unwrap_or(Decimal::ZERO);
    let y10 = rows.get(9).map(|r| r.net_income).unwrap_or(Decimal::ZERO);
    let min = net_income_by_year.iter().copied().fold(Decimal::MAX, Decimal::min);
    let max = net_income_by_year.iter().copied().fold(Decimal::MIN, Decimal::max);
    let mean = if net_income_by_year.is_empty() {
        Decimal::ZERO
    } else {
        net_income_by_year.iter().sum::<Decimal>() / Decimal::from(net_income_by_year.len())
    };

    let longevity = tsp_total_by_year.iter().position(|v| *v <= Decimal::ZERO).unwrap_or(rows.len());
    let depleted = longevity < rows.len();

    let horizon_20 = 20.min(rows.len());
    let depleted_by_20 = longevity < horizon_20;
    let success = match success_threshold {
        Some(threshold) => min >= threshold,
        None => !depleted_by_20,
    };

    SimulationOutcome {
        trial_id,
        success,
        net_income: NetIncomeMetrics { first, y5, y10, min, max, mean },
        tsp: TspMetrics { longevity, depleted },
        rows,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Percentiles {
    pub p10: Decimal,
    pub p25: Decimal,
    pub p50: Decimal,
    pub p75: Decimal,
    pub p90: Decimal,
}

/// Linear-interpolation percentile over a sorted slice, `p` as a fraction
/// in `[0, 1]`: `i = p * (n - 1)`.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] + (rank - lower as f64) * (sorted[upper] - sorted[lower])
    }
}

fn percentiles_of(values: &[Decimal]) -> Percentiles {
    let mut as_f64: Vec<f64> = values.iter().map(|v| v.to_f64().unwrap_or(0.0)).collect();
    as_f64.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Percentiles {
        p10: Decimal::from_f64_retain(percentile(&as_f64, 0.10)).unwrap_or(Decimal::ZERO),
        p25: Decimal::from_f64_retain(percentile(&as_f64, 0.25)).unwrap_or(Decimal::ZERO),
        p50: Decimal::from_f64_retain(percentile(&as_f64, 0.50)).unwrap_or(Decimal::ZERO),
        p75: Decimal::from_f64_retain(percentile(&as_f64, 0.75)).unwrap_or(Decimal::ZERO),
        p90: Decimal::from_f64_retain(percentile(&as_f64, 0.90)).unwrap_or(Decimal::ZERO),
    }
}

fn std_dev_of(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let mean = values.iter().sum::<Decimal>() / Decimal::from(values.len());
    let variance = values.iter().map(|v| (*v - mean) * (*v - mean)).sum::<Decimal>() / Decimal::from(values.len());
    crate::historical::sqrt_decimal(variance)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearBand {
    pub year: i32,
    pub net_income_percentiles: Percentiles,
    pub tsp_percentiles: Percentiles,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub n: usize,
    pub n_effective: usize,
    pub skipped_trials: usize,
    pub success_rate: Decimal,
    pub median_net_income: Decimal,
    pub income_volatility: Decimal,
    pub tsp_depletion_rate: Decimal,
    pub net_income_percentiles: Percentiles,
    pub tsp_longevity_percentiles: Percentiles,
    pub year_bands: Vec<YearBand>,
    pub trials: Vec<SimulationOutcome>,
    pub warnings: Vec<String>,
}

/// Runs `n` independent trials and aggregates them in trial-id order, so
/// the result is bit-identical regardless of how `rayon` schedules work
/// across threads.
#[allow(clippy::too_many_arguments)]
pub fn run(
    employees: &BTreeMap<String, Employee>,
    retirements: &BTreeMap<String, RetirementScenario>,
    mortality: Option<&Mortality>,
    assumptions: &GlobalAssumptions,
    dataset: &HistoricalDataset,
    mode: MonteCarloMode,
    n: usize,
    seed: u64,
    start_year: i32,
    success_threshold: Option<Decimal>,
) -> FersResult<MonteCarloResult> {
    info!("running {n} Monte Carlo trials, mode={mode:?}, seed={seed}");
    let mut outcomes: Vec<(usize, FersResult<SimulationOutcome>)> = (0..n)
        .into_par_iter()
        .map(|trial_id| {
            let seed_t = trial_seed(seed, trial_id);
            let outcome = run_trial(trial_id, seed_t, mode, employees, retirements, mortality, assumptions, dataset, start_year, success_threshold);
            (trial_id, outcome)
        })
        .collect();
    outcomes.sort_by_key(|(id, _)| *id);

    let mut warnings = Vec::new();
    let mut trials: Vec<SimulationOutcome> = Vec::with_capacity(n);
    let mut skipped = 0;
    for (_, outcome) in outcomes {
        match outcome {
            Ok(trial) => trials.push(trial),
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("{skipped} of {n} Monte Carlo trials skipped due to missing historical data");
        warnings.push(format!("{skipped} of {n} trials skipped due to missing historical data"));
    }

    let n_effective = trials.len();
    if n_effective == 0 {
        warnings.push("all trials skipped; result has no effective sample".to_string());
        return Ok(MonteCarloResult {
            n,
            n_effective: 0,
            skipped_trials: skipped,
            success_rate: Decimal::ZERO,
            median_net_income: Decimal::ZERO,
            income_volatility: Decimal::ZERO,
            tsp_depletion_rate: Decimal::ZERO,
            net_income_percentiles: percentiles_of(&[]),
            tsp_longevity_percentiles: percentiles_of(&[]),
            year_bands: Vec::new(),
            trials: Vec::new(),
            warnings,
        });
    }

    let success_count = trials.iter().filter(|t| t.success).count();
    let depleted_count = trials.iter().filter(|t| t.tsp.depleted).count();
    let mean_incomes: Vec<Decimal> = trials.iter().map(|t| t.net_income.mean).collect();
    let net_income_percentiles = percentiles_of(&mean_incomes);
    let longevities: Vec<Decimal> = trials.iter().map(|t| Decimal::from(t.tsp.longevity)).collect();
    let tsp_longevity_percentiles = percentiles_of(&longevities);

    let projection_years = assumptions.projection_years as usize;
    let mut year_bands = Vec::with_capacity(projection_years);
    for y in 0..projection_years {
        let net_income_y: Vec<Decimal> = trials.iter().filter_map(|t| t.rows.get(y).map(|r| r.net_income)).collect();
        let tsp_y: Vec<Decimal> = trials.iter().filter_map(|t| t.rows.get(y).map(tsp_total)).collect();
        year_bands.push(YearBand {
            year: start_year + y as i32,
            net_income_percentiles: percentiles_of(&net_income_y),
            tsp_percentiles: percentiles_of(&tsp_y),
        });
    }

    Ok(MonteCarloResult {
        n,
        n_effective,
        skipped_trials: skipped,
        success_rate: round_cents(Decimal::from(success_count) / Decimal::from(n_effective)),
        median_net_income: round_cents(net_income_percentiles.p50),
        income_volatility: round_cents(std_dev_of(&mean_incomes)),
        tsp_depletion_rate: round_cents(Decimal::from(depleted_count) / Decimal::from(n_effective)),
        net_income_percentiles,
        tsp_longevity_percentiles,
        year_bands,
        trials,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FederalRules, MonteCarloVariability, TspFundStats, WithdrawalStrategy};
    use chrono::NaiveDate;

    fn sample_employee(name: &str, birth_year: i32) -> Employee {
        Employee {
            display_name: name.to_string(),
            birth_date: NaiveDate::from_ymd_opt(birth_year, 6, 15).unwrap(),
            hire_date: NaiveDate::from_ymd_opt(birth_year + 25, 3, 20).unwrap(),
            current_salary: dec!(110000),
            high3_salary: dec!(90000),
            tsp_traditional_balance: dec!(400000),
            tsp_roth_balance: dec!(10000),
            tsp_contribution_pct: dec!(0.05),
            ss_benefit_62: dec!(1700),
            ss_benefit_fra: dec!(2400),
            ss_benefit_70: dec!(3100),
            fehb_premium_per_pay_period: dec!(220),
            survivor_election_pct: dec!(0.50),
            sick_leave_hours: None,
            tsp_allocation: None,
        }
    }

    fn sample_inputs() -> (BTreeMap<String, Employee>, BTreeMap<String, RetirementScenario>, GlobalAssumptions) {
        let mut employees = BTreeMap::new();
        employees.insert("A".to_string(), sample_employee("A", 1963));
        employees.insert("B".to_string(), sample_employee("B", 1965));
        let mut retirements = BTreeMap::new();
        retirements.insert(
            "A".to_string(),
            RetirementScenario {
                retirement_date: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
                ss_start_age: 67,
                withdrawal_strategy: WithdrawalStrategy::FourPercent,
            },
        );
        retirements.insert(
            "B".to_string(),
            RetirementScenario {
                retirement_date: NaiveDate::from_ymd_opt(2028, 12, 31).unwrap(),
                ss_start_age: 67,
                withdrawal_strategy: WithdrawalStrategy::FourPercent,
            },
        );
        let assumptions = GlobalAssumptions {
            inflation_rate: dec!(0.025),
            fehb_premium_inflation: dec!(0.05),
            tsp_pre_retirement_return: dec!(0.07),
            tsp_post_retirement_return: dec!(0.05),
            cola_general_rate: dec!(0.025),
            projection_years: 10,
            location: "Pennsylvania".to_string(),
            federal_rules: FederalRules::default(),
            tsp_fund_stats: TspFundStats::default(),
            mc_variability: MonteCarloVariability::default(),
            default_allocation: TspAllocation::all_g(),
        };
        (employees, retirements, assumptions)
    }

    #[test]
    fn test_statistical_mode_is_deterministic_given_seed() {
        let (employees, retirements, assumptions) = sample_inputs();
        let dataset = HistoricalDataset::embedded();
        let r1 = run(&employees, &retirements, None, &assumptions, &dataset, MonteCarloMode::Statistical, 50, 12345, 2025, None).unwrap();
        let r2 = run(&employees, &retirements, None, &assumptions, &dataset, MonteCarloMode::Statistical, 50, 12345, 2025, None).unwrap();
        assert_eq!(r1.success_rate, r2.success_rate);
        assert_eq!(r1.median_net_income, r2.median_net_income);
        assert_eq!(r1.net_income_percentiles.p50, r2.net_income_percentiles.p50);
    }

    #[test]
    fn test_historical_mode_runs_without_skips_on_embedded_dataset() {
        let (employees, retirements, assumptions) = sample_inputs();
        let dataset = HistoricalDataset::embedded();
        let result = run(&employees, &retirements, None, &assumptions, &dataset, MonteCarloMode::Historical, 20, 777, 2025, None).unwrap();
        assert_eq!(result.n_effective, 20);
        assert_eq!(result.skipped_trials, 0);
    }

    #[test]
    fn test_percentile_ordering_holds() {
        let (employees, retirements, assumptions) = sample_inputs();
        let dataset = HistoricalDataset::embedded();
        let result = run(&employees, &retirements, None, &assumptions, &dataset, MonteCarloMode::Statistical, 50, 99, 2025, None).unwrap();
        let p = result.net_income_percentiles;
        assert!(p.p10 <= p.p25);
        assert!(p.p25 <= p.p50);
        assert!(p.p50 <= p.p75);
        assert!(p.p75 <= p.p90);
    }

    #[test]
    fn test_year_bands_cover_full_horizon() {
        let (employees, retirements, assumptions) = sample_inputs();
        let dataset = HistoricalDataset::embedded();
        let result = run(&employees, &retirements, None, &assumptions, &dataset, MonteCarloMode::Statistical, 30, 55, 2025, None).unwrap();
        assert_eq!(result.year_bands.len(), 10);
    }
}
