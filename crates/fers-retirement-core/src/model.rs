//! Household configuration: employees, global assumptions, scenarios, and
//! the federal-rules tables the tax and benefits calculators key off of.
//! This is the data the projection engine consumes; it never mutates any of
//! it in place — each scenario run clones what it needs.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FersError;
use crate::historical::HistoricalDataset;
use crate::FersResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilingStatus {
    #[serde(rename = "mfj")]
    Mfj,
    #[serde(rename = "single")]
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum WithdrawalStrategy {
    FourPercent,
    NeedBased { target_monthly: Decimal },
    VariablePercentage { rate: Decimal },
}

impl WithdrawalStrategy {
    pub fn validate(&self) -> FersResult<()> {
        match self {
            WithdrawalStrategy::FourPercent => Ok(()),
            WithdrawalStrategy::NeedBased { target_monthly } if *target_monthly > Decimal::ZERO => {
                Ok(())
            }
            WithdrawalStrategy::NeedBased { .. } => Err(FersError::ConfigurationError {
                field: "withdrawal_strategy.target_monthly".to_string(),
                reason: "must be > 0 for a need-based strategy".to_string(),
            }),
            WithdrawalStrategy::VariablePercentage { rate }
                if *rate >= Decimal::ZERO && *rate <= dec!(0.20) =>
            {
                Ok(())
            }
            WithdrawalStrategy::VariablePercentage { .. } => Err(FersError::ConfigurationError {
                field: "withdrawal_strategy.rate".to_string(),
                reason: "must be within [0, 0.20] for a variable-percentage strategy".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TspSpousalTransfer {
    Merge,
    Separate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatusSwitch {
    NextYear,
    Immediate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TspAllocation {
    pub c: Decimal,
    pub s: Decimal,
    pub i: Decimal,
    pub f: Decimal,
    pub g: Decimal,
}

impl TspAllocation {
    pub fn all_g() -> Self {
        TspAllocation {
            c: Decimal::ZERO,
            s: Decimal::ZERO,
            i: Decimal::ZERO,
            f: Decimal::ZERO,
            g: Decimal::ONE,
        }
    }

    pub fn sum(&self) -> Decimal {
        self.c + self.s + self.i + self.f + self.g
    }

    pub fn validate(&self, field: &str) -> FersResult<()> {
        if (self.sum() - Decimal::ONE).abs() > dec!(0.0001) {
            return Err(FersError::ConfigurationError {
                field: field.to_string(),
                reason: format!("allocation components must sum to 1, got {}", self.sum()),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub display_name: String,
    pub birth_date: NaiveDate,
    pub hire_date: NaiveDate,
    pub current_salary: Decimal,
    pub high3_salary: Decimal,
    pub tsp_traditional_balance: Decimal,
    pub tsp_roth_balance: Decimal,
    pub tsp_contribution_pct: Decimal,
    pub ss_benefit_62: Decimal,
    pub ss_benefit_fra: Decimal,
    pub ss_benefit_70: Decimal,
    pub fehb_premium_per_pay_period: Decimal,
    pub survivor_election_pct: Decimal,
    #[serde(default)]
    pub sick_leave_hours: Option<Decimal>,
    #[serde(default)]
    pub tsp_allocation: Option<TspAllocation>,
}

impl Employee {
    pub fn validate(&self, key: &str) -> FersResult<()> {
        let err = |reason: String| {
            Err(FersError::ConfigurationError {
                field: format!("personal_details.{key}"),
                reason,
            })
        };
        if self.birth_date > self.hire_date {
            return err("birth_date must be on or before hire_date".to_string());
        }
        for (label, v) in [
            ("tsp_traditional_balance", self.tsp_traditional_balance),
            ("tsp_roth_balance", self.tsp_roth_balance),
            ("current_salary", self.current_salary),
            ("high3_salary", self.high3_salary),
            ("fehb_premium_per_pay_period", self.fehb_premium_per_pay_period),
        ] {
            if v < Decimal::ZERO {
                return err(format!("{label} must be >= 0"));
            }
        }
        if !(Decimal::ZERO..=Decimal::ONE).contains(&self.tsp_contribution_pct) {
            return err("tsp_contribution_pct must be within [0, 1]".to_string());
        }
        if !matches!(self.survivor_election_pct, v if v == Decimal::ZERO || v == dec!(0.25) || v == dec!(0.50))
        {
            return err("survivor_election_pct must be 0, 0.25, or 0.50".to_string());
        }
        if !(self.ss_benefit_62 <= self.ss_benefit_fra && self.ss_benefit_fra <= self.ss_benefit_70) {
            return err("ss_benefit_62 <= ss_benefit_fra <= ss_benefit_70 must hold".to_string());
        }
        if let Some(alloc) = self.tsp_allocation {
            alloc.validate(&format!("personal_details.{key}.tsp_allocation"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxBracket {
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrmaaTier {
    pub magi_threshold: Decimal,
    pub monthly_surcharge: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederalRules {
    pub brackets_mfj: Vec<TaxBracket>,
    pub brackets_single: Vec<TaxBracket>,
    pub standard_deduction_mfj: Decimal,
    pub standard_deduction_single: Decimal,
    pub senior_add_on: Decimal,
    pub ss_taxable_threshold_1_mfj: Decimal,
    pub ss_taxable_threshold_2_mfj: Decimal,
    pub ss_taxable_threshold_1_single: Decimal,
    pub ss_taxable_threshold_2_single: Decimal,
    pub ss_wage_base: Decimal,
    pub fica_ss_rate: Decimal,
    pub fica_medicare_rate: Decimal,
    pub fica_additional_medicare_rate: Decimal,
    pub fica_high_income_threshold_mfj: Decimal,
    pub medicare_part_b_base_monthly: Decimal,
    pub medicare_irmaa_tiers_joint: Vec<IrmaaTier>,
    pub medicare_irmaa_tiers_single: Vec<IrmaaTier>,
    pub fehb_pay_periods_per_year: u32,
    pub fers_match_rate: Decimal,
    pub fers_match_threshold_pct: Decimal,
    pub local_eit_rate: Decimal,
    pub state_tax_rate: Decimal,
}

impl Default for FederalRules {
    /// 2025 federal parameters, matching the golden scenarios in this
    /// crate's test suite.
    fn default() -> Self {
        FederalRules {
            brackets_mfj: vec![
                TaxBracket { upper_bound: Some(dec!(23200)), rate: dec!(0.10) },
                TaxBracket { upper_bound: Some(dec!(94300)), rate: dec!(0.12) },
                TaxBracket { upper_bound: Some(dec!(201050)), rate: dec!(0.22) },
                TaxBracket { upper_bound: Some(dec!(383900)), rate: dec!(0.24) },
                TaxBracket { upper_bound: Some(dec!(487450)), rate: dec!(0.32) },
                TaxBracket { upper_bound: Some(dec!(731200)), rate: dec!(0.35) },
                TaxBracket { upper_bound: None, rate: dec!(0.37) },
            ],
            brackets_single: vec![
                TaxBracket { upper_bound: Some(dec!(11600)), rate: dec!(0.10) },
                TaxBracket { upper_bound: Some(dec!(47150)), rate: dec!(0.12) },
                TaxBracket { upper_bound: Some(dec!(100525)), rate: dec!(0.22) },
                TaxBracket { upper_bound: Some(dec!(191950)), rate: dec!(0.24) },
                TaxBracket { upper_bound: Some(dec!(243725)), rate: dec!(0.32) },
                TaxBracket { upper_bound: Some(dec!(609350)), rate: dec!(0.35) },
                TaxBracket { upper_bound: None, rate: dec!(0.37) },
            ],
            standard_deduction_mfj: dec!(29200),
            standard_deduction_single: dec!(14600),
            senior_add_on: dec!(1550),
            ss_taxable_threshold_1_mfj: dec!(32000),
            ss_taxable_threshold_2_mfj: dec!(44000),
            ss_taxable_threshold_1_single: dec!(25000),
            ss_taxable_threshold_2_single: dec!(34000),
            ss_wage_base: dec!(168600),
            fica_ss_rate: dec!(0.062),
            fica_medicare_rate: dec!(0.0145),
            fica_additional_medicare_rate: dec!(0.009),
            fica_high_income_threshold_mfj: dec!(250000),
            medicare_part_b_base_monthly: dec!(174.70),
            medicare_irmaa_tiers_joint: vec![
                IrmaaTier { magi_threshold: dec!(206000), monthly_surcharge: dec!(69.90) },
                IrmaaTier { magi_threshold: dec!(258000), monthly_surcharge: dec!(174.70) },
                IrmaaTier { magi_threshold: dec!(322000), monthly_surcharge: dec!(279.50) },
                IrmaaTier { magi_threshold: dec!(386000), monthly_surcharge: dec!(384.30) },
                IrmaaTier { magi_threshold: dec!(750000), monthly_surcharge: dec!(419.30) },
            ],
            medicare_irmaa_tiers_single: vec![
                IrmaaTier { magi_threshold: dec!(103000), monthly_surcharge: dec!(69.90) },
                IrmaaTier { magi_threshold: dec!(129000), monthly_surcharge: dec!(174.70) },
                IrmaaTier { magi_threshold: dec!(161000), monthly_surcharge: dec!(279.50) },
                IrmaaTier { magi_threshold: dec!(193000), monthly_surcharge: dec!(384.30) },
                IrmaaTier { magi_threshold: dec!(500000), monthly_surcharge: dec!(419.30) },
            ],
            fehb_pay_periods_per_year: 26,
            fers_match_rate: dec!(0.05),
            fers_match_threshold_pct: dec!(0.05),
            local_eit_rate: dec!(0.01),
            state_tax_rate: dec!(0.0307),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TspFundStat {
    pub mean: Decimal,
    pub std_dev: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TspFundStats {
    pub c: TspFundStat,
    pub s: TspFundStat,
    pub i: TspFundStat,
    pub f: TspFundStat,
    pub g: TspFundStat,
}

impl Default for TspFundStats {
    fn default() -> Self {
        TspFundStats {
            c: TspFundStat { mean: dec!(0.10), std_dev: dec!(0.17) },
            s: TspFundStat { mean: dec!(0.11), std_dev: dec!(0.20) },
            i: TspFundStat { mean: dec!(0.07), std_dev: dec!(0.18) },
            f: TspFundStat { mean: dec!(0.04), std_dev: dec!(0.06) },
            g: TspFundStat { mean: dec!(0.025), std_dev: dec!(0.01) },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MonteCarloVariability {
    pub inflation_variability: Decimal,
    pub cola_variability: Decimal,
}

impl Default for MonteCarloVariability {
    fn default() -> Self {
        MonteCarloVariability {
            inflation_variability: dec!(0.01),
            cola_variability: dec!(0.01),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalAssumptions {
    pub inflation_rate: Decimal,
    pub fehb_premium_inflation: Decimal,
    pub tsp_pre_retirement_return: Decimal,
    pub tsp_post_retirement_return: Decimal,
    pub cola_general_rate: Decimal,
    pub projection_years: u32,
    pub location: String,
    pub federal_rules: FederalRules,
    pub tsp_fund_stats: TspFundStats,
    pub mc_variability: MonteCarloVariability,
    pub default_allocation: TspAllocation,
}

impl GlobalAssumptions {
    pub fn validate(&self) -> FersResult<()> {
        if self.projection_years == 0 || self.projection_years > 50 {
            return Err(FersError::ConfigurationError {
                field: "global_assumptions.projection_years".to_string(),
                reason: "must be within [1, 50]".to_string(),
            });
        }
        self.default_allocation
            .validate("global_assumptions.default_allocation")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetirementScenario {
    pub retirement_date: NaiveDate,
    pub ss_start_age: u32,
    pub withdrawal_strategy: WithdrawalStrategy,
}

impl RetirementScenario {
    pub fn validate(&self, field: &str) -> FersResult<()> {
        if !(62..=70).contains(&self.ss_start_age) {
            return Err(FersError::ConfigurationError {
                field: format!("{field}.ss_start_age"),
                reason: "must be within [62, 70]".to_string(),
            });
        }
        self.withdrawal_strategy.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonMortality {
    pub death_date: Option<NaiveDate>,
    pub death_age: Option<i32>,
}

impl PersonMortality {
    pub fn validate(&self, field: &str) -> FersResult<()> {
        match (self.death_date, self.death_age) {
            (Some(_), Some(_)) | (None, None) => Err(FersError::ConfigurationError {
                field: field.to_string(),
                reason: "exactly one of death_date or death_age must be set".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mortality {
    #[serde(default)]
    pub events: BTreeMap<String, PersonMortality>,
    #[serde(default = "default_spending_factor")]
    pub survivor_spending_factor: Decimal,
    pub tsp_spousal_transfer: TspSpousalTransfer,
    pub filing_status_switch: FilingStatusSwitch,
}

fn default_spending_factor() -> Decimal {
    Decimal::ONE
}

impl Mortality {
    pub fn validate(&self, scenario_name: &str, employee_keys: &[String]) -> FersResult<()> {
        if !(dec!(0.4)..=dec!(1.0)).contains(&self.survivor_spending_factor) {
            return Err(FersError::ConfigurationError {
                field: format!("scenarios.{scenario_name}.mortality.survivor_spending_factor"),
                reason: "must be within [0.4, 1.0]".to_string(),
            });
        }
        for (key, event) in &self.events {
            if !employee_keys.contains(key) {
                return Err(FersError::ConfigurationError {
                    field: format!("scenarios.{scenario_name}.mortality.events.{key}"),
                    reason: "references an employee not present in personal_details".to_string(),
                });
            }
            event.validate(&format!("scenarios.{scenario_name}.mortality.events.{key}"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub retirements: BTreeMap<String, RetirementScenario>,
    #[serde(default)]
    pub mortality: Option<Mortality>,
}

impl Scenario {
    pub fn validate(&self, employee_keys: &[String]) -> FersResult<()> {
        for (key, retirement) in &self.retirements {
            if !employee_keys.contains(key) {
                return Err(FersError::ConfigurationError {
                    field: format!("scenarios.{}.retirements.{key}", self.name),
                    reason: "references an employee not present in personal_details".to_string(),
                });
            }
            retirement.validate(&format!("scenarios.{}.retirements.{key}", self.name))?;
        }
        if let Some(mortality) = &self.mortality {
            mortality.validate(&self.name, employee_keys)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub personal_details: BTreeMap<String, Employee>,
    pub global_assumptions: GlobalAssumptions,
    pub scenarios: Vec<Scenario>,
}

impl Configuration {
    pub fn from_json_str(text: &str) -> FersResult<Configuration> {
        let config: Configuration = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Re-asserts the invariants the engine depends on for correctness.
    /// Not a substitute for a fuller external config-file validator — only
    /// what this crate would otherwise panic or silently miscompute on.
    pub fn validate(&self) -> FersResult<()> {
        if self.personal_details.is_empty() {
            return Err(FersError::ConfigurationError {
                field: "personal_details".to_string(),
                reason: "must contain at least one employee".to_string(),
            });
        }
        for (key, employee) in &self.personal_details {
            employee.validate(key)?;
        }
        self.global_assumptions.validate()?;
        let employee_keys: Vec<String> = self.personal_details.keys().cloned().collect();
        for scenario in &self.scenarios {
            scenario.validate(&employee_keys)?;
        }
        Ok(())
    }
}

pub fn embedded_historical_dataset() -> HistoricalDataset {
    HistoricalDataset::embedded()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_employee() -> Employee {
        Employee {
            display_name: "Employee A".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1963, 6, 15).unwrap(),
            hire_date: NaiveDate::from_ymd_opt(1985, 3, 20).unwrap(),
            current_salary: dec!(120000),
            high3_salary: dec!(93000),
            tsp_traditional_balance: dec!(500000),
            tsp_roth_balance: dec!(50000),
            tsp_contribution_pct: dec!(0.05),
            ss_benefit_62: dec!(1800),
            ss_benefit_fra: dec!(2600),
            ss_benefit_70: dec!(3300),
            fehb_premium_per_pay_period: dec!(250),
            survivor_election_pct: dec!(0.50),
            sick_leave_hours: None,
            tsp_allocation: None,
        }
    }

    #[test]
    fn test_employee_validate_rejects_inverted_dates() {
        let mut e = sample_employee();
        e.birth_date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        e.hire_date = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        assert!(e.validate("a").is_err());
    }

    #[test]
    fn test_employee_validate_rejects_bad_survivor_pct() {
        let mut e = sample_employee();
        e.survivor_election_pct = dec!(0.33);
        assert!(e.validate("a").is_err());
    }

    #[test]
    fn test_withdrawal_strategy_validation() {
        assert!(WithdrawalStrategy::VariablePercentage { rate: dec!(0.25) }
            .validate()
            .is_err());
        assert!(WithdrawalStrategy::VariablePercentage { rate: dec!(0.05) }
            .validate()
            .is_ok());
        assert!(WithdrawalStrategy::NeedBased { target_monthly: Decimal::ZERO }
            .validate()
            .is_err());
    }

    #[test]
    fn test_allocation_must_sum_to_one() {
        let bad = TspAllocation { c: dec!(0.5), s: dec!(0.5), i: dec!(0.5), f: Decimal::ZERO, g: Decimal::ZERO };
        assert!(bad.validate("x").is_err());
        assert!(TspAllocation::all_g().validate("x").is_ok());
    }

    #[test]
    fn test_configuration_rejects_unknown_scenario_employee() {
        let mut details = BTreeMap::new();
        details.insert("A".to_string(), sample_employee());
        let scenario = Scenario {
            name: "baseline".to_string(),
            retirements: {
                let mut m = BTreeMap::new();
                m.insert(
                    "ghost".to_string(),
                    RetirementScenario {
                        retirement_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
                        ss_start_age: 67,
                        withdrawal_strategy: WithdrawalStrategy::FourPercent,
                    },
                );
                m
            },
            mortality: None,
        };
        let config = Configuration {
            personal_details: details,
            global_assumptions: GlobalAssumptions {
                inflation_rate: dec!(0.025),
                fehb_premium_inflation: dec!(0.05),
                tsp_pre_retirement_return: dec!(0.07),
                tsp_post_retirement_return: dec!(0.05),
                cola_general_rate: dec!(0.025),
                projection_years: 30,
                location: "Pennsylvania".to_string(),
                federal_rules: FederalRules::default(),
                tsp_fund_stats: TspFundStats::default(),
                mc_variability: MonteCarloVariability::default(),
                default_allocation: TspAllocation::all_g(),
            },
            scenarios: vec![scenario],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mortality_requires_exclusive_death_fields() {
        let both = PersonMortality {
            death_date: Some(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()),
            death_age: Some(80),
        };
        assert!(both.validate("x").is_err());
        let neither = PersonMortality { death_date: None, death_age: None };
        assert!(neither.validate("x").is_err());
        let one = PersonMortality { death_date: Some(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()), death_age: None };
        assert!(one.validate("x").is_ok());
    }
}
