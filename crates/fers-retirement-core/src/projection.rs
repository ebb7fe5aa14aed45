//! The annual projection engine (C10): orchestrates pension, TSP, Social
//! Security, tax, healthcare, and mortality calculators year by year for
//! one scenario, producing the `AnnualCashFlow` sequence.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use log::debug;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};

use crate::dates::{age_at, fra_months, mra_months, rmd_age, year_fraction_after, years_of_service};
use crate::error::FersError;
use crate::healthcare::{fehb_annual_premium, inflate_fehb_premium, medicare_part_b_annual};
use crate::mortality::{apply_spending_factor, death_triggered, merge_tsp_balances, survivor_ss_benefit};
use crate::model::{Employee, FilingStatus, GlobalAssumptions, Mortality, RetirementScenario, TspAllocation};
use crate::pension::{
    apply_annual_cola, apply_survivor_reduction, base_pension, immediate_annuity_eligible, pension_multiplier,
    special_retirement_supplement,
};
use crate::social_security::{annual_benefit, apply_cola as apply_ss_cola, monthly_benefit_at_claim, provisional_income, taxable_ss_portion};
use crate::tax::{federal_taxable_income, fica_tax, local_eit, marginal_tax, state_tax};
use crate::tsp::{agency_match, apply_return, apply_withdrawal, employee_contribution, full_rmd, prorate_first_year_rmd, strategy_withdrawal, TspBalances};
use crate::FersResult;

/// A source of per-year market conditions: TSP returns, general inflation,
/// SS/pension COLA, and the CPI series the FERS COLA ladder keys off of.
/// The deterministic engine and the Monte Carlo engine both implement this
/// trait; `project` itself is agnostic to where the numbers came from.
pub trait MarketPath {
    fn tsp_return(&self, year_index: usize, allocation: TspAllocation, is_retired: bool) -> Decimal;
    fn inflation(&self, year_index: usize) -> Decimal;
    fn cola(&self, year_index: usize) -> Decimal;
    fn cpi(&self, year_index: usize) -> Decimal;
}

/// Flat-rate market path used by deterministic scenario runs: a single
/// pre-/post-retirement TSP return and a single general rate standing in
/// for inflation, COLA, and CPI alike.
pub struct DeterministicMarketPath {
    pub tsp_pre_retirement_return: Decimal,
    pub tsp_post_retirement_return: Decimal,
    pub inflation_rate: Decimal,
    pub cola_general_rate: Decimal,
}

impl DeterministicMarketPath {
    pub fn from_assumptions(assumptions: &GlobalAssumptions) -> Self {
        DeterministicMarketPath {
            tsp_pre_retirement_return: assumptions.tsp_pre_retirement_return,
            tsp_post_retirement_return: assumptions.tsp_post_retirement_return,
            inflation_rate: assumptions.inflation_rate,
            cola_general_rate: assumptions.cola_general_rate,
        }
    }
}

impl MarketPath for DeterministicMarketPath {
    fn tsp_return(&self, _year_index: usize, _allocation: TspAllocation, is_retired: bool) -> Decimal {
        if is_retired {
            self.tsp_post_retirement_return
        } else {
            self.tsp_pre_retirement_return
        }
    }

    fn inflation(&self, _year_index: usize) -> Decimal {
        self.inflation_rate
    }

    fn cola(&self, _year_index: usize) -> Decimal {
        self.cola_general_rate
    }

    fn cpi(&self, _year_index: usize) -> Decimal {
        self.cola_general_rate
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonFlow {
    pub salary: Decimal,
    pub pension: Decimal,
    pub survivor_pension_reduction: Decimal,
    pub srs: Decimal,
    pub ss_benefit: Decimal,
    pub tsp_withdrawal: Decimal,
    pub tsp_traditional_balance: Decimal,
    pub tsp_roth_balance: Decimal,
    pub deceased: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnualCashFlow {
    pub year: i32,
    pub date: NaiveDate,
    pub age_a: i32,
    pub age_b: i32,
    pub a: PersonFlow,
    pub b: PersonFlow,
    pub total_gross: Decimal,
    pub federal_taxable_income: Decimal,
    pub standard_deduction: Decimal,
    pub filing_status: FilingStatus,
    pub seniors_count: i32,
    pub federal_tax: Decimal,
    pub state_tax: Decimal,
    pub local_tax: Decimal,
    pub fica: Decimal,
    pub tsp_contributions: Decimal,
    pub fehb_premium: Decimal,
    pub medicare_premium: Decimal,
    pub net_income: Decimal,
    pub is_retired: bool,
    pub is_medicare_eligible: bool,
    pub is_rmd_year: bool,
    pub rmd_amount: Decimal,
    pub a_deceased: bool,
    pub b_deceased: bool,
    pub filing_status_switch_active: bool,
}

struct PersonState {
    key: String,
    employee: Employee,
    retirement: RetirementScenario,
    tsp: TspBalances,
    pension_base: Decimal,
    pension_initialized: bool,
    srs_eligible: bool,
    fers_service_years: Decimal,
    balance_at_retirement: Decimal,
    deceased: bool,
    ss_running_benefit: Decimal,
    ss_claimed: bool,
    prior_withdrawal: Decimal,
    first_rmd_taken: bool,
    salary_growth_factor: Decimal,
    fehb_growth_factor: Decimal,
}

impl PersonState {
    fn new(key: &str, employee: &Employee, retirement: &RetirementScenario) -> Self {
        PersonState {
            key: key.to_string(),
            employee: employee.clone(),
            retirement: retirement.clone(),
            tsp: TspBalances {
                traditional: employee.tsp_traditional_balance,
                roth: employee.tsp_roth_balance,
            },
            pension_base: Decimal::ZERO,
            pension_initialized: false,
            srs_eligible: false,
            fers_service_years: Decimal::ZERO,
            balance_at_retirement: Decimal::ZERO,
            deceased: false,
            ss_running_benefit: Decimal::ZERO,
            ss_claimed: false,
            prior_withdrawal: Decimal::ZERO,
            first_rmd_taken: false,
            salary_growth_factor: Decimal::ONE,
            fehb_growth_factor: Decimal::ONE,
        }
    }

    fn claim_calendar_year(&self) -> i32 {
        self.employee.birth_date.year() + self.retirement.ss_start_age as i32
    }

    /// A hypothetical immediate-claim annual benefit, used for the
    /// survivor-SS comparison when a person dies before claiming.
    fn reference_annual_ss(&self, at: NaiveDate) -> Decimal {
        if self.ss_claimed {
            return self.ss_running_benefit;
        }
        let age_months = age_at(self.employee.birth_date, at) * 12;
        let fra = fra_months(self.employee.birth_date.year());
        monthly_benefit_at_claim(age_months.max(62 * 12), fra, self.employee.ss_benefit_fra) * Decimal::from(12)
    }
}

/// Runs one scenario's projection. `employees` and `retirements` must
/// share the same two keys; `start_year` anchors year index 0.
#[allow(clippy::too_many_arguments)]
pub fn project(
    employees: &BTreeMap<String, Employee>,
    retirements: &BTreeMap<String, RetirementScenario>,
    mortality: Option<&Mortality>,
    assumptions: &GlobalAssumptions,
    market_path: &dyn MarketPath,
    start_year: i32,
) -> FersResult<Vec<AnnualCashFlow>> {
    let keys: Vec<String> = employees.keys().cloned().collect();
    if keys.len() != 2 {
        return Err(FersError::ArithmeticError {
            context: "projection requires exactly two household members".to_string(),
        });
    }
    let mut people: Vec<PersonState> = keys
        .iter()
        .map(|k| {
            let retirement = retirements.get(k).ok_or_else(|| FersError::ConfigurationError {
                field: format!("retirements.{k}"),
                reason: "missing retirement scenario for employee".to_string(),
            })?;
            Ok(PersonState::new(k, &employees[k], retirement))
        })
        .collect::<FersResult<Vec<_>>>()?;

    let rules = &assumptions.federal_rules;
    let mut filing_status = FilingStatus::Mfj;
    let mut filing_status_switch_pending = false;
    let mut any_death_ever = false;
    let mut rows = Vec::with_capacity(assumptions.projection_years as usize);

    for y in 0..assumptions.projection_years as usize {
        let year = start_year + y as i32;
        let year_end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap();

        // Mortality: detect new deaths, apply filing-status switch timing.
        let mut newly_deceased = [false, false];
        for (idx, person) in people.iter_mut().enumerate() {
            if person.deceased {
                continue;
            }
            let event = mortality.and_then(|m| m.events.get(&person.key));
            let age_end = age_at(person.employee.birth_date, year_end);
            if death_triggered(event, year_end, age_end) {
                person.deceased = true;
                newly_deceased[idx] = true;
                any_death_ever = true;
                debug!("{} deceased in {}", person.key, year);
            }
        }

        if newly_deceased.iter().any(|d| *d) {
            if let Some(m) = mortality {
                let switch_now = matches!(m.filing_status_switch, crate::model::FilingStatusSwitch::Immediate);
                if switch_now {
                    filing_status = FilingStatus::Single;
                } else {
                    filing_status_switch_pending = true;
                }
            }
        } else if filing_status_switch_pending {
            filing_status = FilingStatus::Single;
            filing_status_switch_pending = false;
        }

        // Survivor SS + TSP merge, applied once at the moment of death.
        if newly_deceased[0] || newly_deceased[1] {
            let references: Vec<Decimal> = people.iter().map(|p| p.reference_annual_ss(year_end)).collect();
            let greater = survivor_ss_benefit(references[0], references[1]);
            for person in people.iter_mut() {
                if !person.deceased {
                    person.ss_running_benefit = greater;
                    person.ss_claimed = true;
                }
            }
            if let Some(m) = mortality {
                if matches!(m.tsp_spousal_transfer, crate::model::TspSpousalTransfer::Merge) {
                    let (dead_idx, alive_idx) = if newly_deceased[0] { (0, 1) } else { (1, 0) };
                    let (left, right) = people.split_at_mut(dead_idx.max(alive_idx));
                    let (dead, alive) = if dead_idx < alive_idx {
                        (&mut left[dead_idx], &mut right[0])
                    } else {
                        (&mut right[0], &mut left[alive_idx])
                    };
                    merge_tsp_balances(&mut dead.tsp, &mut alive.tsp);
                }
            }
        }

        let spending_factor = if any_death_ever {
            mortality.map(|m| m.survivor_spending_factor).unwrap_or(Decimal::ONE)
        } else {
            Decimal::ONE
        };

        let ages: Vec<i32> = people.iter().map(|p| age_at(p.employee.birth_date, year_end)).collect();
        let retired: Vec<bool> = people.iter().map(|p| year_end >= p.retirement.retirement_date).collect();

        // Salary.
        let mut salaries = vec![Decimal::ZERO; 2];
        for (idx, person) in people.iter_mut().enumerate() {
            if !person.deceased && !retired[idx] {
                salaries[idx] = person.employee.current_salary * person.salary_growth_factor;
            }
            person.salary_growth_factor *= Decimal::ONE + market_path.cola(y);
        }

        // Pension, survivor reduction, SRS.
        let mut pensions = vec![Decimal::ZERO; 2];
        let mut survivor_reductions = vec![Decimal::ZERO; 2];
        let mut srs_amounts = vec![Decimal::ZERO; 2];
        for (idx, person) in people.iter_mut().enumerate() {
            if person.deceased || !retired[idx] {
                continue;
            }
            if !person.pension_initialized {
                let yos = years_of_service(
                    person.employee.hire_date,
                    person.retirement.retirement_date,
                    person.employee.sick_leave_hours.unwrap_or(Decimal::ZERO),
                );
                let age_at_retirement = age_at(person.employee.birth_date, person.retirement.retirement_date);
                let multiplier = pension_multiplier(age_at_retirement, yos);
                let base = base_pension(person.employee.high3_salary, yos, multiplier);
                let reduced = apply_survivor_reduction(base, person.employee.survivor_election_pct);
                survivor_reductions[idx] = base - reduced;
                person.pension_base = reduced;
                person.pension_initialized = true;
                person.fers_service_years = yos;
                let age_months = age_at_retirement * 12;
                let mra = mra_months(person.employee.birth_date.year());
                person.srs_eligible = age_at_retirement < 62 && immediate_annuity_eligible(age_months, mra, yos);
            } else {
                person.pension_base = apply_annual_cola(person.pension_base, ages[idx], market_path.cpi(y));
            }
            pensions[idx] = apply_spending_factor(person.pension_base, spending_factor);
            if person.srs_eligible && ages[idx] < 62 {
                srs_amounts[idx] = special_retirement_supplement(person.employee.ss_benefit_62, person.fers_service_years);
            }
        }

        // Social Security (own benefit; survivor override already applied above).
        let mut ss_benefits = vec![Decimal::ZERO; 2];
        for (idx, person) in people.iter_mut().enumerate() {
            if person.deceased {
                continue;
            }
            if person.ss_claimed {
                person.ss_running_benefit = apply_ss_cola(person.ss_running_benefit, market_path.cola(y));
                ss_benefits[idx] = person.ss_running_benefit;
                continue;
            }
            let claim_year = person.claim_calendar_year();
            if year < claim_year {
                continue;
            }
            let fra = fra_months(person.employee.birth_date.year());
            let claim_age_months = person.retirement.ss_start_age as i32 * 12;
            let monthly = monthly_benefit_at_claim(claim_age_months, fra, person.employee.ss_benefit_fra);
            if year == claim_year {
                let months_claimed = 13 - person.employee.birth_date.month() as i32;
                ss_benefits[idx] = annual_benefit(monthly, months_claimed);
                person.ss_running_benefit = monthly * Decimal::from(12);
            } else {
                person.ss_running_benefit = apply_ss_cola(monthly * Decimal::from(12), market_path.cola(y));
                ss_benefits[idx] = person.ss_running_benefit;
            }
            person.ss_claimed = true;
        }

        // TSP contributions and growth.
        let mut tsp_contributions_total = Decimal::ZERO;
        for (idx, person) in people.iter_mut().enumerate() {
            if person.deceased {
                continue;
            }
            if !retired[idx] {
                let contribution = employee_contribution(salaries[idx], person.employee.tsp_contribution_pct);
                let match_amount = agency_match(
                    salaries[idx],
                    person.employee.tsp_contribution_pct,
                    rules.fers_match_rate,
                    rules.fers_match_threshold_pct,
                );
                person.tsp.traditional += contribution + match_amount;
                tsp_contributions_total += contribution;
            }
            let allocation = person.employee.tsp_allocation.unwrap_or(assumptions.default_allocation);
            let return_rate = market_path.tsp_return(y, allocation, retired[idx]);
            person.tsp.traditional = apply_return(person.tsp.traditional, return_rate);
            person.tsp.roth = apply_return(person.tsp.roth, return_rate);
            if retired[idx] && person.balance_at_retirement == Decimal::ZERO {
                person.balance_at_retirement = person.tsp.total();
            }
        }

        // Pass 1: approximate other_net_cash (no SS taxed yet) to size need-based withdrawals.
        let wages_total = salaries[0] + salaries[1];
        let ss_total_estimate = ss_benefits[0] + ss_benefits[1];
        let non_tsp_gross_estimate = wages_total + pensions[0] + pensions[1] + srs_amounts[0] + srs_amounts[1] + ss_total_estimate;
        let seniors_count = ages.iter().zip(people.iter()).filter(|(a, p)| **a >= 65 && !p.deceased).count() as i32;
        let (standard_deduction, brackets) = match filing_status {
            FilingStatus::Mfj => (rules.standard_deduction_mfj, &rules.brackets_mfj),
            FilingStatus::Single => (rules.standard_deduction_single, &rules.brackets_single),
        };
        let federal_taxable_pass1 = federal_taxable_income(
            wages_total + pensions[0] + pensions[1] + srs_amounts[0] + srs_amounts[1],
            standard_deduction,
            rules.senior_add_on,
            seniors_count,
        );
        let federal_tax_pass1 = marginal_tax(federal_taxable_pass1, brackets);
        let state_tax_amount = state_tax(wages_total, rules.state_tax_rate);
        let local_tax_amount = local_eit(wages_total, rules.local_eit_rate);
        let fica_amount = fica_tax(salaries[0], Decimal::ZERO, rules)
            + fica_tax(salaries[1], Decimal::ZERO, rules)
            + (wages_total - rules.fica_high_income_threshold_mfj).max(Decimal::ZERO) * rules.fica_additional_medicare_rate;
        let other_net_cash = non_tsp_gross_estimate - (federal_tax_pass1 + state_tax_amount + local_tax_amount + fica_amount);

        // TSP withdrawal and RMD enforcement.
        let mut tsp_withdrawals = vec![Decimal::ZERO; 2];
        let mut traditional_withdrawn = vec![Decimal::ZERO; 2];
        let mut is_rmd_year = false;
        let mut rmd_amount_total = Decimal::ZERO;
        for (idx, person) in people.iter_mut().enumerate() {
            if person.deceased || !retired[idx] {
                continue;
            }
            let beginning_balance = person.tsp.total();
            let inflated_target = match person.retirement.withdrawal_strategy {
                crate::model::WithdrawalStrategy::NeedBased { target_monthly } => {
                    target_monthly * (Decimal::ONE + market_path.inflation(y)).powi(y as i64)
                }
                _ => Decimal::ZERO,
            };
            let is_first_retired_year = person.prior_withdrawal == Decimal::ZERO && person.balance_at_retirement == beginning_balance;
            let strategy_amt = strategy_withdrawal(
                &person.retirement.withdrawal_strategy,
                is_first_retired_year,
                person.balance_at_retirement,
                beginning_balance,
                person.prior_withdrawal,
                market_path.inflation(y),
                inflated_target,
                other_net_cash,
            );

            let birth_year = person.employee.birth_date.year();
            let mut floor = strategy_amt;
            if ages[idx] >= rmd_age(birth_year) && person.tsp.traditional > Decimal::ZERO {
                let full = full_rmd(person.tsp.traditional, ages[idx]);
                let effective = if !person.first_rmd_taken {
                    let birthday_this_year = NaiveDate::from_ymd_opt(year, person.employee.birth_date.month(), person.employee.birth_date.day())
                        .unwrap_or(year_end);
                    person.first_rmd_taken = true;
                    prorate_first_year_rmd(full, year_fraction_after(birthday_this_year))
                } else {
                    full
                };
                floor = floor.max(effective);
                is_rmd_year = true;
                rmd_amount_total += effective;
            }

            let final_withdrawal = apply_spending_factor(floor, spending_factor);
            let (from_roth, from_traditional) = apply_withdrawal(&mut person.tsp, final_withdrawal);
            tsp_withdrawals[idx] = from_roth + from_traditional;
            traditional_withdrawn[idx] = from_traditional;
            person.prior_withdrawal = final_withdrawal;
        }

        // FEHB and Medicare.
        let mut fehb_total = Decimal::ZERO;
        let mut medicare_total = Decimal::ZERO;
        let magi_estimate = non_tsp_gross_estimate + traditional_withdrawn[0] + traditional_withdrawn[1];
        let irmaa_tiers = match filing_status {
            FilingStatus::Mfj => &rules.medicare_irmaa_tiers_joint,
            FilingStatus::Single => &rules.medicare_irmaa_tiers_single,
        };
        for (idx, person) in people.iter().enumerate() {
            if person.deceased {
                continue;
            }
            if person.employee.fehb_premium_per_pay_period > Decimal::ZERO {
                let base = fehb_annual_premium(person.employee.fehb_premium_per_pay_period, rules.fehb_pay_periods_per_year);
                fehb_total += inflate_fehb_premium(base, assumptions.fehb_premium_inflation, 0) * person.fehb_growth_factor;
            }
            if ages[idx] >= 65 {
                medicare_total += medicare_part_b_annual(rules.medicare_part_b_base_monthly, magi_estimate, irmaa_tiers);
            }
        }
        for person in people.iter_mut() {
            person.fehb_growth_factor *= Decimal::ONE + assumptions.fehb_premium_inflation;
        }

        // Pass 2: finalize federal tax using the actual taxable SS portion.
        let other_taxable_income = wages_total + pensions[0] + pensions[1] + srs_amounts[0] + srs_amounts[1] + traditional_withdrawn[0] + traditional_withdrawn[1];
        let ss_total = ss_benefits[0] + ss_benefits[1];
        let (t1, t2) = match filing_status {
            FilingStatus::Mfj => (rules.ss_taxable_threshold_1_mfj, rules.ss_taxable_threshold_2_mfj),
            FilingStatus::Single => (rules.ss_taxable_threshold_1_single, rules.ss_taxable_threshold_2_single),
        };
        let provisional = provisional_income(other_taxable_income, ss_total);
        let taxable_ss = taxable_ss_portion(provisional, ss_total, t1, t2);
        let gross_taxable = other_taxable_income + taxable_ss;
        let federal_taxable_final = federal_taxable_income(gross_taxable, standard_deduction, rules.senior_add_on, seniors_count);
        let federal_tax_final = marginal_tax(federal_taxable_final, brackets);

        let total_gross = wages_total + pensions[0] + pensions[1] + srs_amounts[0] + srs_amounts[1] + ss_total + tsp_withdrawals[0] + tsp_withdrawals[1];
        let net_income = total_gross
            - (federal_tax_final + state_tax_amount + local_tax_amount + fica_amount + tsp_contributions_total + fehb_total + medicare_total);

        let row = AnnualCashFlow {
            year,
            date: year_end,
            age_a: ages[0],
            age_b: ages[1],
            a: PersonFlow {
                salary: salaries[0],
                pension: pensions[0],
                survivor_pension_reduction: survivor_reductions[0],
                srs: srs_amounts[0],
                ss_benefit: ss_benefits[0],
                tsp_withdrawal: tsp_withdrawals[0],
                tsp_traditional_balance: people[0].tsp.traditional,
                tsp_roth_balance: people[0].tsp.roth,
                deceased: people[0].deceased,
            },
            b: PersonFlow {
                salary: salaries[1],
                pension: pensions[1],
                survivor_pension_reduction: survivor_reductions[1],
                srs: srs_amounts[1],
                ss_benefit: ss_benefits[1],
                tsp_withdrawal: tsp_withdrawals[1],
                tsp_traditional_balance: people[1].tsp.traditional,
                tsp_roth_balance: people[1].tsp.roth,
                deceased: people[1].deceased,
            },
            total_gross,
            federal_taxable_income: federal_taxable_final,
            standard_deduction,
            filing_status,
            seniors_count,
            federal_tax: federal_tax_final,
            state_tax: state_tax_amount,
            local_tax: local_tax_amount,
            fica: fica_amount,
            tsp_contributions: tsp_contributions_total,
            fehb_premium: fehb_total,
            medicare_premium: medicare_total,
            net_income,
            is_retired: retired[0] || retired[1],
            is_medicare_eligible: ages.iter().any(|a| *a >= 65),
            is_rmd_year,
            rmd_amount: rmd_amount_total,
            a_deceased: people[0].deceased,
            b_deceased: people[1].deceased,
            filing_status_switch_active: matches!(filing_status, FilingStatus::Single),
        };
        rows.push(row);
    }

    Ok(rows)
}
