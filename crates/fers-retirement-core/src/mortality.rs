//! Deterministic death events and the survivor transitions they trigger:
//! zeroing the deceased's income streams, electing the greater Social
//! Security benefit, optionally merging TSP balances, and scaling ongoing
//! spending.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::model::PersonMortality;
use crate::tsp::TspBalances;

/// Whether a death event fires this year: the configured `death_date`
/// falls on or before year-end, or `age_at_year_end` has reached
/// `death_age`.
pub fn death_triggered(event: Option<&PersonMortality>, year_end: NaiveDate, age_at_year_end: i32) -> bool {
    match event {
        None => false,
        Some(PersonMortality { death_date: Some(date), .. }) => *date <= year_end,
        Some(PersonMortality { death_age: Some(age), .. }) => age_at_year_end >= *age,
        Some(_) => false,
    }
}

/// Survivor SS rule: the greater of the two pre-death annual benefits,
/// going forward. A simplification — no widow(er) early-claiming
/// reduction is modeled.
pub fn survivor_ss_benefit(a_annual_ss: Decimal, b_annual_ss: Decimal) -> Decimal {
    a_annual_ss.max(b_annual_ss)
}

/// Moves the deceased's Traditional and Roth balances into the survivor's,
/// zeroing the deceased's. Only applies under `tsp_spousal_transfer ==
/// "merge"`.
pub fn merge_tsp_balances(deceased: &mut TspBalances, survivor: &mut TspBalances) {
    survivor.traditional += deceased.traditional;
    survivor.roth += deceased.roth;
    deceased.traditional = Decimal::ZERO;
    deceased.roth = Decimal::ZERO;
}

/// Scales an ongoing pension or withdrawal amount by the configured
/// survivor spending factor (default 1.0 — no reduction).
pub fn apply_spending_factor(amount: Decimal, survivor_spending_factor: Decimal) -> Decimal {
    amount * survivor_spending_factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_death_triggered_by_date() {
        let event = PersonMortality {
            death_date: Some(NaiveDate::from_ymd_opt(2034, 6, 30).unwrap()),
            death_age: None,
        };
        let year_end = NaiveDate::from_ymd_opt(2034, 12, 31).unwrap();
        assert!(death_triggered(Some(&event), year_end, 71));
    }

    #[test]
    fn test_death_not_triggered_before_date() {
        let event = PersonMortality {
            death_date: Some(NaiveDate::from_ymd_opt(2040, 6, 30).unwrap()),
            death_age: None,
        };
        let year_end = NaiveDate::from_ymd_opt(2034, 12, 31).unwrap();
        assert!(!death_triggered(Some(&event), year_end, 71));
    }

    #[test]
    fn test_death_triggered_by_age() {
        let event = PersonMortality { death_date: None, death_age: Some(85) };
        let year_end = NaiveDate::from_ymd_opt(2034, 12, 31).unwrap();
        assert!(death_triggered(Some(&event), year_end, 85));
        assert!(!death_triggered(Some(&event), year_end, 84));
    }

    #[test]
    fn test_no_event_never_triggers() {
        let year_end = NaiveDate::from_ymd_opt(2034, 12, 31).unwrap();
        assert!(!death_triggered(None, year_end, 200));
    }

    #[test]
    fn test_survivor_ss_benefit_takes_greater() {
        assert_eq!(survivor_ss_benefit(dec!(20000), dec!(28000)), dec!(28000));
    }

    #[test]
    fn test_merge_tsp_balances_golden_scenario() {
        let mut a = TspBalances { traditional: dec!(300000), roth: dec!(20000) };
        let mut b = TspBalances { traditional: dec!(400000), roth: dec!(30000) };
        merge_tsp_balances(&mut a, &mut b);
        assert_eq!(a.total(), Decimal::ZERO);
        assert_eq!(b.traditional, dec!(700000));
        assert_eq!(b.roth, dec!(50000));
    }

    #[test]
    fn test_apply_spending_factor_golden_scenario() {
        assert_eq!(apply_spending_factor(dec!(40000), dec!(0.90)), dec!(36000));
    }
}
