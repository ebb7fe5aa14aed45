//! FERS basic annuity: multiplier selection, survivor-election reduction,
//! the post-62 COLA ladder, and the Special Retirement Supplement bridge.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// 1.1% if retiring at 62+ with 20+ years of service, else 1.0%.
pub fn pension_multiplier(age_at_retirement: i32, years_of_service: Decimal) -> Decimal {
    if age_at_retirement >= 62 && years_of_service >= dec!(20) {
        dec!(0.011)
    } else {
        dec!(0.010)
    }
}

/// `High3 x years_of_service x multiplier`, full decimal precision (no
/// rounding — the projection engine rounds once at row finalization).
pub fn base_pension(high3_salary: Decimal, years_of_service: Decimal, multiplier: Decimal) -> Decimal {
    high3_salary * years_of_service * multiplier
}

/// Reduces the annuity for a survivor-benefit election: 10% at 50%,
/// 5% at 25%, 0 otherwise. The config layer rejects other election values.
pub fn apply_survivor_reduction(pension: Decimal, survivor_election_pct: Decimal) -> Decimal {
    if survivor_election_pct == dec!(0.50) {
        pension * dec!(0.90)
    } else if survivor_election_pct == dec!(0.25) {
        pension * dec!(0.95)
    } else {
        pension
    }
}

/// FERS COLA bands: full CPI up to 2%, capped at 2% between 2% and 3%,
/// CPI minus one point above 3%.
pub fn fers_cola_rate(cpi: Decimal) -> Decimal {
    if cpi <= dec!(0.02) {
        cpi
    } else if cpi <= dec!(0.03) {
        dec!(0.02)
    } else {
        cpi - dec!(0.01)
    }
}

/// Applies a year's COLA to the running pension base, a no-op before age
/// 62 regardless of CPI.
pub fn apply_annual_cola(pension_base: Decimal, age_at_year_end: i32, cpi: Decimal) -> Decimal {
    if age_at_year_end < 62 {
        return pension_base;
    }
    pension_base * (Decimal::ONE + fers_cola_rate(cpi))
}

/// Whether the retiree qualifies for an unreduced immediate FERS annuity,
/// the gate for SRS eligibility below age 62: MRA with 30 years, age 60
/// with 20 years, or age 62 with 5 years.
pub fn immediate_annuity_eligible(age_months: i32, mra_months: i32, years_of_service: Decimal) -> bool {
    (age_months >= mra_months && years_of_service >= dec!(30))
        || (age_months >= 60 * 12 && years_of_service >= dec!(20))
        || (age_months >= 62 * 12 && years_of_service >= dec!(5))
}

/// Annual Special Retirement Supplement: the age-62 Social Security
/// benefit prorated by FERS service over a full 40-year career. Not
/// COLA-adjusted; terminates the month the retiree turns 62 regardless of
/// when Social Security is actually claimed.
pub fn special_retirement_supplement(ss_benefit_62_monthly: Decimal, fers_service_years: Decimal) -> Decimal {
    ss_benefit_62_monthly * dec!(12) * (fers_service_years / dec!(40))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplier_boundary_golden_scenario() {
        let multiplier = pension_multiplier(62, dec!(40.78));
        assert_eq!(multiplier, dec!(0.011));
        let pension = base_pension(dec!(93000), dec!(40.78), multiplier);
        assert_eq!(pension, dec!(41718.54));
    }

    #[test]
    fn test_multiplier_below_20_years() {
        assert_eq!(pension_multiplier(62, dec!(19.9)), dec!(0.010));
        assert_eq!(pension_multiplier(61, dec!(25)), dec!(0.010));
    }

    #[test]
    fn test_survivor_reduction() {
        assert_eq!(apply_survivor_reduction(dec!(1000), dec!(0.50)), dec!(900));
        assert_eq!(apply_survivor_reduction(dec!(1000), dec!(0.25)), dec!(950));
        assert_eq!(apply_survivor_reduction(dec!(1000), Decimal::ZERO), dec!(1000));
    }

    #[test]
    fn test_cola_ladder_golden_scenario() {
        let p1 = apply_annual_cola(dec!(40000), 63, dec!(0.015));
        assert_eq!(p1, dec!(40600.000));
        let p2 = apply_annual_cola(p1, 64, dec!(0.025));
        assert_eq!(p2, dec!(41412.00000));
        let p3 = apply_annual_cola(p2, 65, dec!(0.040));
        assert_eq!(p3, dec!(42654.3600000));
    }

    #[test]
    fn test_no_cola_before_62() {
        assert_eq!(apply_annual_cola(dec!(40000), 61, dec!(0.05)), dec!(40000));
    }

    #[test]
    fn test_srs_full_career() {
        let srs = special_retirement_supplement(dec!(1800), dec!(40));
        assert_eq!(srs, dec!(21600));
    }

    #[test]
    fn test_immediate_annuity_eligibility() {
        assert!(immediate_annuity_eligible(56 * 12, 56 * 12, dec!(30)));
        assert!(immediate_annuity_eligible(60 * 12, 57 * 12, dec!(20)));
        assert!(!immediate_annuity_eligible(58 * 12, 57 * 12, dec!(15)));
    }
}
