//! Federal bracketed income tax, the Pennsylvania flat-rate state model,
//! local earned-income tax, and FICA. All four are pure functions of
//! already-computed income components — none of them look at TSP or SS
//! internals directly.

use rust_decimal::Decimal;

use crate::model::{FederalRules, TaxBracket};

/// Marginal bracket tax: each bracket taxes only the slice of income
/// between the previous bracket's upper bound and its own.
pub fn marginal_tax(taxable_income: Decimal, brackets: &[TaxBracket]) -> Decimal {
    if taxable_income <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let mut tax = Decimal::ZERO;
    let mut lower = Decimal::ZERO;
    for bracket in brackets {
        let upper = bracket.upper_bound.unwrap_or(taxable_income);
        if taxable_income <= lower {
            break;
        }
        let slice = taxable_income.min(upper) - lower;
        if slice > Decimal::ZERO {
            tax += slice * bracket.rate;
        }
        lower = upper;
        if taxable_income <= upper {
            break;
        }
    }
    tax
}

/// `gross_taxable - standard_deduction - senior_add_on * count(age >= 65)`,
/// floored at zero.
pub fn federal_taxable_income(
    gross_taxable: Decimal,
    standard_deduction: Decimal,
    senior_add_on: Decimal,
    seniors_count: i32,
) -> Decimal {
    let taxable = gross_taxable - standard_deduction - senior_add_on * Decimal::from(seniors_count);
    taxable.max(Decimal::ZERO)
}

/// Flat-rate state tax on earned income only; pensions, TSP distributions,
/// and Social Security are exempt under the Pennsylvania model.
pub fn state_tax(earned_income: Decimal, state_rate: Decimal) -> Decimal {
    earned_income.max(Decimal::ZERO) * state_rate
}

/// Flat local earned-income tax, wages only, zero post-retirement.
pub fn local_eit(wages: Decimal, local_rate: Decimal) -> Decimal {
    wages.max(Decimal::ZERO) * local_rate
}

/// Social Security + Medicare + additional Medicare surtax on wages only.
/// `household_wages` may exceed `wages` when both spouses still work; the
/// additional Medicare surtax is assessed on the household total.
pub fn fica_tax(wages: Decimal, household_wages: Decimal, rules: &FederalRules) -> Decimal {
    if wages <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let ss_portion = wages.min(rules.ss_wage_base) * rules.fica_ss_rate;
    let medicare_portion = wages * rules.fica_medicare_rate;
    let excess = (household_wages - rules.fica_high_income_threshold_mfj).max(Decimal::ZERO);
    let additional_medicare = excess * rules.fica_additional_medicare_rate;
    ss_portion + medicare_portion + additional_medicare
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn brackets() -> Vec<TaxBracket> {
        vec![
            TaxBracket { upper_bound: Some(dec!(10000)), rate: dec!(0.10) },
            TaxBracket { upper_bound: Some(dec!(40000)), rate: dec!(0.20) },
            TaxBracket { upper_bound: None, rate: dec!(0.30) },
        ]
    }

    #[test]
    fn test_marginal_tax_single_bracket() {
        assert_eq!(marginal_tax(dec!(5000), &brackets()), dec!(500));
    }

    #[test]
    fn test_marginal_tax_spans_brackets() {
        // 10000*0.10 + 20000*0.20 = 1000 + 4000 = 5000
        assert_eq!(marginal_tax(dec!(30000), &brackets()), dec!(5000));
    }

    #[test]
    fn test_marginal_tax_top_bracket() {
        // 1000 + 6000 + 10000*0.30 = 7000 + 3000 = 10000
        assert_eq!(marginal_tax(dec!(50000), &brackets()), dec!(10000));
    }

    #[test]
    fn test_marginal_tax_zero_income() {
        assert_eq!(marginal_tax(Decimal::ZERO, &brackets()), Decimal::ZERO);
    }

    #[test]
    fn test_federal_taxable_income_floors_at_zero() {
        let taxable = federal_taxable_income(dec!(10000), dec!(29200), dec!(1550), 0);
        assert_eq!(taxable, Decimal::ZERO);
    }

    #[test]
    fn test_federal_taxable_income_with_seniors() {
        let taxable = federal_taxable_income(dec!(100000), dec!(29200), dec!(1550), 2);
        assert_eq!(taxable, dec!(67700));
    }

    #[test]
    fn test_state_tax_pa_flat_rate() {
        assert_eq!(state_tax(dec!(100000), dec!(0.0307)), dec!(3070));
    }

    #[test]
    fn test_state_tax_zero_on_retirement_income() {
        assert_eq!(state_tax(Decimal::ZERO, dec!(0.0307)), Decimal::ZERO);
    }

    #[test]
    fn test_local_eit() {
        assert_eq!(local_eit(dec!(100000), dec!(0.01)), dec!(1000));
        assert_eq!(local_eit(Decimal::ZERO, dec!(0.01)), Decimal::ZERO);
    }

    #[test]
    fn test_fica_under_ss_wage_base() {
        let rules = FederalRules::default();
        let tax = fica_tax(dec!(100000), dec!(100000), &rules);
        let expected = dec!(100000) * dec!(0.062) + dec!(100000) * dec!(0.0145);
        assert_eq!(tax, expected);
    }

    #[test]
    fn test_fica_above_ss_wage_base() {
        let rules = FederalRules::default();
        let tax = fica_tax(dec!(200000), dec!(200000), &rules);
        let expected = rules.ss_wage_base * dec!(0.062) + dec!(200000) * dec!(0.0145);
        assert_eq!(tax, expected);
    }

    #[test]
    fn test_fica_additional_medicare_surtax() {
        let rules = FederalRules::default();
        let tax = fica_tax(dec!(300000), dec!(300000), &rules);
        let expected = rules.ss_wage_base * dec!(0.062)
            + dec!(300000) * dec!(0.0145)
            + dec!(50000) * dec!(0.009);
        assert_eq!(tax, expected);
    }

    #[test]
    fn test_fica_zero_on_retirement_wages() {
        let rules = FederalRules::default();
        assert_eq!(fica_tax(Decimal::ZERO, Decimal::ZERO, &rules), Decimal::ZERO);
    }
}
