//! TSP balance evolution: contributions and agency match, return
//! application, the three withdrawal strategies, Roth-then-Traditional
//! withdrawal ordering, and RMD enforcement with first-year proration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::model::WithdrawalStrategy;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TspBalances {
    pub traditional: Decimal,
    pub roth: Decimal,
}

impl TspBalances {
    pub fn total(&self) -> Decimal {
        self.traditional + self.roth
    }
}

/// Employee contribution for the year, pre-return.
pub fn employee_contribution(salary: Decimal, contribution_pct: Decimal) -> Decimal {
    salary * contribution_pct
}

/// Flat 5%-of-salary agency match, paid only once the employee contributes
/// at least the match threshold (also 5% by default).
pub fn agency_match(salary: Decimal, contribution_pct: Decimal, match_rate: Decimal, match_threshold_pct: Decimal) -> Decimal {
    if contribution_pct >= match_threshold_pct {
        salary * match_rate
    } else {
        Decimal::ZERO
    }
}

pub fn apply_return(balance: Decimal, annual_return: Decimal) -> Decimal {
    balance * (Decimal::ONE + annual_return)
}

pub fn four_percent_withdrawal(balance_at_retirement: Decimal) -> Decimal {
    balance_at_retirement * dec!(0.04)
}

pub fn inflate_withdrawal(prior_withdrawal: Decimal, inflation_rate: Decimal) -> Decimal {
    prior_withdrawal * (Decimal::ONE + inflation_rate)
}

pub fn need_based_withdrawal(target_monthly: Decimal, other_net_cash: Decimal) -> Decimal {
    (target_monthly * dec!(12) - other_net_cash).max(Decimal::ZERO)
}

pub fn variable_percentage_withdrawal(rate: Decimal, beginning_balance: Decimal) -> Decimal {
    rate * beginning_balance
}

/// Dispatches on the scenario's withdrawal strategy tag. `prior_withdrawal`
/// and `balance_at_retirement` are `None` in the retiree's first retired
/// year (there is no prior withdrawal to inflate from yet).
pub fn strategy_withdrawal(
    strategy: &WithdrawalStrategy,
    is_first_retired_year: bool,
    balance_at_retirement: Decimal,
    beginning_balance: Decimal,
    prior_withdrawal: Decimal,
    inflation_rate: Decimal,
    inflated_target_monthly: Decimal,
    other_net_cash: Decimal,
) -> Decimal {
    match strategy {
        WithdrawalStrategy::FourPercent => {
            if is_first_retired_year {
                four_percent_withdrawal(balance_at_retirement)
            } else {
                inflate_withdrawal(prior_withdrawal, inflation_rate)
            }
        }
        WithdrawalStrategy::NeedBased { .. } => need_based_withdrawal(inflated_target_monthly, other_net_cash),
        WithdrawalStrategy::VariablePercentage { rate } => variable_percentage_withdrawal(*rate, beginning_balance),
    }
}

/// SECURE 2.0 Uniform Lifetime Table (Table III), ages 72-120. Ages below
/// 72 are clamped to the 72 entry; the table floors at age 120.
const UNIFORM_LIFETIME_TABLE: &[(i32, &str)] = &[
    (72, "27.4"), (73, "26.5"), (74, "25.5"), (75, "24.6"), (76, "23.7"),
    (77, "22.9"), (78, "22.0"), (79, "21.1"), (80, "20.2"), (81, "19.4"),
    (82, "18.5"), (83, "17.7"), (84, "16.8"), (85, "16.0"), (86, "15.2"),
    (87, "14.4"), (88, "13.7"), (89, "12.9"), (90, "12.2"), (91, "11.5"),
    (92, "10.8"), (93, "10.1"), (94, "9.5"), (95, "8.9"), (96, "8.4"),
    (97, "7.8"), (98, "7.3"), (99, "6.8"), (100, "6.4"), (101, "6.0"),
    (102, "5.6"), (103, "5.2"), (104, "4.9"), (105, "4.6"), (106, "4.3"),
    (107, "4.1"), (108, "3.9"), (109, "3.7"), (110, "3.5"), (111, "3.4"),
    (112, "3.3"), (113, "3.1"), (114, "3.0"), (115, "2.9"), (116, "2.8"),
    (117, "2.7"), (118, "2.5"), (119, "2.3"), (120, "2.0"),
];

pub fn uniform_lifetime_divisor(age_at_year_end: i32) -> Decimal {
    let clamped = age_at_year_end.clamp(72, 120);
    UNIFORM_LIFETIME_TABLE
        .iter()
        .find(|(age, _)| *age == clamped)
        .map(|(_, divisor)| divisor.parse().unwrap())
        .unwrap_or(dec!(2.0))
}

pub fn full_rmd(traditional_balance: Decimal, age_at_year_end: i32) -> Decimal {
    if traditional_balance <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    traditional_balance / uniform_lifetime_divisor(age_at_year_end)
}

pub fn prorate_first_year_rmd(full_rmd: Decimal, year_fraction: Decimal) -> Decimal {
    full_rmd * year_fraction
}

/// Withdraws Roth first, then Traditional, capped by what's available in
/// each. Mutates both balances and returns `(from_roth, from_traditional)`
/// — split out because only the Traditional portion is taxable income.
pub fn apply_withdrawal(balances: &mut TspBalances, requested: Decimal) -> (Decimal, Decimal) {
    let requested = requested.max(Decimal::ZERO);
    let from_roth = requested.min(balances.roth);
    balances.roth -= from_roth;
    let remaining = requested - from_roth;
    let from_traditional = remaining.min(balances.traditional);
    balances.traditional -= from_traditional;
    (from_roth, from_traditional)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agency_match_at_threshold() {
        assert_eq!(agency_match(dec!(100000), dec!(0.05), dec!(0.05), dec!(0.05)), dec!(5000));
    }

    #[test]
    fn test_agency_match_below_threshold() {
        assert_eq!(agency_match(dec!(100000), dec!(0.03), dec!(0.05), dec!(0.05)), Decimal::ZERO);
    }

    #[test]
    fn test_four_percent_rule() {
        assert_eq!(four_percent_withdrawal(dec!(500000)), dec!(20000));
    }

    #[test]
    fn test_uniform_lifetime_divisor_golden_scenario() {
        assert_eq!(uniform_lifetime_divisor(73), dec!(26.5));
    }

    #[test]
    fn test_uniform_lifetime_clamps_below_72() {
        assert_eq!(uniform_lifetime_divisor(50), uniform_lifetime_divisor(72));
    }

    #[test]
    fn test_rmd_proration_golden_scenario() {
        let full = full_rmd(dec!(500000), 73);
        let diff = (full - dec!(18867.9245)).abs();
        assert!(diff < dec!(0.001), "full={full}");

        let fraction = dec!(184) / dec!(365);
        let effective = prorate_first_year_rmd(full, fraction);
        let diff = (effective - dec!(9511.69)).abs();
        assert!(diff < dec!(0.01), "effective={effective}");

        let strategy_amount = four_percent_withdrawal(dec!(500000));
        let final_withdrawal = strategy_amount.max(effective);
        assert_eq!(final_withdrawal, dec!(20000));
    }

    #[test]
    fn test_apply_withdrawal_roth_first() {
        let mut balances = TspBalances { traditional: dec!(100000), roth: dec!(10000) };
        let (from_roth, from_traditional) = apply_withdrawal(&mut balances, dec!(15000));
        assert_eq!(from_roth, dec!(10000));
        assert_eq!(from_traditional, dec!(5000));
        assert_eq!(balances.roth, Decimal::ZERO);
        assert_eq!(balances.traditional, dec!(95000));
    }

    #[test]
    fn test_apply_withdrawal_caps_at_available() {
        let mut balances = TspBalances { traditional: dec!(1000), roth: dec!(500) };
        let (from_roth, from_traditional) = apply_withdrawal(&mut balances, dec!(5000));
        assert_eq!(from_roth + from_traditional, dec!(1500));
        assert_eq!(balances.total(), Decimal::ZERO);
    }

    #[test]
    fn test_need_based_withdrawal_floors_at_zero() {
        assert_eq!(need_based_withdrawal(dec!(3000), dec!(50000)), Decimal::ZERO);
        assert_eq!(need_based_withdrawal(dec!(3000), dec!(20000)), dec!(16000));
    }

    #[test]
    fn test_variable_percentage_withdrawal() {
        assert_eq!(variable_percentage_withdrawal(dec!(0.04), dec!(500000)), dec!(20000));
    }
}
