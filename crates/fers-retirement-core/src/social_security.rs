//! Social Security benefit scaling by claiming age, COLA application, and
//! the tiered taxable-portion computation shared with the tax calculator.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Monthly benefit at claiming age, expressed as months-of-age versus FRA
/// months-of-age, anchored on the benefit at FRA.
pub fn monthly_benefit_at_claim(claim_age_months: i32, fra_months: i32, benefit_fra: Decimal) -> Decimal {
    if claim_age_months < 62 * 12 {
        return Decimal::ZERO;
    }
    if claim_age_months == fra_months {
        return benefit_fra;
    }
    if claim_age_months > fra_months {
        let months_delayed = Decimal::from(claim_age_months - fra_months);
        let years_delayed = (months_delayed / dec!(12)).min(dec!(4));
        return benefit_fra * (Decimal::ONE + dec!(0.08) * years_delayed);
    }
    let months_early = fra_months - claim_age_months;
    let first_tier = Decimal::from(months_early.min(36));
    let second_tier = Decimal::from((months_early - 36).max(0));
    let reduction = (dec!(5) / dec!(9) / dec!(100)) * first_tier
        + (dec!(5) / dec!(12) / dec!(100)) * second_tier;
    benefit_fra * (Decimal::ONE - reduction)
}

/// Full annual benefit, prorated by fraction of the year the benefit has
/// actually been in pay status (1 in every year after the claiming year).
pub fn annual_benefit(monthly_benefit: Decimal, months_claimed_this_year: i32) -> Decimal {
    monthly_benefit * dec!(12) * (Decimal::from(months_claimed_this_year) / dec!(12))
}

pub fn apply_cola(benefit: Decimal, cola_rate: Decimal) -> Decimal {
    benefit * (Decimal::ONE + cola_rate)
}

pub fn provisional_income(other_taxable_income: Decimal, annual_ss: Decimal) -> Decimal {
    other_taxable_income + dec!(0.5) * annual_ss
}

/// Tiered taxable-portion rule: 0 / up-to-50% / up-to-85% of the annual
/// benefit depending on provisional income versus the filing-status
/// thresholds.
pub fn taxable_ss_portion(
    provisional_income: Decimal,
    annual_ss: Decimal,
    threshold_1: Decimal,
    threshold_2: Decimal,
) -> Decimal {
    if provisional_income <= threshold_1 {
        return Decimal::ZERO;
    }
    if provisional_income <= threshold_2 {
        return (dec!(0.5) * annual_ss).min(dec!(0.5) * (provisional_income - threshold_1));
    }
    let base = dec!(0.85) * (provisional_income - threshold_2)
        + dec!(6000).min(dec!(0.5) * (threshold_2 - threshold_1));
    base.min(dec!(0.85) * annual_ss)
}
