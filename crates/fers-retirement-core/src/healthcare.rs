//! FEHB premium annualization and Medicare Part B with IRMAA surcharges.

use rust_decimal::Decimal;

use crate::model::IrmaaTier;

/// Annualizes a per-pay-period FEHB premium.
pub fn fehb_annual_premium(per_pay_period: Decimal, pay_periods_per_year: u32) -> Decimal {
    per_pay_period * Decimal::from(pay_periods_per_year)
}

/// Applies `years_elapsed` years of compounded premium inflation to a base
/// annual premium.
pub fn inflate_fehb_premium(base_annual_premium: Decimal, inflation_rate: Decimal, years_elapsed: u32) -> Decimal {
    let mut premium = base_annual_premium;
    for _ in 0..years_elapsed {
        premium *= Decimal::ONE + inflation_rate;
    }
    premium
}

/// IRMAA surcharge for the highest tier whose threshold the MAGI clears;
/// zero if MAGI is below the lowest tier. Tiers are expected in ascending
/// threshold order.
pub fn irmaa_surcharge(magi: Decimal, tiers: &[IrmaaTier]) -> Decimal {
    tiers
        .iter()
        .filter(|tier| magi > tier.magi_threshold)
        .map(|tier| tier.monthly_surcharge)
        .last()
        .unwrap_or(Decimal::ZERO)
}

/// Annual Medicare Part B premium including any IRMAA surcharge.
pub fn medicare_part_b_annual(base_monthly: Decimal, magi: Decimal, tiers: &[IrmaaTier]) -> Decimal {
    (base_monthly + irmaa_surcharge(magi, tiers)) * Decimal::from(12)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fehb_annual_premium() {
        assert_eq!(fehb_annual_premium(dec!(250), 26), dec!(6500));
    }

    #[test]
    fn test_inflate_fehb_premium_no_years() {
        assert_eq!(inflate_fehb_premium(dec!(6500), dec!(0.05), 0), dec!(6500));
    }

    #[test]
    fn test_inflate_fehb_premium_compounds() {
        let inflated = inflate_fehb_premium(dec!(10000), dec!(0.05), 2);
        assert_eq!(inflated, dec!(11025.00));
    }

    fn tiers() -> Vec<IrmaaTier> {
        vec![
            IrmaaTier { magi_threshold: dec!(206000), monthly_surcharge: dec!(69.90) },
            IrmaaTier { magi_threshold: dec!(258000), monthly_surcharge: dec!(174.70) },
        ]
    }

    #[test]
    fn test_irmaa_surcharge_below_lowest_tier() {
        assert_eq!(irmaa_surcharge(dec!(150000), &tiers()), Decimal::ZERO);
    }

    #[test]
    fn test_irmaa_surcharge_middle_tier() {
        assert_eq!(irmaa_surcharge(dec!(210000), &tiers()), dec!(69.90));
    }

    #[test]
    fn test_irmaa_surcharge_top_tier() {
        assert_eq!(irmaa_surcharge(dec!(300000), &tiers()), dec!(174.70));
    }

    #[test]
    fn test_medicare_part_b_annual_with_irmaa() {
        let annual = medicare_part_b_annual(dec!(174.70), dec!(300000), &tiers());
        assert_eq!(annual, (dec!(174.70) + dec!(174.70)) * dec!(12));
    }
}
