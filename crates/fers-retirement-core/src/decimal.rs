//! Banker's-rounding helpers atop `rust_decimal::Decimal`. `Decimal` itself
//! already gives exact base-10 arithmetic with at least 28 significant
//! digits and lossless string conversion; this module only adds the
//! round-half-to-even convention the projection engine uses whenever a
//! value is truncated to a fixed number of places for display.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to `places` decimal digits using round-half-to-even.
pub fn round_banker(value: Decimal, places: u32) -> Decimal {
    value.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

/// Round to the cent using round-half-to-even, the convention used
/// whenever a monetary amount is finalized for an `AnnualCashFlow` field.
pub fn round_cents(value: Decimal) -> Decimal {
    round_banker(value, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_half_to_even() {
        assert_eq!(round_banker(dec!(1.005), 2), dec!(1.00));
        assert_eq!(round_banker(dec!(1.015), 2), dec!(1.02));
    }

    #[test]
    fn test_division_round_trip() {
        let third = Decimal::ONE / dec!(3);
        let result = round_cents(third * dec!(3));
        assert_eq!(result, dec!(1.00));
    }

    #[test]
    fn test_parse_format_round_trip() {
        let value = dec!(1234.5678);
        let s = value.to_string();
        let parsed: Decimal = s.parse().unwrap();
        assert_eq!(parsed, value);
    }
}
