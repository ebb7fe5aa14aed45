//! Date and age arithmetic shared by the pension, Social Security, and TSP
//! calculators: ages, years-of-service, and the FRA/MRA/RMD-age tables that
//! key off birth year.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Integer years from `birth` to `at`, decremented by one if `at`'s
/// day-of-year precedes `birth`'s day-of-year (the birthday hasn't
/// happened yet this year).
pub fn age_at(birth: NaiveDate, at: NaiveDate) -> i32 {
    let mut age = at.year() - birth.year();
    if (at.month(), at.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// Years of creditable service: elapsed calendar time plus sick-leave
/// credit, rounded to 4 decimal places.
pub fn years_of_service(hire: NaiveDate, at: NaiveDate, sick_hours: Decimal) -> Decimal {
    let days = (at - hire).num_days();
    let calendar_years = Decimal::from(days) / dec!(365.25);
    let sick_years = sick_hours / dec!(8) / dec!(365.25);
    (calendar_years + sick_years).round_dp(4)
}

/// Whether `year` is a leap year, for day-count proration.
fn days_in_year(year: i32) -> i64 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366
    } else {
        365
    }
}

/// Fraction of the year remaining after `birthday` through Dec 31 of
/// `birthday`'s year, used to prorate the first-year RMD.
pub fn year_fraction_after(birthday: NaiveDate) -> Decimal {
    let year_end = NaiveDate::from_ymd_opt(birthday.year(), 12, 31).unwrap();
    let days = (year_end - birthday).num_days() + 1;
    Decimal::from(days) / Decimal::from(days_in_year(birthday.year()))
}

/// SECURE 2.0 required-minimum-distribution starting age, by birth year.
pub fn rmd_age(birth_year: i32) -> i32 {
    if birth_year <= 1950 {
        72
    } else if birth_year <= 1959 {
        73
    } else {
        75
    }
}

/// Social Security Full Retirement Age, represented as total months of age
/// (e.g. 66 years 2 months = 794).
pub fn fra_months(birth_year: i32) -> i32 {
    match birth_year {
        y if y <= 1937 => 65 * 12,
        1938 => 65 * 12 + 2,
        1939 => 65 * 12 + 4,
        1940 => 65 * 12 + 6,
        1941 => 65 * 12 + 8,
        1942 => 65 * 12 + 10,
        1943..=1954 => 66 * 12,
        1955 => 66 * 12 + 2,
        1956 => 66 * 12 + 4,
        1957 => 66 * 12 + 6,
        1958 => 66 * 12 + 8,
        1959 => 66 * 12 + 10,
        _ => 67 * 12,
    }
}

/// FERS Minimum Retirement Age, represented as total months of age.
pub fn mra_months(birth_year: i32) -> i32 {
    match birth_year {
        y if y < 1948 => 55 * 12,
        1948 => 55 * 12 + 2,
        1949 => 55 * 12 + 4,
        1950 => 55 * 12 + 6,
        1951 => 55 * 12 + 8,
        1952 => 55 * 12 + 10,
        1953..=1964 => 56 * 12,
        1965 => 56 * 12 + 2,
        1966 => 56 * 12 + 4,
        1967 => 56 * 12 + 6,
        1968 => 56 * 12 + 8,
        1969 => 56 * 12 + 10,
        _ => 57 * 12,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_at_before_birthday() {
        let birth = NaiveDate::from_ymd_opt(1960, 6, 15).unwrap();
        let at = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(age_at(birth, at), 64);
    }

    #[test]
    fn test_age_at_after_birthday() {
        let birth = NaiveDate::from_ymd_opt(1960, 6, 15).unwrap();
        let at = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        assert_eq!(age_at(birth, at), 65);
    }

    #[test]
    fn test_age_at_on_birthday() {
        let birth = NaiveDate::from_ymd_opt(1960, 6, 15).unwrap();
        let at = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert_eq!(age_at(birth, at), 65);
    }

    #[test]
    fn test_years_of_service_matches_golden_scenario() {
        let hire = NaiveDate::from_ymd_opt(1985, 3, 20).unwrap();
        let at = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        let yos = years_of_service(hire, at, Decimal::ZERO);
        let diff = (yos - dec!(40.78)).abs();
        assert!(diff < dec!(0.01), "yos={yos}");
    }

    #[test]
    fn test_rmd_age_boundaries() {
        assert_eq!(rmd_age(1950), 72);
        assert_eq!(rmd_age(1951), 73);
        assert_eq!(rmd_age(1959), 73);
        assert_eq!(rmd_age(1960), 75);
    }

    #[test]
    fn test_fra_boundaries() {
        assert_eq!(fra_months(1954), 66 * 12);
        assert_eq!(fra_months(1955), 66 * 12 + 2);
        assert_eq!(fra_months(1960), 67 * 12);
    }

    #[test]
    fn test_year_fraction_after_july_first_non_leap() {
        let birthday = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let frac = year_fraction_after(birthday);
        let diff = (frac - dec!(184) / dec!(365)).abs();
        assert!(diff < dec!(0.001), "frac={frac}");
    }

    #[test]
    fn test_mra_boundaries() {
        assert_eq!(mra_months(1947), 55 * 12);
        assert_eq!(mra_months(1953), 56 * 12);
        assert_eq!(mra_months(1970), 57 * 12);
    }
}
