//! Year-indexed historical dataset: TSP fund returns, CPI inflation, and
//! Social Security COLA. Consumed by historical-replay Monte Carlo and by
//! block-bootstrap sampling; never loaded from disk by the engine itself —
//! callers construct a `HistoricalDataset` (from CSV, a database, or the
//! bundled `embedded()` fixture) and hand it in.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FersError;
use crate::FersResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HistoricalSeries {
    TspC,
    TspS,
    TspI,
    TspF,
    TspG,
    Cpi,
    SsCola,
}

impl HistoricalSeries {
    pub fn name(&self) -> &'static str {
        match self {
            HistoricalSeries::TspC => "TSP-C",
            HistoricalSeries::TspS => "TSP-S",
            HistoricalSeries::TspI => "TSP-I",
            HistoricalSeries::TspF => "TSP-F",
            HistoricalSeries::TspG => "TSP-G",
            HistoricalSeries::Cpi => "CPI",
            HistoricalSeries::SsCola => "SS-COLA",
        }
    }

    /// Equity funds are subject to the |return| > 1.0 outlier check; bond
    /// and government funds and the inflation/COLA series are not.
    fn is_equity(&self) -> bool {
        matches!(
            self,
            HistoricalSeries::TspC | HistoricalSeries::TspS | HistoricalSeries::TspI
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub mean: Decimal,
    pub std_dev: Decimal,
    pub min: Decimal,
    pub max: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricalDataset {
    series: BTreeMap<HistoricalSeries, BTreeMap<i32, Decimal>>,
}

impl HistoricalDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: HistoricalSeries, year: i32, value: Decimal) {
        self.series.entry(series).or_default().insert(year, value);
    }

    pub fn get(&self, series: HistoricalSeries, year: i32) -> FersResult<Decimal> {
        self.series
            .get(&series)
            .and_then(|m| m.get(&year))
            .copied()
            .ok_or_else(|| FersError::DataMissingError {
                series: series.name().to_string(),
                year,
            })
    }

    /// Inclusive `(first_year, last_year)` covered by `series`, if any data
    /// is present.
    pub fn year_range(&self, series: HistoricalSeries) -> Option<(i32, i32)> {
        let m = self.series.get(&series)?;
        let first = *m.keys().next()?;
        let last = *m.keys().next_back()?;
        Some((first, last))
    }

    pub fn years(&self, series: HistoricalSeries) -> Vec<i32> {
        self.series
            .get(&series)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn summary(&self, series: HistoricalSeries) -> Option<SeriesSummary> {
        let values: Vec<Decimal> = self.series.get(&series)?.values().copied().collect();
        if values.is_empty() {
            return None;
        }
        let n = Decimal::from(values.len() as u64);
        let mean = values.iter().copied().sum::<Decimal>() / n;
        let variance = values
            .iter()
            .map(|v| (*v - mean) * (*v - mean))
            .sum::<Decimal>()
            / n;
        let std_dev = sqrt_decimal(variance);
        let min = values.iter().copied().fold(values[0], Decimal::min);
        let max = values.iter().copied().fold(values[0], Decimal::max);
        Some(SeriesSummary {
            mean,
            std_dev,
            min,
            max,
        })
    }

    /// Validation warnings: years present in some series but missing from
    /// others in the standard set, and equity-return outliers.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let all_series = [
            HistoricalSeries::TspC,
            HistoricalSeries::TspS,
            HistoricalSeries::TspI,
            HistoricalSeries::TspF,
            HistoricalSeries::TspG,
            HistoricalSeries::Cpi,
            HistoricalSeries::SsCola,
        ];

        let mut all_years: Vec<i32> = Vec::new();
        for s in all_series {
            all_years.extend(self.years(s));
        }
        all_years.sort_unstable();
        all_years.dedup();

        for s in all_series {
            let have = self.years(s);
            for y in &all_years {
                if !have.contains(y) {
                    warnings.push(format!("{} missing entry for year {}", s.name(), y));
                }
            }
        }

        for s in [HistoricalSeries::TspC, HistoricalSeries::TspS, HistoricalSeries::TspI] {
            if let Some(m) = self.series.get(&s) {
                for (year, value) in m {
                    if s.is_equity() && value.abs() > Decimal::ONE {
                        warnings.push(format!(
                            "{} return {} in {} exceeds the |1.0| outlier threshold",
                            s.name(),
                            value,
                            year
                        ));
                    }
                }
            }
        }

        warnings
    }

    /// A small bundled fixture spanning two decades, for examples and
    /// tests. Not a substitute for a caller-supplied historical dataset.
    pub fn embedded() -> Self {
        let mut ds = Self::new();
        // (year, C, S, I, F, G, CPI, COLA)
        let rows: &[(i32, &str, &str, &str, &str, &str, &str, &str)] = &[
            (2005, "0.0491", "0.1003", "0.1373", "0.0243", "0.0442", "0.034", "0.041"),
            (2006, "0.1579", "0.1555", "0.2630", "0.0368", "0.0487", "0.032", "0.033"),
            (2007, "0.0549", "0.0498", "0.1143", "0.0700", "0.0488", "0.029", "0.023"),
            (2008, "-0.3698", "-0.3817", "-0.4237", "0.0539", "0.0359", "0.038", "0.058"),
            (2009, "0.2645", "0.3429", "0.3010", "0.0596", "0.0297", "-0.004", "0.000"),
            (2010, "0.1506", "0.2980", "0.0817", "0.0666", "0.0281", "0.016", "0.000"),
            (2011, "0.0211", "-0.0336", "-0.1184", "0.0760", "0.0245", "0.032", "0.036"),
            (2012, "0.1600", "0.1828", "0.1768", "0.0421", "0.0145", "0.021", "0.030"),
            (2013, "0.3239", "0.3847", "0.2267", "-0.0185", "0.0159", "0.015", "0.017"),
            (2014, "0.1365", "0.0767", "-0.0474", "0.0672", "0.0174", "0.008", "0.015"),
            (2015, "0.0137", "-0.0292", "-0.0571", "0.0113", "0.0211", "0.007", "0.000"),
            (2016, "0.1195", "0.1804", "0.0156", "0.0304", "0.0186", "0.021", "0.003"),
            (2017, "0.2172", "0.1799", "0.2562", "0.0373", "0.0228", "0.021", "0.020"),
            (2018, "-0.0437", "-0.0909", "-0.1367", "-0.0005", "0.0269", "0.019", "0.028"),
            (2019, "0.3113", "0.2749", "0.2201", "0.0888", "0.0222", "0.023", "0.016"),
            (2020, "0.1840", "0.3242", "0.0804", "0.0734", "0.0056", "0.014", "0.013"),
            (2021, "0.2869", "0.1249", "0.0863", "-0.0172", "0.0135", "0.068", "0.059"),
            (2022, "-0.1811", "-0.2941", "-0.1436", "-0.1282", "0.0244", "0.065", "0.087"),
            (2023, "0.2629", "0.1791", "0.1833", "0.0584", "0.0442", "0.034", "0.032"),
            (2024, "0.2497", "0.1609", "0.0549", "0.0125", "0.0486", "0.029", "0.032"),
        ];
        for (year, c, s, i, f, g, cpi, cola) in rows {
            ds.insert(HistoricalSeries::TspC, *year, c.parse().unwrap());
            ds.insert(HistoricalSeries::TspS, *year, s.parse().unwrap());
            ds.insert(HistoricalSeries::TspI, *year, i.parse().unwrap());
            ds.insert(HistoricalSeries::TspF, *year, f.parse().unwrap());
            ds.insert(HistoricalSeries::TspG, *year, g.parse().unwrap());
            ds.insert(HistoricalSeries::Cpi, *year, cpi.parse().unwrap());
            ds.insert(HistoricalSeries::SsCola, *year, cola.parse().unwrap());
        }
        ds
    }
}

/// Square root for standard deviation, delegating to `rust_decimal`'s
/// `sqrt` (the `maths` feature); guards non-positive input, which `sqrt`
/// itself reports as `None`, returning zero instead.
pub(crate) fn sqrt_decimal(value: Decimal) -> Decimal {
    if value <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    value.sqrt().unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_missing() {
        let mut ds = HistoricalDataset::new();
        ds.insert(HistoricalSeries::Cpi, 2020, dec!(0.02));
        assert_eq!(ds.get(HistoricalSeries::Cpi, 2020).unwrap(), dec!(0.02));
        assert!(ds.get(HistoricalSeries::Cpi, 2021).is_err());
    }

    #[test]
    fn test_summary_basic() {
        let mut ds = HistoricalDataset::new();
        ds.insert(HistoricalSeries::Cpi, 2020, dec!(0.01));
        ds.insert(HistoricalSeries::Cpi, 2021, dec!(0.03));
        let summary = ds.summary(HistoricalSeries::Cpi).unwrap();
        assert_eq!(summary.mean, dec!(0.02));
        assert_eq!(summary.min, dec!(0.01));
        assert_eq!(summary.max, dec!(0.03));
    }

    #[test]
    fn test_embedded_covers_full_range_no_missing_warnings() {
        let ds = HistoricalDataset::embedded();
        let warnings: Vec<String> = ds
            .validate()
            .into_iter()
            .filter(|w| w.contains("missing"))
            .collect();
        assert!(warnings.is_empty(), "unexpected missing-year warnings: {warnings:?}");
    }

    #[test]
    fn test_embedded_year_range() {
        let ds = HistoricalDataset::embedded();
        assert_eq!(ds.year_range(HistoricalSeries::TspC), Some((2005, 2024)));
    }

    #[test]
    fn test_outlier_detection() {
        let mut ds = HistoricalDataset::new();
        ds.insert(HistoricalSeries::TspC, 2008, dec!(-1.5));
        let warnings = ds.validate();
        assert!(warnings.iter().any(|w| w.contains("outlier")));
    }
}
