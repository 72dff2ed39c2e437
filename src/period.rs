// src/period.rs

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static ANNUAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").unwrap());
static QUARTERLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}Q[1-4]$").unwrap());
static MONTHLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}$").unwrap());

/// Observation frequency inferred from a period label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Annual,
    Quarterly,
    Monthly,
    Unknown,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Annual => "annual",
            Frequency::Quarterly => "quarterly",
            Frequency::Monthly => "monthly",
            Frequency::Unknown => "unknown",
        }
    }

    /// Reverse of `as_str`; anything unrecognised reads back as `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "annual" => Frequency::Annual,
            "quarterly" => Frequency::Quarterly,
            "monthly" => Frequency::Monthly,
            _ => Frequency::Unknown,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a period label. The label comes back unchanged (apart from
/// surrounding whitespace); only the frequency is inferred.
///
/// - `YYYY`    → annual
/// - `YYYYQn`  → quarterly (n in 1..=4)
/// - `YYYY-MM` → monthly
/// - anything else → unknown
pub fn classify_period(label: &str) -> (String, Frequency) {
    let label = label.trim();
    (label.to_string(), infer_frequency(label))
}

/// Frequency half of [`classify_period`], without allocating.
pub fn infer_frequency(label: &str) -> Frequency {
    let label = label.trim();
    if ANNUAL.is_match(label) {
        Frequency::Annual
    } else if QUARTERLY.is_match(label) {
        Frequency::Quarterly
    } else if MONTHLY.is_match(label) {
        Frequency::Monthly
    } else {
        Frequency::Unknown
    }
}

/// Which period spellings a sheet's column headers may use. Annual headers
/// are always admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodHeaders {
    pub quarters: bool,
    pub months: bool,
}

impl Default for PeriodHeaders {
    fn default() -> Self {
        Self {
            quarters: true,
            months: true,
        }
    }
}

impl PeriodHeaders {
    pub fn matches(&self, header: &str) -> bool {
        match infer_frequency(header) {
            Frequency::Annual => true,
            Frequency::Quarterly => self.quarters,
            Frequency::Monthly => self.months,
            Frequency::Unknown => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_each_frequency() {
        assert_eq!(classify_period("2024"), ("2024".into(), Frequency::Annual));
        assert_eq!(
            classify_period("2024Q3"),
            ("2024Q3".into(), Frequency::Quarterly)
        );
        assert_eq!(
            classify_period("2024-07"),
            ("2024-07".into(), Frequency::Monthly)
        );
        assert_eq!(
            classify_period("2024-25"),
            ("2024-25".into(), Frequency::Monthly)
        );
    }

    #[test]
    fn unmatched_labels_are_unknown_not_errors() {
        for label in ["", "24", "20245", "2024Q5", "2024q1", "FY2024", "2024-7", "Total"] {
            let (out, freq) = classify_period(label);
            assert_eq!(out, label);
            assert_eq!(freq, Frequency::Unknown, "label {:?}", label);
        }
    }

    #[test]
    fn reclassifying_is_idempotent() {
        for label in ["1999", " 2001Q2 ", "2010-12", "n/a"] {
            let (once, f1) = classify_period(label);
            let (twice, f2) = classify_period(&once);
            assert_eq!(once, twice);
            assert_eq!(f1, f2);
        }
    }

    #[test]
    fn frequency_labels_round_trip() {
        for f in [
            Frequency::Annual,
            Frequency::Quarterly,
            Frequency::Monthly,
            Frequency::Unknown,
        ] {
            assert_eq!(Frequency::from_label(f.as_str()), f);
        }
        assert_eq!(Frequency::from_label("weekly"), Frequency::Unknown);
    }

    #[test]
    fn period_headers_respect_variant() {
        let annual_only = PeriodHeaders {
            quarters: false,
            months: false,
        };
        assert!(annual_only.matches("2030"));
        assert!(!annual_only.matches("2030Q1"));
        assert!(!annual_only.matches("2030-01"));

        let monthly = PeriodHeaders {
            quarters: false,
            months: true,
        };
        assert!(monthly.matches("2030-01"));
        assert!(!monthly.matches("2030Q1"));
        assert!(PeriodHeaders::default().matches("2030Q1"));
        assert!(!PeriodHeaders::default().matches("Series"));
    }
}
