//! Calendar month used as the time axis of every series.

use crate::error::ForecastError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar year-month, serialized as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Build a period, returning `None` for a month outside 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The period `months` calendar months after this one.
    pub fn plus_months(&self, months: u32) -> Self {
        let total = i64::from(self.year) * 12 + i64::from(self.month - 1) + i64::from(months);
        Self {
            year: total.div_euclid(12) as i32,
            month: total.rem_euclid(12) as u32 + 1,
        }
    }

    /// Parse `YYYYMM` (the raw export format), `YYYY-MM` or `YYYY-MM-DD`.
    pub fn parse(raw: &str) -> Result<Self, ForecastError> {
        let raw = raw.trim();
        let parsed = if raw.len() == 6 && raw.chars().all(|c| c.is_ascii_digit()) {
            NaiveDate::parse_from_str(&format!("{}01", raw), "%Y%m%d")
        } else if raw.len() == 7 {
            NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d")
        } else {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        };

        parsed
            .map(|date| Self {
                year: date.year(),
                month: date.month(),
            })
            .map_err(|e| ForecastError::InvalidInput(format!("invalid period '{}': {}", raw, e)))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl TryFrom<String> for Period {
    type Error = ForecastError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Period::parse(&value)
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        let expected = Period::new(2023, 7).unwrap();
        assert_eq!(Period::parse("202307").unwrap(), expected);
        assert_eq!(Period::parse("2023-07").unwrap(), expected);
        assert_eq!(Period::parse("2023-07-01").unwrap(), expected);
        assert!(Period::parse("2023-13").is_err());
        assert!(Period::parse("july").is_err());
    }

    #[test]
    fn test_plus_months_rolls_over_year() {
        let period = Period::new(2023, 11).unwrap();
        assert_eq!(period.plus_months(1), Period::new(2023, 12).unwrap());
        assert_eq!(period.plus_months(2), Period::new(2024, 1).unwrap());
        assert_eq!(period.plus_months(14), Period::new(2025, 1).unwrap());
        assert_eq!(period.plus_months(0), period);
    }

    #[test]
    fn test_serializes_as_year_month() {
        let period = Period::new(2024, 3).unwrap();
        let json = serde_json::to_string(&period).unwrap();
        assert_eq!(json, "\"2024-03\"");

        let back: Period = serde_json::from_str(&json).unwrap();
        assert_eq!(back, period);
    }

    #[test]
    fn test_ordering_is_chronological() {
        assert!(Period::new(2022, 12).unwrap() < Period::new(2023, 1).unwrap());
        assert!(Period::new(2023, 2).unwrap() > Period::new(2023, 1).unwrap());
    }
}
