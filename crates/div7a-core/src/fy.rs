//! Australian financial year handling (1 July – 30 June).
//!
//! The string form `FY{4-digit}-{2-digit}` (e.g. `FY2023-24`) is a hard
//! external contract: the historical benchmark rate table and the data
//! store are both keyed on it verbatim.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TaxEngineError;

/// Source of "today", injected so the "is this the current FY" branch is
/// deterministic under test.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock implementation used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Utc::now().date_naive()
    }
}

/// A clock pinned to a fixed date. Used by tests and by the CLI's
/// `--today` override.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// An Australian financial year, identified by its starting calendar year.
/// `FinancialYear::starting(2024)` is FY2024-25: 1 July 2024 – 30 June 2025.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FinancialYear {
    start_year: i32,
}

impl FinancialYear {
    pub fn starting(start_year: i32) -> Self {
        FinancialYear { start_year }
    }

    /// The financial year a calendar date falls in.
    pub fn from_date(date: NaiveDate) -> Self {
        let start_year = if date.month() >= 7 {
            date.year()
        } else {
            date.year() - 1
        };
        FinancialYear { start_year }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn end_year(&self) -> i32 {
        self.start_year + 1
    }

    pub fn prior(&self) -> Self {
        FinancialYear {
            start_year: self.start_year - 1,
        }
    }

    pub fn next(&self) -> Self {
        FinancialYear {
            start_year: self.start_year + 1,
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        // 1 July always exists
        NaiveDate::from_ymd_opt(self.start_year, 7, 1).unwrap()
    }

    pub fn last_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.start_year + 1, 6, 30).unwrap()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first_day() && date <= self.last_day()
    }
}

impl fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FY{}-{:02}",
            self.start_year,
            (self.start_year + 1).rem_euclid(100)
        )
    }
}

impl FromStr for FinancialYear {
    type Err = TaxEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TaxEngineError::InvalidFinancialYear {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let body = s.strip_prefix("FY").ok_or_else(|| {
            invalid("must start with 'FY' (expected format FY2023-24)")
        })?;

        let (start, end) = body
            .split_once('-')
            .ok_or_else(|| invalid("missing '-' separator (expected format FY2023-24)"))?;

        if start.len() != 4 || end.len() != 2 {
            return Err(invalid("expected 4-digit start year and 2-digit end year"));
        }

        let start_year: i32 = start
            .parse()
            .map_err(|_| invalid("start year is not numeric"))?;
        let end_suffix: i32 = end
            .parse()
            .map_err(|_| invalid("end year is not numeric"))?;

        if (start_year + 1).rem_euclid(100) != end_suffix {
            return Err(invalid("end year must be the year after the start year"));
        }

        Ok(FinancialYear { start_year })
    }
}

impl Serialize for FinancialYear {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FinancialYear {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_display_format() {
        assert_eq!(FinancialYear::starting(2024).to_string(), "FY2024-25");
        assert_eq!(FinancialYear::starting(2019).to_string(), "FY2019-20");
    }

    #[test]
    fn test_display_century_boundary() {
        assert_eq!(FinancialYear::starting(1999).to_string(), "FY1999-00");
    }

    #[test]
    fn test_parse_roundtrip() {
        let fy: FinancialYear = "FY2023-24".parse().unwrap();
        assert_eq!(fy, FinancialYear::starting(2023));
        assert_eq!(fy.to_string(), "FY2023-24");
    }

    #[test]
    fn test_parse_rejects_missing_prefix() {
        assert!("2023-24".parse::<FinancialYear>().is_err());
    }

    #[test]
    fn test_parse_rejects_non_consecutive_years() {
        assert!("FY2023-25".parse::<FinancialYear>().is_err());
    }

    #[test]
    fn test_parse_rejects_long_suffix() {
        assert!("FY2023-2024".parse::<FinancialYear>().is_err());
    }

    #[test]
    fn test_from_date_july_starts_new_year() {
        assert_eq!(
            FinancialYear::from_date(date(2024, 7, 1)),
            FinancialYear::starting(2024)
        );
    }

    #[test]
    fn test_from_date_june_belongs_to_prior_year() {
        assert_eq!(
            FinancialYear::from_date(date(2024, 6, 30)),
            FinancialYear::starting(2023)
        );
    }

    #[test]
    fn test_prior_and_next() {
        let fy = FinancialYear::starting(2024);
        assert_eq!(fy.prior().to_string(), "FY2023-24");
        assert_eq!(fy.next().to_string(), "FY2025-26");
    }

    #[test]
    fn test_contains_boundaries() {
        let fy = FinancialYear::starting(2023);
        assert!(fy.contains(date(2023, 7, 1)));
        assert!(fy.contains(date(2024, 6, 30)));
        assert!(!fy.contains(date(2023, 6, 30)));
        assert!(!fy.contains(date(2024, 7, 1)));
    }

    #[test]
    fn test_serde_as_string() {
        let fy = FinancialYear::starting(2024);
        let json = serde_json::to_string(&fy).unwrap();
        assert_eq!(json, "\"FY2024-25\"");
        let back: FinancialYear = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fy);
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock(date(2025, 1, 15));
        assert_eq!(
            FinancialYear::from_date(clock.today()),
            FinancialYear::starting(2024)
        );
    }
}
