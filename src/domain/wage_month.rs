//! Calendar month a return is filed for.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WageMonthError {
    #[error("wage month is required")]
    Missing,

    #[error("invalid wage month '{0}'; use \"Month YYYY\" or \"YYYY-MM\"")]
    Invalid(String),
}

/// A wage month in canonical `YYYY-MM` form.
///
/// Ordering is chronological, so sorting descending gives the latest month first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WageMonth {
    year: i32,
    month: u32,
}

impl WageMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, WageMonthError> {
        if !(1..=12).contains(&month) || !(1000..=9999).contains(&year) {
            return Err(WageMonthError::Invalid(format!("{:04}-{:02}", year, month)));
        }
        Ok(Self { year, month })
    }

    /// Accepts `YYYY-MM` or free text such as `March 2024` / `Mar 2024`.
    pub fn parse(input: &str) -> Result<Self, WageMonthError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(WageMonthError::Missing);
        }

        if let Some(month) = Self::parse_canonical(input) {
            return Ok(month);
        }

        Self::parse_named(input).ok_or_else(|| WageMonthError::Invalid(input.to_string()))
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    fn parse_canonical(input: &str) -> Option<Self> {
        let bytes = input.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return None;
        }
        let (year, month) = (&input[..4], &input[5..]);
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }
        Self::new(year.parse().ok()?, month.parse().ok()?).ok()
    }

    fn parse_named(input: &str) -> Option<Self> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let [name, year] = parts.as_slice() else {
            return None;
        };
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let date = NaiveDate::parse_from_str(&format!("01 {} {}", name, year), "%d %B %Y").ok()?;
        Self::new(date.year(), date.month()).ok()
    }
}

impl fmt::Display for WageMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for WageMonth {
    type Err = WageMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for WageMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WageMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_canonical_form() {
        let month = WageMonth::parse("2024-03").unwrap();
        assert_eq!(month.to_string(), "2024-03");
    }

    #[test]
    fn normalizes_month_name() {
        assert_eq!(WageMonth::parse("March 2024").unwrap().to_string(), "2024-03");
        assert_eq!(WageMonth::parse("  december   2023 ").unwrap().to_string(), "2023-12");
        assert_eq!(WageMonth::parse("Jan 2025").unwrap().to_string(), "2025-01");
    }

    #[test]
    fn rejects_out_of_range_month() {
        assert!(matches!(
            WageMonth::parse("2024-13"),
            Err(WageMonthError::Invalid(_))
        ));
        assert!(WageMonth::parse("2024-00").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(WageMonth::parse("2024-3").is_err());
        assert!(WageMonth::parse("Smarch 2024").is_err());
        assert!(WageMonth::parse("March").is_err());
        assert!(WageMonth::parse("March 24").is_err());
        assert_eq!(WageMonth::parse("   "), Err(WageMonthError::Missing));
    }

    #[test]
    fn orders_chronologically() {
        let mut months = vec![
            WageMonth::parse("2024-01").unwrap(),
            WageMonth::parse("2023-12").unwrap(),
            WageMonth::parse("2024-02").unwrap(),
        ];
        months.sort();
        let rendered: Vec<String> = months.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["2023-12", "2024-01", "2024-02"]);
    }

    #[test]
    fn serializes_as_string() {
        let month = WageMonth::parse("April 2024").unwrap();
        assert_eq!(serde_json::to_value(month).unwrap(), "2024-04");
        let back: WageMonth = serde_json::from_str("\"2024-04\"").unwrap();
        assert_eq!(back, month);
    }
}
