use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ProcessingError, Result};

/// A UTC calendar month, ordered chronologically and displayed as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ProcessingError::InvalidMonthKey(format!(
                "{:04}-{:02}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    /// Month containing the instant (floor to month).
    pub fn of(ts: &DateTime<Utc>) -> Self {
        Self {
            year: ts.year(),
            month: ts.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Calendar successor: day 1 of the following month, independent of month length.
    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// First instant of the month, `None` outside chrono's representable range.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    }

    /// First instant of the following month (exclusive upper bound).
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.succ().start()
    }

    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        MonthKey::of(ts) == *self
    }

    /// All months from `start` to `end` inclusive.
    pub fn range_inclusive(start: MonthKey, end: MonthKey) -> Vec<MonthKey> {
        let mut months = Vec::new();
        let mut current = start;
        while current <= end {
            months.push(current);
            current = current.succ();
        }
        months
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ProcessingError::InvalidMonthKey(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        MonthKey::new(year, month).map_err(|_| invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_succ_handles_year_and_variable_lengths() {
        let jan = MonthKey::new(2024, 1).unwrap();
        assert_eq!(jan.succ().to_string(), "2024-02");
        assert_eq!(MonthKey::new(2023, 12).unwrap().succ().to_string(), "2024-01");

        // The successor of a 31-day month never skips a 30-day one
        let mut month = MonthKey::new(2023, 1).unwrap();
        for expected in 2..=12 {
            month = month.succ();
            assert_eq!(month.month(), expected);
        }
    }

    #[test]
    fn test_month_bounds() {
        let feb = MonthKey::new(2024, 2).unwrap();
        assert_eq!(feb.start().unwrap(), ts("2024-02-01T00:00:00Z"));
        assert_eq!(feb.end().unwrap(), ts("2024-03-01T00:00:00Z"));
        assert!(feb.contains(&ts("2024-02-29T23:59:59Z")));
        assert!(!feb.contains(&ts("2024-03-01T00:00:00Z")));
    }

    #[test]
    fn test_of_uses_utc_not_local_offset() {
        // 00:30 on Feb 1 at +01:00 is still January in UTC
        let t = DateTime::parse_from_rfc3339("2024-02-01T00:30:00+01:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(MonthKey::of(&t).to_string(), "2024-01");
    }

    #[test]
    fn test_parse_and_reject() {
        assert_eq!("2024-07".parse::<MonthKey>().unwrap(), MonthKey::new(2024, 7).unwrap());
        assert!("2024-13".parse::<MonthKey>().is_err());
        assert!("2024/07".parse::<MonthKey>().is_err());
        assert!("24-07".parse::<MonthKey>().is_err());
    }

    #[test]
    fn test_range_inclusive() {
        let months = MonthKey::range_inclusive(
            MonthKey::new(2023, 11).unwrap(),
            MonthKey::new(2024, 2).unwrap(),
        );
        let names: Vec<String> = months.iter().map(|m| m.to_string()).collect();
        assert_eq!(names, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
    }
}
