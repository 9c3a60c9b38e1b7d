//! Year/month partition keys.
//!
//! The dataset is partitioned by `year=YYYY/month=M` below each tile. A query
//! over a period range is reduced to the fewest partition keys: a year whose
//! twelve months are all requested is read as one `year=YYYY` partition.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{GediError, GediResult};

/// First acquisition date covered by the dataset.
pub const MISSION_START: &str = "2019-04-18";

/// Last acquisition date covered by the dataset.
pub const MISSION_END: &str = "2023-03-16";

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> GediResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(GediError::malformed_time_block(
                format!("{}-{}", year, month),
                "month must be in 1..=12",
            ));
        }
        Ok(Self { year, month })
    }

    /// The month following this one.
    pub fn succ(&self) -> Self {
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
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = GediError;

    /// Parse a `YYYY-MM` period string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| GediError::malformed_time_block(s, "expected YYYY-MM"))?;
        let year: i32 = year
            .parse()
            .map_err(|_| GediError::malformed_time_block(s, "year is not a number"))?;
        let month: u32 = month
            .parse()
            .map_err(|_| GediError::malformed_time_block(s, "month is not a number"))?;
        Self::new(year, month).map_err(|_| GediError::malformed_time_block(s, "month must be in 1..=12"))
    }
}

/// A temporal partition key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeBlock {
    /// All twelve months of a year.
    Year(i32),
    /// A single month.
    Month(YearMonth),
}

impl TimeBlock {
    pub fn year(&self) -> i32 {
        match self {
            TimeBlock::Year(y) => *y,
            TimeBlock::Month(ym) => ym.year,
        }
    }

    /// Month number, `None` for whole-year blocks.
    pub fn month(&self) -> Option<u32> {
        match self {
            TimeBlock::Year(_) => None,
            TimeBlock::Month(ym) => Some(ym.month),
        }
    }
}

impl fmt::Display for TimeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBlock::Year(y) => write!(f, "{:04}", y),
            TimeBlock::Month(ym) => write!(f, "{}", ym),
        }
    }
}

/// Collapse a list of `YYYY-MM` periods into time blocks.
///
/// Years are emitted in first-seen order. A year with every month present
/// becomes [`TimeBlock::Year`]; otherwise its distinct months are emitted in
/// ascending order.
pub fn compress_periods<S: AsRef<str>>(periods: &[S]) -> GediResult<Vec<TimeBlock>> {
    let months = periods
        .iter()
        .map(|p| p.as_ref().parse::<YearMonth>())
        .collect::<GediResult<Vec<_>>>()?;
    Ok(compress_months(&months))
}

/// Same as [`compress_periods`] for already parsed months.
pub fn compress_months(months: &[YearMonth]) -> Vec<TimeBlock> {
    let mut by_year: Vec<(i32, BTreeSet<u32>)> = Vec::new();

    for ym in months {
        match by_year.iter_mut().find(|(year, _)| *year == ym.year) {
            Some((_, set)) => {
                set.insert(ym.month);
            }
            None => by_year.push((ym.year, BTreeSet::from([ym.month]))),
        }
    }

    let mut blocks = Vec::new();
    for (year, set) in by_year {
        if set.len() == 12 {
            blocks.push(TimeBlock::Year(year));
        } else {
            blocks.extend(set.into_iter().map(|month| TimeBlock::Month(YearMonth { year, month })));
        }
    }
    blocks
}

/// Inclusive monthly period range between two dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> GediResult<Self> {
        if start > end {
            return Err(GediError::InvalidDateRange(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse `YYYY-MM-DD` bounds.
    pub fn parse(start: &str, end: &str) -> GediResult<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// The dataset's complete acquisition window.
    pub fn mission() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2019, 4, 18).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2023, 3, 16).unwrap_or_default(),
        }
    }

    /// True when this range is exactly the mission window, in which case
    /// partitions are read without a time qualifier.
    pub fn is_mission(&self) -> bool {
        *self == Self::mission()
    }

    /// Every month touched by the range, month of `start` through month of `end`.
    pub fn months(&self) -> Vec<YearMonth> {
        let last = YearMonth {
            year: self.end.year(),
            month: self.end.month(),
        };
        let mut current = YearMonth {
            year: self.start.year(),
            month: self.start.month(),
        };

        let mut months = Vec::new();
        while current <= last {
            months.push(current);
            current = current.succ();
        }
        months
    }

    /// Compressed time blocks for the range.
    pub fn time_blocks(&self) -> Vec<TimeBlock> {
        compress_months(&self.months())
    }
}

fn parse_date(s: &str) -> GediResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| GediError::InvalidDateRange(format!("'{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_month_parse() {
        let ym: YearMonth = "2021-07".parse().unwrap();
        assert_eq!(ym, YearMonth { year: 2021, month: 7 });
        assert_eq!(ym.to_string(), "2021-07");
        assert!("2021-13".parse::<YearMonth>().is_err());
        assert!("2021/07".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_succ_wraps_year() {
        let dec = YearMonth::new(2020, 12).unwrap();
        assert_eq!(dec.succ(), YearMonth::new(2021, 1).unwrap());
    }

    #[test]
    fn test_time_block_display() {
        assert_eq!(TimeBlock::Year(2020).to_string(), "2020");
        assert_eq!(
            TimeBlock::Month(YearMonth::new(2020, 3).unwrap()).to_string(),
            "2020-03"
        );
    }

    #[test]
    fn test_mission_range() {
        let range = MonthRange::parse(MISSION_START, MISSION_END).unwrap();
        assert!(range.is_mission());
        assert_eq!(range.months().len(), 48);
    }
}
