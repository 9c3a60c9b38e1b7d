//! Tests for period → time block compression.

use gedi_common::{compress_periods, GediError, MonthRange, TimeBlock, YearMonth};

fn labels(blocks: &[TimeBlock]) -> Vec<String> {
    blocks.iter().map(|b| b.to_string()).collect()
}

#[test]
fn test_full_year_collapses() {
    let periods: Vec<String> = (1..=12).map(|m| format!("2020-{:02}", m)).collect();
    let blocks = compress_periods(&periods).unwrap();
    assert_eq!(labels(&blocks), vec!["2020"]);
    assert_eq!(blocks[0], TimeBlock::Year(2020));
}

#[test]
fn test_partial_year_is_not_collapsed() {
    let blocks = compress_periods(&["2020-01", "2020-03"]).unwrap();
    assert_eq!(labels(&blocks), vec!["2020-01", "2020-03"]);
}

#[test]
fn test_first_seen_year_order_and_ascending_months() {
    let mut periods: Vec<String> = vec!["2021-05".into(), "2021-02".into()];
    periods.extend((1..=12).rev().map(|m| format!("2019-{:02}", m)));
    periods.push("2021-02".into());

    let blocks = compress_periods(&periods).unwrap();
    assert_eq!(labels(&blocks), vec!["2021-02", "2021-05", "2019"]);
}

#[test]
fn test_malformed_period() {
    let result = compress_periods(&["2020-01", "20x0-02"]);
    assert!(matches!(
        result,
        Err(GediError::MalformedTimeBlock { ref value, .. }) if value == "20x0-02"
    ));
}

#[test]
fn test_month_range_expansion() {
    let range = MonthRange::parse("2019-11-20", "2021-02-01").unwrap();
    let months = range.months();
    assert_eq!(months.first(), Some(&YearMonth::new(2019, 11).unwrap()));
    assert_eq!(months.last(), Some(&YearMonth::new(2021, 2).unwrap()));
    assert_eq!(months.len(), 16);

    assert_eq!(
        labels(&range.time_blocks()),
        vec!["2019-11", "2019-12", "2020", "2021-01", "2021-02"]
    );
}

#[test]
fn test_month_range_rejects_inverted_bounds() {
    assert!(matches!(
        MonthRange::parse("2022-01-01", "2021-01-01"),
        Err(GediError::InvalidDateRange(_))
    ));
}

#[test]
fn test_single_day_range() {
    let range = MonthRange::parse("2022-06-15", "2022-06-15").unwrap();
    assert_eq!(labels(&range.time_blocks()), vec!["2022-06"]);
    assert!(!range.is_mission());
}
