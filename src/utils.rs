use crate::error::{ReconcileError, Result};
use chrono::{Datelike, NaiveDate};

const QUARTER_END_DAYS: [(u32, u32); 4] = [(3, 31), (6, 30), (9, 30), (12, 31)];

pub fn is_quarter_end(date: NaiveDate) -> bool {
    QUARTER_END_DAYS.contains(&(date.month(), date.day()))
}

/// Returns the latest calendar-quarter-end (03-31, 06-30, 09-30, 12-31) that is
/// not later than `date`.
pub fn quarter_end_on_or_before(date: NaiveDate) -> Option<NaiveDate> {
    let quarter_idx = (date.month0() / 3) as usize;
    let (month, day) = QUARTER_END_DAYS[quarter_idx];
    let this_quarter_end = NaiveDate::from_ymd_opt(date.year(), month, day)?;

    if date >= this_quarter_end {
        return Some(this_quarter_end);
    }

    // Everything before this quarter's end falls back to the previous one
    if quarter_idx == 0 {
        NaiveDate::from_ymd_opt(date.year() - 1, 12, 31)
    } else {
        let (month, day) = QUARTER_END_DAYS[quarter_idx - 1];
        NaiveDate::from_ymd_opt(date.year(), month, day)
    }
}

/// Returns the calendar-quarter-end strictly before `date`.
pub fn previous_quarter_end(date: NaiveDate) -> Option<NaiveDate> {
    quarter_end_on_or_before(date.pred_opt()?)
}

/// Signed day count from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Ten-digit, zero-padded CIK as used in EDGAR file and URL names.
pub fn format_cik(cik: u64) -> String {
    format!("{:0>10}", cik)
}

/// Parses an EDGAR-style `YYYY-MM-DD` date.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ReconcileError::DateError(format!(
            "Invalid date '{}'. Expected YYYY-MM-DD",
            value
        ))
    })
}
