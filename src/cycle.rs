//! Attendance cycle arithmetic.
//!
//! A cycle is the two-week window starting on the Monday of an odd ISO week
//! and ending on the Sunday of the even ISO week that follows it. In ISO
//! years with 53 weeks, week 53 is followed by week 1 (also odd), so the
//! cycle starting at week 53 is a single week long.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::model::WeekParity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleInfo {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub iso_week: u32,
    pub week: WeekParity,
    /// Inclusive.
    pub start: NaiveDate,
    /// Inclusive.
    pub end: NaiveDate,
}

impl CycleInfo {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every date in the cycle, in order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

pub fn week_parity(date: NaiveDate) -> WeekParity {
    if date.iso_week().week() % 2 == 1 {
        WeekParity::Week1
    } else {
        WeekParity::Week2
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn cycle_info(date: NaiveDate) -> CycleInfo {
    let week = week_parity(date);
    let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    let start = match week {
        WeekParity::Week1 => monday,
        WeekParity::Week2 => monday - Duration::days(7),
    };
    let end = if week_parity(start + Duration::days(7)) == WeekParity::Week1 {
        start + Duration::days(6)
    } else {
        start + Duration::days(13)
    };
    CycleInfo {
        date,
        weekday: date.weekday(),
        iso_week: date.iso_week().week(),
        week,
        start,
        end,
    }
}
