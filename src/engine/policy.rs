use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::cycle::{cycle_info, is_weekend};
use crate::limits::*;
use crate::model::*;

use super::store::{DayState, Office};
use super::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Lock,
    Confirm,
}

/// Reject empty or oversized selections; dedupe and sort the rest.
pub(crate) fn normalize_seat_ids(seat_ids: &[SeatId]) -> Result<Vec<SeatId>, EngineError> {
    if seat_ids.is_empty() {
        return Err(EngineError::Validation("no seats selected".into()));
    }
    if seat_ids.len() > MAX_SEATS_PER_REQUEST {
        return Err(EngineError::Validation(format!(
            "too many seats in one request (max {MAX_SEATS_PER_REQUEST})"
        )));
    }
    let unique: BTreeSet<SeatId> = seat_ids.iter().copied().collect();
    Ok(unique.into_iter().collect())
}

pub(crate) fn is_batch_day(office: &Office, batch: Batch, date: NaiveDate) -> bool {
    let info = cycle_info(date);
    office.schedule.attends(batch, info.week, info.weekday)
}

/// Booking for tomorrow opens at `ADVANCE_BOOKING_OPEN_HOUR` local time today.
pub(crate) fn advance_window_open(date: NaiveDate, local_now: NaiveDateTime) -> bool {
    match local_now.date().succ_opt() {
        Some(tomorrow) if tomorrow == date => local_now.hour() >= ADVANCE_BOOKING_OPEN_HOUR,
        _ => true,
    }
}

/// Run every booking rule for `seat_ids` on `day.date`, stopping at the first
/// failure. `day` must be the state for that date (empty if none exists).
pub fn validate(
    office: &Office,
    day: &DayState,
    user: &User,
    seat_ids: &[SeatId],
    local_now: NaiveDateTime,
    mode: Mode,
) -> Result<(), EngineError> {
    let date = day.date;

    if seat_ids.is_empty() {
        return Err(EngineError::Validation("no seats selected".into()));
    }
    for seat_id in seat_ids {
        if office.seat(*seat_id).is_none() {
            return Err(EngineError::Validation(format!("unknown seat {seat_id}")));
        }
    }

    if is_weekend(date) {
        return Err(EngineError::Policy(format!("{date} is a weekend")));
    }
    if office.is_holiday(date) {
        return Err(EngineError::Policy(format!("{date} is a holiday")));
    }

    if day.is_on_leave(&user.user_id) {
        return Err(EngineError::Policy(format!("you are on leave on {date}")));
    }

    if mode == Mode::Confirm && !advance_window_open(date, local_now) {
        return Err(EngineError::Policy(format!(
            "booking for {date} opens at {ADVANCE_BOOKING_OPEN_HOUR}:00 the day before"
        )));
    }

    for seat_id in seat_ids {
        let Some(seat) = office.seat(*seat_id) else {
            continue;
        };
        let Some(owner) = seat.designated_owner() else {
            continue;
        };
        if day.is_on_leave(owner) {
            // owner away: the seat is a floater today
            continue;
        }
        if owner != user.user_id {
            return Err(EngineError::Policy(format!(
                "seat {seat_id} is not your designated seat"
            )));
        }
        if !is_batch_day(office, user.batch, date) {
            return Err(EngineError::Policy(format!(
                "{} is not in office on {} ({date})",
                user.batch,
                date.weekday()
            )));
        }
    }

    Ok(())
}

/// Advisory summary for read paths. `attended_days` is the number of distinct
/// dates in the date's cycle on which the user holds a booking.
pub fn build_policy_summary(
    office: &Office,
    day: &DayState,
    user: &User,
    attended_days: usize,
    local_now: NaiveDateTime,
) -> PolicySummary {
    let date = day.date;
    let info = cycle_info(date);
    let is_weekend = is_weekend(date);
    let is_holiday = office.is_holiday(date);
    let is_batch_day = office.schedule.attends(user.batch, info.week, info.weekday);
    let on_leave = day.is_on_leave(&user.user_id);
    let office_closed = is_weekend || is_holiday;

    let mut warnings = Vec::new();
    if is_weekend {
        warnings.push(format!("{date} falls on a weekend; the office is closed"));
    }
    if is_holiday {
        warnings.push(format!("{date} is a holiday; the office is closed"));
    }
    if on_leave {
        warnings.push(format!("You are on leave on {date}"));
    }
    if !office_closed && !is_batch_day {
        warnings.push(format!(
            "{} is not a scheduled day for {}; only floater seats are open to you",
            info.weekday, user.batch
        ));
    }
    if !office_closed && !advance_window_open(date, local_now) {
        warnings.push(format!(
            "Booking for {date} opens at {ADVANCE_BOOKING_OPEN_HOUR}:00 today"
        ));
    }
    if attended_days < REQUIRED_DAYS_PER_CYCLE {
        warnings.push(format!(
            "You have attended {attended_days} of {REQUIRED_DAYS_PER_CYCLE} required days this cycle ({} to {})",
            info.start, info.end
        ));
    }

    PolicySummary {
        date,
        weekday: info.weekday,
        week: info.week,
        cycle_start: info.start,
        cycle_end: info.end,
        is_weekend,
        is_holiday,
        is_batch_day,
        on_leave,
        attended_days,
        required_days: REQUIRED_DAYS_PER_CYCLE,
        warnings,
    }
}
