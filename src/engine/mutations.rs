use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::limits::*;
use crate::model::*;

use super::policy::{normalize_seat_ids, validate, Mode};
use super::{Engine, EngineError, SharedDayState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveOutcome {
    /// False when a leave already existed for this date.
    pub created: bool,
    /// Bookings dropped because of the leave.
    pub cancelled: Vec<SeatId>,
}

impl Engine {
    pub fn register_user(&self, user_id: &str, batch: Batch, is_admin: bool) -> Result<User, EngineError> {
        if user_id.trim().is_empty() {
            return Err(EngineError::Validation("user id must not be empty".into()));
        }
        if user_id.len() > MAX_USER_ID_LEN {
            return Err(EngineError::Validation("user id too long".into()));
        }
        if self.store.user_count() >= MAX_USERS {
            return Err(EngineError::Validation("too many users".into()));
        }
        let user = User::new(user_id, batch, is_admin);
        if !self.store.insert_user(user.clone()) {
            return Err(EngineError::AlreadyExists(format!("user {user_id}")));
        }
        info!(user = %user_id, %batch, is_admin, "user registered");
        Ok(user)
    }

    /// Book every seat in `seat_ids` or none of them.
    pub async fn confirm_booking(
        &self,
        user_id: &str,
        date: NaiveDate,
        seat_ids: &[SeatId],
    ) -> Result<Vec<Booking>, EngineError> {
        let now = self.clock.now();
        let user = self.require_user(user_id)?;
        let requested = seat_ids.len();
        let seat_ids = normalize_seat_ids(seat_ids)?;

        let rs = self.store.day_or_create(date);
        let booked = self.book_seats(&rs, &user, &seat_ids, requested, now).await;
        drop(rs);
        let bookings = match booked {
            Ok(bookings) => bookings,
            Err(e) => {
                self.store.prune_day(&date);
                return Err(e);
            }
        };

        metrics::counter!(crate::observability::BOOKINGS_CONFIRMED_TOTAL)
            .increment(bookings.len() as u64);
        info!(user = %user.user_id, %date, seats = ?seat_ids, "booking confirmed");
        self.notify.send(
            date,
            &SeatEvent::BookingsConfirmed { date, user_id: user.user_id, seat_ids },
        );
        Ok(bookings)
    }

    /// `requested` is the caller's seat count before duplicates were removed;
    /// the per-booking cap applies to it.
    async fn book_seats(
        &self,
        rs: &SharedDayState,
        user: &User,
        seat_ids: &[SeatId],
        requested: usize,
        now: Timestamp,
    ) -> Result<Vec<Booking>, EngineError> {
        let mut day = rs.write().await;
        day.purge_expired_locks(now);
        {
            let office = self.store.office().read().await;
            validate(&office, &day, user, seat_ids, self.local(now), Mode::Confirm)?;
        }
        if requested > MAX_SEATS_PER_BOOKING {
            return Err(EngineError::Validation(format!(
                "at most {MAX_SEATS_PER_BOOKING} seats per booking"
            )));
        }

        for seat_id in seat_ids {
            if day.booking(*seat_id).is_some() {
                return Err(EngineError::Conflict(format!("seat {seat_id} is already booked")));
            }
            if let Some(lock) = day.live_lock(*seat_id, now)
                && lock.user_id != user.user_id
            {
                return Err(EngineError::Conflict(format!(
                    "seat {seat_id} is held by another user"
                )));
            }
        }

        let mut bookings = Vec::with_capacity(seat_ids.len());
        for seat_id in seat_ids {
            let booking = Booking {
                date: day.date,
                seat_id: *seat_id,
                user_id: user.user_id.clone(),
                booked_at: now,
            };
            day.remove_lock(*seat_id);
            day.insert_booking(booking.clone());
            bookings.push(booking);
        }
        Ok(bookings)
    }

    /// Cancel the caller's bookings on `seat_ids`. Fails on the first seat, in
    /// request order, that the caller does not hold, leaving every booking in place.
    pub async fn cancel_booking(
        &self,
        user_id: &str,
        date: NaiveDate,
        seat_ids: &[SeatId],
    ) -> Result<Vec<SeatId>, EngineError> {
        let user = self.require_user(user_id)?;
        let requested = seat_ids;
        let seat_ids = normalize_seat_ids(requested)?;

        let not_yours = |seat_id: SeatId| {
            EngineError::Validation(format!("seat {seat_id} is not booked by you on {date}"))
        };
        let rs = self.store.day(&date).ok_or_else(|| not_yours(requested[0]))?;
        let mut day = rs.write().await;

        for seat_id in requested {
            if !day.booking(*seat_id).is_some_and(|b| b.user_id == user.user_id) {
                return Err(not_yours(*seat_id));
            }
        }
        for seat_id in &seat_ids {
            day.remove_booking(*seat_id);
            day.remove_lock(*seat_id);
        }
        drop(day);

        info!(user = %user.user_id, %date, seats = ?seat_ids, "booking cancelled");
        self.notify.send(
            date,
            &SeatEvent::BookingsCancelled {
                date,
                user_id: user.user_id,
                seat_ids: seat_ids.clone(),
            },
        );
        Ok(seat_ids)
    }

    /// Record a leave for the caller. Repeated calls for the same date change
    /// nothing. A new leave bumps the floater leave counter of designated-seat
    /// holders and drops the caller's bookings and locks for that date.
    pub async fn mark_leave(&self, user_id: &str, date: NaiveDate) -> Result<LeaveOutcome, EngineError> {
        let user = self.require_user(user_id)?;

        let rs = self.store.day_or_create(date);
        let mut day = rs.write().await;
        let created = day.insert_leave(Leave {
            date,
            user_id: user.user_id.clone(),
            seat_id: user.designated_seat,
        });
        if !created {
            return Ok(LeaveOutcome { created: false, cancelled: Vec::new() });
        }

        let cancelled = day.user_seats(&user.user_id);
        for seat_id in &cancelled {
            day.remove_booking(*seat_id);
        }
        day.remove_user_locks(&user.user_id);
        if user.designated_seat.is_some() {
            self.store
                .update_user(&user.user_id, |u| u.floater_leave_count += 1);
        }
        drop(day);

        info!(user = %user.user_id, %date, cancelled = ?cancelled, "leave marked");
        self.notify
            .send(date, &SeatEvent::LeaveMarked { date, user_id: user.user_id.clone() });
        if !cancelled.is_empty() {
            self.notify.send(
                date,
                &SeatEvent::BookingsCancelled {
                    date,
                    user_id: user.user_id,
                    seat_ids: cancelled.clone(),
                },
            );
        }
        Ok(LeaveOutcome { created: true, cancelled })
    }
}
