use chrono::NaiveDate;
use tracing::{info, warn};

use crate::model::*;

use super::{Engine, EngineError};

impl Engine {
    /// Drop every booking, lock and leave, restore the default seat catalog,
    /// schedule and holidays, and clear seat assignments. Users are kept.
    pub async fn reset_all(&self) {
        let dates = self.store.dates();
        let mut guards = Vec::with_capacity(dates.len());
        for date in &dates {
            if let Some(rs) = self.store.day(date) {
                guards.push(rs.write_owned().await);
            }
        }
        let mut office = self.store.office().write().await;

        let mut touched = Vec::new();
        for guard in guards.iter_mut() {
            if !guard.is_empty() {
                touched.push(guard.date);
            }
            guard.clear();
        }
        *office = self.store.default_office();
        for user_id in self.store.user_ids() {
            self.store.update_user(&user_id, |u| {
                u.designated_seat = None;
                u.floater_leave_count = 0;
            });
        }
        drop(office);
        drop(guards);

        warn!(dates = touched.len(), "all bookings, locks and leaves reset");
        for date in touched {
            self.notify.send(date, &SeatEvent::DateReset { date });
        }
    }

    pub async fn force_cancel(&self, date: NaiveDate, seat_id: SeatId) -> Result<Booking, EngineError> {
        let not_found = || EngineError::NotFound(format!("booking for seat {seat_id} on {date}"));
        let rs = self.store.day(&date).ok_or_else(not_found)?;
        let mut day = rs.write().await;
        let booking = day.remove_booking(seat_id).ok_or_else(not_found)?;
        day.remove_lock(seat_id);
        drop(day);

        info!(%date, seat_id, user = %booking.user_id, "booking force-cancelled");
        self.notify.send(
            date,
            &SeatEvent::BookingsCancelled {
                date,
                user_id: booking.user_id.clone(),
                seat_ids: vec![seat_id],
            },
        );
        Ok(booking)
    }

    pub async fn replace_batch_schedule(&self, schedule: BatchSchedule) {
        let mut office = self.store.office().write().await;
        office.schedule = schedule;
        info!(schedule = ?office.schedule, "batch schedule replaced");
    }

    pub async fn batch_schedule(&self) -> BatchSchedule {
        self.store.office().read().await.schedule.clone()
    }

    /// Converting a seat to floater releases its owner's assignment.
    pub async fn set_seat_type(&self, seat_id: SeatId, seat_type: SeatType) -> Result<Seat, EngineError> {
        let mut office = self.store.office().write().await;
        let seat = office
            .seats
            .get_mut(&seat_id)
            .ok_or_else(|| EngineError::NotFound(format!("seat {seat_id}")))?;
        seat.seat_type = seat_type;
        if seat_type == SeatType::Floater
            && let Some(owner) = seat.owner.take()
        {
            self.store.update_user(&owner, |u| u.designated_seat = None);
        }
        let seat = seat.clone();
        drop(office);

        info!(seat_id, ?seat_type, "seat type changed");
        Ok(seat)
    }

    /// Make `seat_id` the user's designated seat. The seat's previous owner and
    /// the user's previous seat are both released.
    pub async fn assign_designated_seat(&self, user_id: &str, seat_id: SeatId) -> Result<Seat, EngineError> {
        let mut office = self.store.office().write().await;
        // read under the guard: concurrent assignments for one user serialize here
        let user = self.require_user(user_id)?;
        let previous_owner = office
            .seat(seat_id)
            .ok_or_else(|| EngineError::NotFound(format!("seat {seat_id}")))?
            .owner
            .clone();

        if let Some(old_seat) = user.designated_seat
            && old_seat != seat_id
            && let Some(seat) = office.seats.get_mut(&old_seat)
            && seat.owner.as_deref() == Some(user_id)
        {
            seat.owner = None;
        }
        if let Some(owner) = previous_owner.filter(|o| o != user_id) {
            self.store.update_user(&owner, |u| u.designated_seat = None);
        }

        let seat = office
            .seats
            .get_mut(&seat_id)
            .ok_or_else(|| EngineError::NotFound(format!("seat {seat_id}")))?;
        seat.seat_type = SeatType::Designated;
        seat.owner = Some(user.user_id.clone());
        let seat = seat.clone();
        self.store
            .update_user(user_id, |u| u.designated_seat = Some(seat_id));
        drop(office);

        info!(user = %user_id, seat_id, "designated seat assigned");
        Ok(seat)
    }

    /// Returns whether the holiday set changed.
    pub async fn toggle_holiday(&self, date: NaiveDate, is_holiday: bool) -> bool {
        let mut office = self.store.office().write().await;
        let changed = if is_holiday {
            office.holidays.insert(date)
        } else {
            office.holidays.remove(&date)
        };
        if changed {
            info!(%date, is_holiday, "holiday updated");
        }
        changed
    }

    pub async fn holidays(&self) -> Vec<NaiveDate> {
        self.store.office().read().await.holidays.iter().copied().collect()
    }

    pub fn set_user_batch(&self, user_id: &str, batch: Batch) -> Result<User, EngineError> {
        let user = self
            .store
            .update_user(user_id, |u| u.batch = batch)
            .ok_or_else(|| EngineError::NotFound(format!("user {user_id}")))?;
        info!(user = %user_id, %batch, "batch changed");
        Ok(user)
    }
}
