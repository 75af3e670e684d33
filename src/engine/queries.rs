use chrono::NaiveDate;

use crate::cycle::cycle_info;
use crate::model::*;

use super::policy::build_policy_summary;
use super::projection::project_seats;
use super::{Engine, EngineError};

impl Engine {
    /// Read model for one date as seen by `user_id`. Built fresh on every call.
    pub async fn seat_state(&self, user_id: &str, date: NaiveDate) -> Result<SeatState, EngineError> {
        let now = self.clock.now();
        let user = self.require_user(user_id)?;
        let attended = self.attended_days(&user.user_id, date).await;
        let day = self.day_snapshot(date).await;
        let office = self.store.office().read().await;

        let seats = project_seats(&office, &day, &user, now);
        let policy = build_policy_summary(&office, &day, &user, attended, self.local(now));
        Ok(SeatState { date, seats, policy })
    }

    /// Distinct dates in `date`'s cycle on which the user holds a booking.
    pub async fn attended_days(&self, user_id: &str, date: NaiveDate) -> usize {
        let mut attended = 0;
        for day in cycle_info(date).dates() {
            if let Some(rs) = self.store.day(&day)
                && rs.read().await.has_booking_by(user_id)
            {
                attended += 1;
            }
        }
        attended
    }

    pub async fn list_user_bookings(&self, user_id: &str) -> Result<Vec<Booking>, EngineError> {
        let user = self.require_user(user_id)?;
        let mut bookings = Vec::new();
        for date in self.store.dates() {
            if let Some(rs) = self.store.day(&date) {
                let day = rs.read().await;
                bookings.extend(day.user_bookings(&user.user_id).cloned());
            }
        }
        Ok(bookings)
    }

    /// Every booking, ordered by date then seat.
    pub async fn list_all_bookings(&self) -> Vec<Booking> {
        let mut bookings = Vec::new();
        for date in self.store.dates() {
            if let Some(rs) = self.store.day(&date) {
                bookings.extend(rs.read().await.bookings().cloned());
            }
        }
        bookings
    }

    /// Every leave, ordered by date then user.
    pub async fn list_leaves(&self) -> Vec<Leave> {
        let mut leaves = Vec::new();
        for date in self.store.dates() {
            if let Some(rs) = self.store.day(&date) {
                let day = rs.read().await;
                let mut on_date: Vec<Leave> = day.leaves().cloned().collect();
                on_date.sort_by(|a, b| a.user_id.cmp(&b.user_id));
                leaves.extend(on_date);
            }
        }
        leaves
    }

    pub fn list_users(&self) -> Vec<User> {
        self.store.users()
    }

    pub async fn seats(&self) -> Vec<Seat> {
        self.store.office().read().await.seats.values().cloned().collect()
    }
}
