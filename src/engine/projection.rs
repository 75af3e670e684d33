use crate::model::*;

use super::store::{DayState, Office};

/// Derive the status of every catalog seat for `day.date`.
///
/// Booking beats live lock beats available. Expired locks are skipped here
/// whether or not they have been physically purged yet.
pub fn project_seats(office: &Office, day: &DayState, viewer: &User, now: Timestamp) -> Vec<SeatView> {
    office
        .seats
        .values()
        .map(|seat| {
            let owner_on_leave = seat
                .designated_owner()
                .is_some_and(|owner| day.is_on_leave(owner));
            let effective_type = if owner_on_leave {
                SeatType::Floater
            } else {
                seat.seat_type
            };
            let is_my_designated = seat.designated_owner() == Some(viewer.user_id.as_str());

            let mut view = SeatView {
                seat_id: seat.seat_id,
                seat_type: seat.seat_type,
                effective_type,
                owner: seat.designated_owner().map(str::to_owned),
                owner_on_leave,
                status: SeatStatus::Available,
                booked_by: None,
                locked_by: None,
                expires_at: None,
                is_my_designated,
                is_my_booking: false,
                is_my_lock: false,
            };

            if let Some(booking) = day.booking(seat.seat_id) {
                view.status = SeatStatus::Occupied;
                view.is_my_booking = booking.user_id == viewer.user_id;
                view.booked_by = Some(booking.user_id.clone());
            } else if let Some(lock) = day.live_lock(seat.seat_id, now) {
                view.status = SeatStatus::Locked;
                view.is_my_lock = lock.user_id == viewer.user_id;
                view.locked_by = Some(lock.user_id.clone());
                view.expires_at = Some(lock.expires_at);
            }
            view
        })
        .collect()
}
