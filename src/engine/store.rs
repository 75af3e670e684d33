use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::model::*;

pub type SharedDayState = Arc<RwLock<DayState>>;

/// Everything recorded for one calendar date: bookings and locks keyed by
/// seat, leaves keyed by user, plus a user → booked seats index.
#[derive(Debug, Clone)]
pub struct DayState {
    pub date: NaiveDate,
    bookings: BTreeMap<SeatId, Booking>,
    locks: BTreeMap<SeatId, Lock>,
    leaves: HashMap<UserId, Leave>,
    seats_by_user: HashMap<UserId, BTreeSet<SeatId>>,
}

impl DayState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            bookings: BTreeMap::new(),
            locks: BTreeMap::new(),
            leaves: HashMap::new(),
            seats_by_user: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.bookings.clear();
        self.locks.clear();
        self.leaves.clear();
        self.seats_by_user.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty() && self.locks.is_empty() && self.leaves.is_empty()
    }

    // ── Bookings ─────────────────────────────────────────────

    pub fn booking(&self, seat_id: SeatId) -> Option<&Booking> {
        self.bookings.get(&seat_id)
    }

    pub fn bookings(&self) -> impl Iterator<Item = &Booking> {
        self.bookings.values()
    }

    pub fn user_seats(&self, user_id: &str) -> Vec<SeatId> {
        self.seats_by_user
            .get(user_id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn user_bookings<'a>(&'a self, user_id: &str) -> impl Iterator<Item = &'a Booking> + use<'a> {
        self.user_seats(user_id)
            .into_iter()
            .filter_map(move |seat| self.bookings.get(&seat))
    }

    pub fn has_booking_by(&self, user_id: &str) -> bool {
        self.seats_by_user.get(user_id).is_some_and(|s| !s.is_empty())
    }

    /// Insert a booking. The caller has already checked the seat is free.
    pub fn insert_booking(&mut self, booking: Booking) {
        debug_assert_eq!(booking.date, self.date);
        if let Some(previous) = self.bookings.remove(&booking.seat_id) {
            self.unindex(&previous);
        }
        self.seats_by_user
            .entry(booking.user_id.clone())
            .or_default()
            .insert(booking.seat_id);
        self.bookings.insert(booking.seat_id, booking);
    }

    pub fn remove_booking(&mut self, seat_id: SeatId) -> Option<Booking> {
        let removed = self.bookings.remove(&seat_id)?;
        self.unindex(&removed);
        Some(removed)
    }

    fn unindex(&mut self, booking: &Booking) {
        if let Some(seats) = self.seats_by_user.get_mut(&booking.user_id) {
            seats.remove(&booking.seat_id);
            if seats.is_empty() {
                self.seats_by_user.remove(&booking.user_id);
            }
        }
    }

    // ── Locks ────────────────────────────────────────────────

    /// Raw lock entry, live or not.
    pub fn lock(&self, seat_id: SeatId) -> Option<&Lock> {
        self.locks.get(&seat_id)
    }

    pub fn live_lock(&self, seat_id: SeatId, now: Timestamp) -> Option<&Lock> {
        self.locks.get(&seat_id).filter(|l| l.is_live(now))
    }

    pub fn live_locks(&self, now: Timestamp) -> impl Iterator<Item = &Lock> {
        self.locks.values().filter(move |l| l.is_live(now))
    }

    /// Set or replace the lock on a seat.
    pub fn set_lock(&mut self, lock: Lock) {
        debug_assert_eq!(lock.date, self.date);
        self.locks.insert(lock.seat_id, lock);
    }

    pub fn remove_lock(&mut self, seat_id: SeatId) -> Option<Lock> {
        self.locks.remove(&seat_id)
    }

    pub fn remove_user_locks(&mut self, user_id: &str) -> Vec<Lock> {
        let seats: Vec<SeatId> = self
            .locks
            .values()
            .filter(|l| l.user_id == user_id)
            .map(|l| l.seat_id)
            .collect();
        seats.into_iter().filter_map(|s| self.locks.remove(&s)).collect()
    }

    /// Physically drop every lock that is no longer live.
    pub fn purge_expired_locks(&mut self, now: Timestamp) -> Vec<Lock> {
        let expired: Vec<SeatId> = self
            .locks
            .values()
            .filter(|l| !l.is_live(now))
            .map(|l| l.seat_id)
            .collect();
        expired.into_iter().filter_map(|s| self.locks.remove(&s)).collect()
    }

    pub fn expired_lock_count(&self, now: Timestamp) -> usize {
        self.locks.values().filter(|l| !l.is_live(now)).count()
    }

    // ── Leaves ───────────────────────────────────────────────

    pub fn is_on_leave(&self, user_id: &str) -> bool {
        self.leaves.contains_key(user_id)
    }

    pub fn leaves(&self) -> impl Iterator<Item = &Leave> {
        self.leaves.values()
    }

    /// Returns false if the user already had a leave for this date.
    pub fn insert_leave(&mut self, leave: Leave) -> bool {
        debug_assert_eq!(leave.date, self.date);
        if self.leaves.contains_key(&leave.user_id) {
            return false;
        }
        self.leaves.insert(leave.user_id.clone(), leave);
        true
    }
}

/// Process-wide configuration: seat catalog, rotation schedule, holidays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Office {
    pub seats: BTreeMap<SeatId, Seat>,
    pub schedule: BatchSchedule,
    pub holidays: BTreeSet<NaiveDate>,
}

impl Office {
    /// Seats `1..=seat_count`; the last `floater_seats` are floaters, the rest
    /// designated and unassigned.
    pub fn with_layout(seat_count: u32, floater_seats: u32) -> Self {
        let first_floater = seat_count.saturating_sub(floater_seats) + 1;
        let seats = (1..=seat_count)
            .map(|seat_id| {
                let seat_type = if seat_id >= first_floater {
                    SeatType::Floater
                } else {
                    SeatType::Designated
                };
                (seat_id, Seat { seat_id, seat_type, owner: None })
            })
            .collect();
        Self {
            seats,
            schedule: BatchSchedule::default(),
            holidays: BTreeSet::new(),
        }
    }

    pub fn seat(&self, seat_id: SeatId) -> Option<&Seat> {
        self.seats.get(&seat_id)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }
}

/// In-memory home of all mutable state. Created with defaults, served behind
/// per-date guards, and reinitialized by an admin reset.
pub struct InMemoryStore {
    days: DashMap<NaiveDate, SharedDayState>,
    office: RwLock<Office>,
    users: DashMap<UserId, User>,
    seat_count: u32,
    floater_seats: u32,
}

impl InMemoryStore {
    pub fn new(seat_count: u32, floater_seats: u32) -> Self {
        Self {
            days: DashMap::new(),
            office: RwLock::new(Office::with_layout(seat_count, floater_seats)),
            users: DashMap::new(),
            seat_count,
            floater_seats,
        }
    }

    pub fn default_office(&self) -> Office {
        Office::with_layout(self.seat_count, self.floater_seats)
    }

    // ── Per-date state ───────────────────────────────────────

    pub fn day(&self, date: &NaiveDate) -> Option<SharedDayState> {
        self.days.get(date).map(|e| e.value().clone())
    }

    pub fn day_or_create(&self, date: NaiveDate) -> SharedDayState {
        self.days
            .entry(date)
            .or_insert_with(|| Arc::new(RwLock::new(DayState::new(date))))
            .value()
            .clone()
    }

    /// Known dates in ascending order (the lock acquisition order).
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.days.iter().map(|e| *e.key()).collect();
        dates.sort();
        dates
    }

    /// Drop a date with nothing recorded on it. Skipped while anyone else
    /// holds the state, so a handle taken by `day_or_create` never goes stale.
    pub fn prune_day(&self, date: &NaiveDate) -> bool {
        self.days
            .remove_if(date, |_, rs| {
                Arc::strong_count(rs) == 1 && rs.try_read().is_ok_and(|day| day.is_empty())
            })
            .is_some()
    }

    // ── Office configuration ─────────────────────────────────

    pub fn office(&self) -> &RwLock<Office> {
        &self.office
    }

    // ── User directory ───────────────────────────────────────

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn user(&self, user_id: &str) -> Option<User> {
        self.users.get(user_id).map(|e| e.value().clone())
    }

    /// Returns false if the id is taken.
    pub fn insert_user(&self, user: User) -> bool {
        match self.users.entry(user.user_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(user);
                true
            }
        }
    }

    /// Apply `f` to a stored user and return the updated copy.
    pub fn update_user(&self, user_id: &str, f: impl FnOnce(&mut User)) -> Option<User> {
        let mut entry = self.users.get_mut(user_id)?;
        f(entry.value_mut());
        Some(entry.value().clone())
    }

    pub fn users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        users
    }

    pub fn user_ids(&self) -> Vec<UserId> {
        self.users.iter().map(|e| e.key().clone()).collect()
    }
}
