use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::model::*;

use super::policy::{normalize_seat_ids, validate, Mode};
use super::{Engine, EngineError, SharedDayState};

impl Engine {
    /// Hold `seat_ids` for the caller for the lock TTL. All-or-nothing: one
    /// seat booked, or locked live by someone else, rejects the whole request.
    /// Re-locking a seat the caller already holds refreshes its expiry.
    pub async fn acquire_locks(
        &self,
        user_id: &str,
        date: NaiveDate,
        seat_ids: &[SeatId],
    ) -> Result<Vec<Lock>, EngineError> {
        let now = self.clock.now();
        let user = self.require_user(user_id)?;
        let seat_ids = normalize_seat_ids(seat_ids)?;

        let rs = self.store.day_or_create(date);
        let held = self.hold_seats(&rs, &user, &seat_ids, now).await;
        drop(rs);
        let locks = match held {
            Ok(locks) => locks,
            Err(e) => {
                self.store.prune_day(&date);
                return Err(e);
            }
        };

        info!(user = %user.user_id, %date, seats = ?seat_ids, "locks acquired");
        self.notify.send(
            date,
            &SeatEvent::LocksAcquired { date, user_id: user.user_id, seat_ids },
        );
        Ok(locks)
    }

    async fn hold_seats(
        &self,
        rs: &SharedDayState,
        user: &User,
        seat_ids: &[SeatId],
        now: Timestamp,
    ) -> Result<Vec<Lock>, EngineError> {
        let mut day = rs.write().await;
        day.purge_expired_locks(now);
        {
            let office = self.store.office().read().await;
            validate(&office, &day, user, seat_ids, self.local(now), Mode::Lock)?;
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

        let expires_at = now + self.config.lock_ttl;
        let locks: Vec<Lock> = seat_ids
            .iter()
            .map(|seat_id| Lock {
                date: day.date,
                seat_id: *seat_id,
                user_id: user.user_id.clone(),
                expires_at,
            })
            .collect();
        for lock in &locks {
            day.set_lock(lock.clone());
        }
        Ok(locks)
    }

    /// Drop the caller's locks on `seat_ids`. Seats the caller does not hold
    /// are skipped. Returns the seats actually released.
    pub async fn release_locks(
        &self,
        user_id: &str,
        date: NaiveDate,
        seat_ids: &[SeatId],
    ) -> Result<Vec<SeatId>, EngineError> {
        let user = self.require_user(user_id)?;
        let seat_ids = normalize_seat_ids(seat_ids)?;

        let Some(rs) = self.store.day(&date) else {
            return Ok(Vec::new());
        };
        let mut day = rs.write().await;
        let mut released = Vec::new();
        for seat_id in seat_ids {
            if day.lock(seat_id).is_some_and(|l| l.user_id == user.user_id) {
                day.remove_lock(seat_id);
                released.push(seat_id);
            }
        }
        drop(day);

        if !released.is_empty() {
            debug!(user = %user.user_id, %date, seats = ?released, "locks released");
            self.notify.send(
                date,
                &SeatEvent::LocksReleased {
                    date,
                    user_id: user.user_id,
                    seat_ids: released.clone(),
                },
            );
        }
        Ok(released)
    }

    /// Physically remove expired locks on every date and forget dates left
    /// empty. Returns how many locks were dropped.
    pub async fn reap_expired_locks(&self) -> usize {
        let now = self.clock.now();
        let mut reaped = 0;
        for date in self.store.dates() {
            let Some(rs) = self.store.day(&date) else {
                continue;
            };
            if rs.read().await.expired_lock_count(now) == 0 {
                drop(rs);
                self.store.prune_day(&date);
                continue;
            }
            let expired = rs.write().await.purge_expired_locks(now);
            drop(rs);
            self.store.prune_day(&date);
            reaped += expired.len();

            let mut by_user: BTreeMap<UserId, Vec<SeatId>> = BTreeMap::new();
            for lock in expired {
                by_user.entry(lock.user_id).or_default().push(lock.seat_id);
            }
            for (user_id, seat_ids) in by_user {
                self.notify
                    .send(date, &SeatEvent::LocksReleased { date, user_id, seat_ids });
            }
        }
        reaped
    }
}
