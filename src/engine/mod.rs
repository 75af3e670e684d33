mod admin;
mod clock;
mod error;
mod locks;
mod mutations;
mod policy;
mod projection;
mod queries;
mod store;
#[cfg(test)]
mod tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::EngineError;
pub use mutations::LeaveOutcome;
pub use policy::{build_policy_summary, validate, Mode};
pub use projection::project_seats;
pub use store::{DayState, InMemoryStore, Office, SharedDayState};

use std::sync::Arc;

use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};

use crate::limits::*;
use crate::model::*;
use crate::notify::NotifyHub;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub seat_count: u32,
    pub floater_seats: u32,
    /// Office wall-clock offset, used for the "tomorrow after 3 PM" rule.
    pub utc_offset: FixedOffset,
    pub lock_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seat_count: DEFAULT_SEAT_COUNT,
            floater_seats: DEFAULT_FLOATER_SEATS,
            utc_offset: Utc.fix(),
            lock_ttl: Duration::seconds(LOCK_TTL_SECS),
        }
    }
}

/// Seat allocation engine.
///
/// Lock order: date guards (ascending date), then the office configuration,
/// then the user directory. Every mutation holds its date's write guard from
/// validation through commit, so claims on a `(date, seat)` are check-and-set.
pub struct Engine {
    pub(super) store: InMemoryStore,
    pub(super) clock: Arc<dyn Clock>,
    pub notify: Arc<NotifyHub>,
    pub(super) config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>, notify: Arc<NotifyHub>) -> Self {
        let store = InMemoryStore::new(config.seat_count, config.floater_seats);
        Self::with_store(store, config, clock, notify)
    }

    pub fn with_store(
        store: InMemoryStore,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        notify: Arc<NotifyHub>,
    ) -> Self {
        Self { store, clock, notify, config }
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Office-local wall-clock time for an instant.
    pub(super) fn local(&self, now: Timestamp) -> NaiveDateTime {
        now.with_timezone(&self.config.utc_offset).naive_local()
    }

    pub(super) fn require_user(&self, user_id: &str) -> Result<User, EngineError> {
        self.store
            .user(user_id)
            .ok_or_else(|| EngineError::NotFound(format!("user {user_id}")))
    }

    /// Copy of a date's state; empty if nothing was ever recorded for it.
    pub(super) async fn day_snapshot(&self, date: NaiveDate) -> DayState {
        match self.store.day(&date) {
            Some(rs) => rs.read().await.clone(),
            None => DayState::new(date),
        }
    }
}
