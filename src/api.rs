//! One operation per endpoint, for whatever transport sits in front.
//!
//! Mutations answer with `success`/`message` envelopes; reads return data or
//! an error. Every call resolves the caller from its session token first.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

use crate::auth::{CallerResolver, SessionDirectory};
use crate::engine::{Engine, EngineError};
use crate::model::*;
use crate::observability::record_request;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    /// Error class when `success` is false; `conflict` means re-fetch and retry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), error: None }
    }

    pub fn failed(err: &EngineError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            error: Some(err.kind().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockResponse {
    #[serde(flatten)]
    pub status: ActionResponse,
    pub locked_seats: Vec<SeatId>,
    pub expires_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingResponse {
    #[serde(flatten)]
    pub status: ActionResponse,
    pub booked_seats: Vec<SeatId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupResponse {
    pub user: User,
    pub token: String,
}

fn seat_list(seats: &[SeatId]) -> String {
    seats.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(", ")
}

fn observe<T>(op: &'static str, started: Instant, result: &Result<T, EngineError>) {
    let status = match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    record_request(op, status, started.elapsed());
}

pub struct SeatService {
    engine: Arc<Engine>,
    sessions: Arc<SessionDirectory>,
}

impl SeatService {
    pub fn new(engine: Arc<Engine>, sessions: Arc<SessionDirectory>) -> Self {
        Self { engine, sessions }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    async fn caller(&self, token: &str) -> Result<User, EngineError> {
        self.sessions.resolve_caller(token).await
    }

    async fn admin(&self, token: &str) -> Result<User, EngineError> {
        let user = self.caller(token).await?;
        self.sessions.require_admin(&user)?;
        Ok(user)
    }

    /// Register a user and open a session for them.
    pub fn signup(&self, user_id: &str, batch: Batch, is_admin: bool) -> Result<SignupResponse, EngineError> {
        let started = Instant::now();
        let result = self.engine.register_user(user_id, batch, is_admin).map(|user| {
            let token = self.sessions.issue(&user.user_id).to_string();
            SignupResponse { user, token }
        });
        observe("signup", started, &result);
        result
    }

    pub fn logout(&self, token: &str) -> ActionResponse {
        if self.sessions.revoke(token) {
            ActionResponse::ok("logged out")
        } else {
            ActionResponse::failed(&EngineError::Unauthenticated)
        }
    }

    pub async fn get_seat_state(&self, token: &str, date: NaiveDate) -> Result<SeatState, EngineError> {
        let started = Instant::now();
        let result = async {
            let user = self.caller(token).await?;
            self.engine.seat_state(&user.user_id, date).await
        }
        .await;
        observe("get_seat_state", started, &result);
        result
    }

    pub async fn acquire_locks(&self, token: &str, date: NaiveDate, seat_ids: &[SeatId]) -> LockResponse {
        let started = Instant::now();
        let result = async {
            let user = self.caller(token).await?;
            self.engine.acquire_locks(&user.user_id, date, seat_ids).await
        }
        .await;
        observe("acquire_locks", started, &result);
        match result {
            Ok(locks) => {
                let seats: Vec<SeatId> = locks.iter().map(|l| l.seat_id).collect();
                LockResponse {
                    status: ActionResponse::ok(format!("seats {} held", seat_list(&seats))),
                    expires_at: locks.first().map(|l| l.expires_at),
                    locked_seats: seats,
                }
            }
            Err(e) => LockResponse {
                status: ActionResponse::failed(&e),
                locked_seats: Vec::new(),
                expires_at: None,
            },
        }
    }

    pub async fn release_locks(&self, token: &str, date: NaiveDate, seat_ids: &[SeatId]) -> ActionResponse {
        let started = Instant::now();
        let result = async {
            let user = self.caller(token).await?;
            self.engine.release_locks(&user.user_id, date, seat_ids).await
        }
        .await;
        observe("release_locks", started, &result);
        match result {
            Ok(released) if released.is_empty() => ActionResponse::ok("nothing to release"),
            Ok(released) => ActionResponse::ok(format!("released seats {}", seat_list(&released))),
            Err(e) => ActionResponse::failed(&e),
        }
    }

    pub async fn confirm_booking(&self, token: &str, date: NaiveDate, seat_ids: &[SeatId]) -> BookingResponse {
        let started = Instant::now();
        let result = async {
            let user = self.caller(token).await?;
            self.engine.confirm_booking(&user.user_id, date, seat_ids).await
        }
        .await;
        observe("confirm_booking", started, &result);
        match result {
            Ok(bookings) => {
                let seats: Vec<SeatId> = bookings.iter().map(|b| b.seat_id).collect();
                BookingResponse {
                    status: ActionResponse::ok(format!("booked seats {} for {date}", seat_list(&seats))),
                    booked_seats: seats,
                }
            }
            Err(e) => BookingResponse {
                status: ActionResponse::failed(&e),
                booked_seats: Vec::new(),
            },
        }
    }

    pub async fn cancel_booking(&self, token: &str, date: NaiveDate, seat_ids: &[SeatId]) -> ActionResponse {
        let started = Instant::now();
        let result = async {
            let user = self.caller(token).await?;
            self.engine.cancel_booking(&user.user_id, date, seat_ids).await
        }
        .await;
        observe("cancel_booking", started, &result);
        match result {
            Ok(seats) => ActionResponse::ok(format!("cancelled seats {} for {date}", seat_list(&seats))),
            Err(e) => ActionResponse::failed(&e),
        }
    }

    pub async fn mark_leave(&self, token: &str, date: NaiveDate) -> ActionResponse {
        let started = Instant::now();
        let result = async {
            let user = self.caller(token).await?;
            self.engine.mark_leave(&user.user_id, date).await
        }
        .await;
        observe("mark_leave", started, &result);
        match result {
            Ok(outcome) if !outcome.created => ActionResponse::ok(format!("already on leave on {date}")),
            Ok(outcome) if outcome.cancelled.is_empty() => ActionResponse::ok(format!("leave recorded for {date}")),
            Ok(outcome) => ActionResponse::ok(format!(
                "leave recorded for {date}; cancelled seats {}",
                seat_list(&outcome.cancelled)
            )),
            Err(e) => ActionResponse::failed(&e),
        }
    }

    pub async fn list_own_bookings(&self, token: &str) -> Result<Vec<Booking>, EngineError> {
        let started = Instant::now();
        let result = async {
            let user = self.caller(token).await?;
            self.engine.list_user_bookings(&user.user_id).await
        }
        .await;
        observe("list_own_bookings", started, &result);
        result
    }

    pub async fn subscribe(&self, token: &str, date: NaiveDate) -> Result<broadcast::Receiver<SeatEvent>, EngineError> {
        self.caller(token).await?;
        Ok(self.engine.notify.subscribe(date))
    }

    // ── Admin ────────────────────────────────────────────────

    async fn admin_action<T, F, Fut>(
        &self,
        op: &'static str,
        token: &str,
        action: F,
        describe: impl FnOnce(T) -> String,
    ) -> ActionResponse
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let started = Instant::now();
        let result = match self.admin(token).await {
            Ok(_) => action().await,
            Err(e) => Err(e),
        };
        observe(op, started, &result);
        match result {
            Ok(value) => ActionResponse::ok(describe(value)),
            Err(e) => {
                if matches!(e, EngineError::NotFound(_)) {
                    warn!(op, "admin request failed: {e}");
                }
                ActionResponse::failed(&e)
            }
        }
    }

    pub async fn reset_all(&self, token: &str) -> ActionResponse {
        self.admin_action(
            "reset_all",
            token,
            move || async move {
                self.engine.reset_all().await;
                Ok(())
            },
            |()| "all bookings, locks, leaves and seat settings reset".to_string(),
        )
        .await
    }

    pub async fn force_cancel(&self, token: &str, date: NaiveDate, seat_id: SeatId) -> ActionResponse {
        self.admin_action(
            "force_cancel",
            token,
            move || async move { self.engine.force_cancel(date, seat_id).await },
            |b| format!("cancelled {}'s booking of seat {} on {}", b.user_id, b.seat_id, b.date),
        )
        .await
    }

    pub async fn replace_batch_schedule(&self, token: &str, schedule: BatchSchedule) -> ActionResponse {
        self.admin_action(
            "replace_batch_schedule",
            token,
            move || async move {
                self.engine.replace_batch_schedule(schedule).await;
                Ok(())
            },
            |()| "batch schedule updated".to_string(),
        )
        .await
    }

    pub async fn set_seat_type(&self, token: &str, seat_id: SeatId, seat_type: SeatType) -> ActionResponse {
        self.admin_action(
            "set_seat_type",
            token,
            move || async move { self.engine.set_seat_type(seat_id, seat_type).await },
            |seat| format!("seat {} is now {:?}", seat.seat_id, seat.seat_type).to_lowercase(),
        )
        .await
    }

    pub async fn assign_designated_seat(&self, token: &str, user_id: &str, seat_id: SeatId) -> ActionResponse {
        self.admin_action(
            "assign_designated_seat",
            token,
            move || async move { self.engine.assign_designated_seat(user_id, seat_id).await },
            |seat| format!("seat {} assigned to {user_id}", seat.seat_id),
        )
        .await
    }

    pub async fn toggle_holiday(&self, token: &str, date: NaiveDate, is_holiday: bool) -> ActionResponse {
        self.admin_action(
            "toggle_holiday",
            token,
            move || async move { Ok(self.engine.toggle_holiday(date, is_holiday).await) },
            |changed| match (changed, is_holiday) {
                (false, _) => format!("{date} unchanged"),
                (true, true) => format!("{date} marked as holiday"),
                (true, false) => format!("{date} is no longer a holiday"),
            },
        )
        .await
    }

    pub async fn set_user_batch(&self, token: &str, user_id: &str, batch: Batch) -> ActionResponse {
        self.admin_action(
            "set_user_batch",
            token,
            move || async move { self.engine.set_user_batch(user_id, batch) },
            |user| format!("{} moved to {}", user.user_id, user.batch),
        )
        .await
    }

    pub async fn list_all_bookings(&self, token: &str) -> Result<Vec<Booking>, EngineError> {
        self.admin(token).await?;
        Ok(self.engine.list_all_bookings().await)
    }

    pub async fn list_leaves(&self, token: &str) -> Result<Vec<Leave>, EngineError> {
        self.admin(token).await?;
        Ok(self.engine.list_leaves().await)
    }

    pub async fn batch_schedule(&self, token: &str) -> Result<BatchSchedule, EngineError> {
        self.caller(token).await?;
        Ok(self.engine.batch_schedule().await)
    }

    pub async fn holidays(&self, token: &str) -> Result<Vec<NaiveDate>, EngineError> {
        self.caller(token).await?;
        Ok(self.engine.holidays().await)
    }

    pub async fn list_users(&self, token: &str) -> Result<Vec<User>, EngineError> {
        self.admin(token).await?;
        Ok(self.engine.list_users())
    }
}
