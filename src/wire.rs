//! Newline-delimited JSON over TCP.
//!
//! Each request line is an object with an `op` tag, an optional session
//! `token` and the op's arguments. Each request gets exactly one response
//! line, in order. After `subscribe`, seat events for that date are pushed
//! as extra lines carrying an `event` tag.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, warn};

use crate::api::{ActionResponse, SeatService};
use crate::engine::EngineError;
use crate::limits::MAX_LINE_LEN;
use crate::model::*;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(flatten)]
    pub op: Op,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Signup { user_id: String, batch: Batch },
    Logout,
    GetSeatState { date: NaiveDate },
    AcquireLocks { date: NaiveDate, seat_ids: Vec<SeatId> },
    ReleaseLocks { date: NaiveDate, seat_ids: Vec<SeatId> },
    ConfirmBooking { date: NaiveDate, seat_ids: Vec<SeatId> },
    CancelBooking { date: NaiveDate, seat_ids: Vec<SeatId> },
    MarkLeave { date: NaiveDate },
    ListOwnBookings,
    Subscribe { date: NaiveDate },
    GetBatchSchedule,
    ListHolidays,

    ResetAll,
    ForceCancel { date: NaiveDate, seat_id: SeatId },
    ReplaceBatchSchedule { schedule: BatchSchedule },
    SetSeatType { seat_id: SeatId, seat_type: SeatType },
    AssignDesignatedSeat { user_id: UserId, seat_id: SeatId },
    ToggleHoliday { date: NaiveDate, is_holiday: bool },
    SetUserBatch { user_id: UserId, batch: Batch },
    ListAllBookings,
    ListLeaves,
    ListUsers,
}

impl Request {
    pub fn parse(line: &str) -> Result<Self, EngineError> {
        serde_json::from_str(line).map_err(|e| EngineError::Validation(format!("bad request: {e}")))
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({ "success": false, "message": e.to_string() }))
}

fn failed(err: &EngineError) -> Value {
    to_value(&ActionResponse::failed(err))
}

/// Reads answer `{ "success": true, "data": ... }` or the usual failure envelope.
fn data<T: Serialize>(result: Result<T, EngineError>) -> Value {
    match result {
        Ok(value) => json!({ "success": true, "data": to_value(&value) }),
        Err(e) => failed(&e),
    }
}

/// Run one request. Subscriptions are recorded on the caller's connection.
pub async fn dispatch(service: &SeatService, request: Request, subscriptions: &mut Subscriptions) -> Value {
    let token = request.token.as_deref().unwrap_or_default();
    match request.op {
        Op::Signup { user_id, batch } => data(service.signup(&user_id, batch, false)),
        Op::Logout => to_value(&service.logout(token)),
        Op::GetSeatState { date } => data(service.get_seat_state(token, date).await),
        Op::AcquireLocks { date, seat_ids } => to_value(&service.acquire_locks(token, date, &seat_ids).await),
        Op::ReleaseLocks { date, seat_ids } => to_value(&service.release_locks(token, date, &seat_ids).await),
        Op::ConfirmBooking { date, seat_ids } => to_value(&service.confirm_booking(token, date, &seat_ids).await),
        Op::CancelBooking { date, seat_ids } => to_value(&service.cancel_booking(token, date, &seat_ids).await),
        Op::MarkLeave { date } => to_value(&service.mark_leave(token, date).await),
        Op::ListOwnBookings => data(service.list_own_bookings(token).await),
        Op::GetBatchSchedule => data(service.batch_schedule(token).await),
        Op::ListHolidays => data(service.holidays(token).await),
        Op::Subscribe { date } => match service.subscribe(token, date).await {
            Ok(rx) => {
                if subscriptions.follow(date, rx) {
                    to_value(&ActionResponse::ok(format!("subscribed to {date}")))
                } else {
                    to_value(&ActionResponse::ok(format!("already subscribed to {date}")))
                }
            }
            Err(e) => failed(&e),
        },

        Op::ResetAll => to_value(&service.reset_all(token).await),
        Op::ForceCancel { date, seat_id } => to_value(&service.force_cancel(token, date, seat_id).await),
        Op::ReplaceBatchSchedule { schedule } => to_value(&service.replace_batch_schedule(token, schedule).await),
        Op::SetSeatType { seat_id, seat_type } => to_value(&service.set_seat_type(token, seat_id, seat_type).await),
        Op::AssignDesignatedSeat { user_id, seat_id } => {
            to_value(&service.assign_designated_seat(token, &user_id, seat_id).await)
        }
        Op::ToggleHoliday { date, is_holiday } => to_value(&service.toggle_holiday(token, date, is_holiday).await),
        Op::SetUserBatch { user_id, batch } => to_value(&service.set_user_batch(token, &user_id, batch).await),
        Op::ListAllBookings => data(service.list_all_bookings(token).await),
        Op::ListLeaves => data(service.list_leaves(token).await),
        Op::ListUsers => data(service.list_users(token).await),
    }
}

/// Dates one connection follows, each fed by a forwarding task into the
/// connection's outbound queue. Tasks end when this is dropped.
pub struct Subscriptions {
    tx: mpsc::Sender<SeatEvent>,
    tasks: HashMap<NaiveDate, JoinHandle<()>>,
}

impl Subscriptions {
    pub fn new(tx: mpsc::Sender<SeatEvent>) -> Self {
        Self { tx, tasks: HashMap::new() }
    }

    /// Start forwarding `rx`. Returns false, dropping `rx`, if `date` is
    /// already followed.
    pub fn follow(&mut self, date: NaiveDate, rx: broadcast::Receiver<SeatEvent>) -> bool {
        if self.tasks.get(&date).is_some_and(|t| !t.is_finished()) {
            return false;
        }
        let task = tokio::spawn(forward_events(rx, self.tx.clone()));
        self.tasks.insert(date, task);
        true
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        for task in self.tasks.values() {
            task.abort();
        }
    }
}

async fn forward_events(mut rx: broadcast::Receiver<SeatEvent>, tx: mpsc::Sender<SeatEvent>) {
    loop {
        let received = tokio::select! {
            received = rx.recv() => received,
            _ = tx.closed() => return,
        };
        match received {
            Ok(event) => {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("subscriber lagged, dropped {n} events");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Serve one client until it disconnects.
pub async fn process_connection<S>(
    socket: S,
    service: Arc<SeatService>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(socket, LinesCodec::new_with_max_length(MAX_LINE_LEN));
    let (events_tx, mut events_rx) = mpsc::channel::<SeatEvent>(64);
    let mut subscriptions = Subscriptions::new(events_tx);

    loop {
        tokio::select! {
            line = framed.next() => {
                let reply = match line {
                    None => break,
                    Some(Ok(line)) if line.trim().is_empty() => continue,
                    Some(Ok(line)) => match Request::parse(&line) {
                        Ok(request) => dispatch(&service, request, &mut subscriptions).await,
                        Err(e) => failed(&e),
                    },
                    Some(Err(LinesCodecError::MaxLineLengthExceeded)) => failed(&EngineError::Validation(
                        format!("request exceeds {MAX_LINE_LEN} bytes"),
                    )),
                    Some(Err(LinesCodecError::Io(e))) => return Err(e.into()),
                };
                framed.send(reply.to_string()).await?;
            }
            Some(event) = events_rx.recv() => {
                framed.send(to_value(&event).to_string()).await?;
            }
        }
    }
    debug!("client disconnected");
    Ok(())
}
