use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

pub type SeatId = u32;
pub type UserId = String;

/// Absolute instant; dates without time use `NaiveDate`.
pub type Timestamp = DateTime<Utc>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatType {
    Designated,
    Floater,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Batch {
    Batch1,
    Batch2,
}

impl std::fmt::Display for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Batch::Batch1 => write!(f, "batch1"),
            Batch::Batch2 => write!(f, "batch2"),
        }
    }
}

/// Rotation week: odd ISO weeks are `Week1`, even ISO weeks are `Week2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekParity {
    Week1,
    Week2,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub seat_id: SeatId,
    pub seat_type: SeatType,
    /// Only meaningful when `seat_type` is `Designated`.
    pub owner: Option<UserId>,
}

impl Seat {
    pub fn designated_owner(&self) -> Option<&str> {
        match self.seat_type {
            SeatType::Designated => self.owner.as_deref(),
            SeatType::Floater => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub batch: Batch,
    pub designated_seat: Option<SeatId>,
    pub floater_leave_count: u32,
    pub is_admin: bool,
}

impl User {
    pub fn new(user_id: impl Into<UserId>, batch: Batch, is_admin: bool) -> Self {
        Self {
            user_id: user_id.into(),
            batch,
            designated_seat: None,
            floater_leave_count: 0,
            is_admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub date: NaiveDate,
    pub seat_id: SeatId,
    pub user_id: UserId,
    pub booked_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub date: NaiveDate,
    pub seat_id: SeatId,
    pub user_id: UserId,
    pub expires_at: Timestamp,
}

impl Lock {
    /// A lock whose expiry is at or before `now` is inert.
    pub fn is_live(&self, now: Timestamp) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leave {
    pub date: NaiveDate,
    pub user_id: UserId,
    /// Designated seat the user held when the leave was recorded.
    pub seat_id: Option<SeatId>,
}

/// Weekdays a batch attends in each rotation week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationDays {
    pub week1: Vec<Weekday>,
    pub week2: Vec<Weekday>,
}

impl RotationDays {
    pub fn days(&self, week: WeekParity) -> &[Weekday] {
        match week {
            WeekParity::Week1 => &self.week1,
            WeekParity::Week2 => &self.week2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSchedule {
    pub batch1: RotationDays,
    pub batch2: RotationDays,
}

impl Default for BatchSchedule {
    fn default() -> Self {
        use Weekday::*;
        Self {
            batch1: RotationDays {
                week1: vec![Mon, Tue, Wed],
                week2: vec![Thu, Fri],
            },
            batch2: RotationDays {
                week1: vec![Thu, Fri],
                week2: vec![Mon, Tue, Wed],
            },
        }
    }
}

impl BatchSchedule {
    pub fn rotation(&self, batch: Batch) -> &RotationDays {
        match batch {
            Batch::Batch1 => &self.batch1,
            Batch::Batch2 => &self.batch2,
        }
    }

    pub fn attends(&self, batch: Batch, week: WeekParity, weekday: Weekday) -> bool {
        self.rotation(batch).days(week).contains(&weekday)
    }
}

// ── Read model ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Available,
    Locked,
    Occupied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatView {
    pub seat_id: SeatId,
    pub seat_type: SeatType,
    /// `Floater` for a designated seat whose owner is on leave that day.
    pub effective_type: SeatType,
    pub owner: Option<UserId>,
    pub owner_on_leave: bool,
    pub status: SeatStatus,
    pub booked_by: Option<UserId>,
    pub locked_by: Option<UserId>,
    pub expires_at: Option<Timestamp>,
    pub is_my_designated: bool,
    pub is_my_booking: bool,
    pub is_my_lock: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySummary {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub week: WeekParity,
    pub cycle_start: NaiveDate,
    pub cycle_end: NaiveDate,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub is_batch_day: bool,
    pub on_leave: bool,
    pub attended_days: usize,
    pub required_days: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatState {
    pub date: NaiveDate,
    pub seats: Vec<SeatView>,
    pub policy: PolicySummary,
}

/// Change feed events, one stream per date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SeatEvent {
    LocksAcquired { date: NaiveDate, user_id: UserId, seat_ids: Vec<SeatId> },
    LocksReleased { date: NaiveDate, user_id: UserId, seat_ids: Vec<SeatId> },
    BookingsConfirmed { date: NaiveDate, user_id: UserId, seat_ids: Vec<SeatId> },
    BookingsCancelled { date: NaiveDate, user_id: UserId, seat_ids: Vec<SeatId> },
    LeaveMarked { date: NaiveDate, user_id: UserId },
    DateReset { date: NaiveDate },
}
