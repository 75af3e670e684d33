//! Policy constants and input limits.

/// How long a seat lock lives before it becomes inert.
pub const LOCK_TTL_SECS: i64 = 120;

/// Max seats a single confirm may book.
pub const MAX_SEATS_PER_BOOKING: usize = 5;

/// Distinct in-office days expected per two-week cycle.
pub const REQUIRED_DAYS_PER_CYCLE: usize = 5;

/// Local hour at which booking for the next day opens.
pub const ADVANCE_BOOKING_OPEN_HOUR: u32 = 15;

/// Default office layout: seats `1..=DEFAULT_SEAT_COUNT`, the last
/// `DEFAULT_FLOATER_SEATS` of which are floaters.
pub const DEFAULT_SEAT_COUNT: u32 = 50;
pub const DEFAULT_FLOATER_SEATS: u32 = 10;

pub const MAX_SEAT_COUNT: u32 = 10_000;
pub const MAX_SEATS_PER_REQUEST: usize = 64;
pub const MAX_USER_ID_LEN: usize = 128;
pub const MAX_USERS: usize = 100_000;
pub const MAX_LINE_LEN: usize = 64 * 1024;
