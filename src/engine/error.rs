#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed or missing input, unknown seat, cancelling a seat the caller does not hold.
    Validation(String),
    /// Weekend/holiday, leave, batch day, advance window, seat ownership.
    Policy(String),
    /// Seat already booked or locked by someone else. Re-fetch and retry.
    Conflict(String),
    /// Admin call naming an unknown user or seat.
    NotFound(String),
    AlreadyExists(String),
    Unauthenticated,
    Forbidden,
}

impl EngineError {
    /// Stable label for metrics and the wire protocol.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::Policy(_) => "policy",
            EngineError::Conflict(_) => "conflict",
            EngineError::NotFound(_) => "not_found",
            EngineError::AlreadyExists(_) => "already_exists",
            EngineError::Unauthenticated => "unauthenticated",
            EngineError::Forbidden => "forbidden",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "invalid request: {msg}"),
            EngineError::Policy(msg) => write!(f, "not allowed: {msg}"),
            EngineError::Conflict(msg) => write!(f, "conflict: {msg}"),
            EngineError::NotFound(what) => write!(f, "not found: {what}"),
            EngineError::AlreadyExists(what) => write!(f, "already exists: {what}"),
            EngineError::Unauthenticated => write!(f, "unauthenticated"),
            EngineError::Forbidden => write!(f, "admin privileges required"),
        }
    }
}

impl std::error::Error for EngineError {}
