use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use ulid::Ulid;

use crate::engine::{Engine, EngineError};
use crate::model::{User, UserId};

/// Boundary to whatever issues credentials.
#[async_trait]
pub trait CallerResolver: Send + Sync {
    async fn resolve_caller(&self, token: &str) -> Result<User, EngineError>;

    fn require_admin(&self, user: &User) -> Result<(), EngineError> {
        if user.is_admin {
            Ok(())
        } else {
            Err(EngineError::Forbidden)
        }
    }
}

/// Opaque ULID session tokens mapped to user ids, resolved against the
/// engine's user directory on every call so admin changes show up at once.
pub struct SessionDirectory {
    engine: Arc<Engine>,
    sessions: DashMap<Ulid, UserId>,
}

impl SessionDirectory {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            sessions: DashMap::new(),
        }
    }

    pub fn issue(&self, user_id: &str) -> Ulid {
        let token = Ulid::new();
        self.sessions.insert(token, user_id.to_string());
        token
    }

    pub fn revoke(&self, token: &str) -> bool {
        match Ulid::from_string(token) {
            Ok(id) => self.sessions.remove(&id).is_some(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl CallerResolver for SessionDirectory {
    async fn resolve_caller(&self, token: &str) -> Result<User, EngineError> {
        let id = Ulid::from_string(token).map_err(|_| EngineError::Unauthenticated)?;
        let user_id = self
            .sessions
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(EngineError::Unauthenticated)?;
        self.engine
            .store()
            .user(&user_id)
            .ok_or(EngineError::Unauthenticated)
    }
}
