use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::engine::Engine;

/// Background task that periodically removes expired seat locks.
pub async fn run_reaper(engine: Arc<Engine>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        reap_once(&engine).await;
    }
}

pub async fn reap_once(engine: &Engine) -> usize {
    let reaped = engine.reap_expired_locks().await;
    if reaped > 0 {
        metrics::counter!(crate::observability::LOCKS_REAPED_TOTAL).increment(reaped as u64);
        debug!("reaped {reaped} expired locks");
    }
    engine.notify.prune();
    reaped
}
