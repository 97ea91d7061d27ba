//! Hourly maintenance sweep.
//!
//! Deletes expired and already-spent one-time codes, plus sessions idle for
//! longer than [`SESSION_IDLE_DAYS`]. Spawned once at startup; a failed
//! pass logs and waits for the next tick.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{error, info};

use crate::db::repo::{code_repository, session_repository};

const SWEEP_INTERVAL_SECS: u64 = 3600;
/// Sessions untouched for this many days are considered abandoned.
pub const SESSION_IDLE_DAYS: i64 = 30;

/// Runs the sweep forever. Callers spawn this on its own task.
pub async fn run(pool: PgPool) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS));
    // The first tick fires immediately; skip it so startup is not a sweep.
    interval.tick().await;
    loop {
        interval.tick().await;
        sweep(&pool).await;
    }
}

async fn sweep(pool: &PgPool) {
    match code_repository::delete_spent(pool).await {
        Ok(deleted) if deleted > 0 => info!("Cleanup removed {} spent one-time codes", deleted),
        Ok(_) => {}
        Err(e) => error!("Cleanup failed deleting spent codes: {:?}", e),
    }

    let cutoff = Utc::now() - Duration::days(SESSION_IDLE_DAYS);
    match session_repository::delete_idle_since(pool, cutoff).await {
        Ok(deleted) if deleted > 0 => info!("Cleanup removed {} idle sessions", deleted),
        Ok(_) => {}
        Err(e) => error!("Cleanup failed deleting idle sessions: {:?}", e),
    }
}
