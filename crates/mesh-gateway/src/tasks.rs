use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use mesh_db::Archive;

use crate::hub::Hub;
use crate::persist;

/// Periodically lower the engagement of ageing posts.
pub async fn run_decay_loop(hub: Hub, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await;

    loop {
        interval.tick().await;
        let changed = hub.decay_tick(Utc::now()).await;
        if changed > 0 {
            debug!("Decay: {} posts changed", changed);
        }
    }
}

/// Periodically sweep posts past their retention.
pub async fn run_cleanup_loop(hub: Hub, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await;

    loop {
        interval.tick().await;
        hub.sweep_expired(Utc::now()).await;
    }
}

/// Periodically copy important posts to the archive.
pub async fn run_backup_loop(hub: Hub, archive: Arc<Archive>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await;

    loop {
        interval.tick().await;
        persist::backup(&hub, archive.clone()).await;
    }
}
