//! Best-effort archive I/O. Everything here runs off the async runtime and
//! only logs failures; the live feed never depends on the outcome.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use mesh_db::Archive;
use mesh_types::models::Post;

use crate::hub::Hub;

/// Write posts to the archive, returning how many were new.
pub async fn save(archive: Arc<Archive>, posts: Vec<Post>) -> usize {
    if posts.is_empty() {
        return 0;
    }

    match tokio::task::spawn_blocking(move || archive.save_posts(&posts)).await {
        Ok(Ok(written)) => {
            if written > 0 {
                info!("Archived {} important posts", written);
            }
            written
        }
        Ok(Err(e)) => {
            warn!("Archive save failed: {}", e);
            0
        }
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            0
        }
    }
}

pub fn spawn_save(archive: Arc<Archive>, posts: Vec<Post>) {
    tokio::spawn(save(archive, posts));
}

/// Flag a post as resolved in the archive. Returns true if a row changed.
pub async fn mark_resolved(archive: Arc<Archive>, post_id: String) -> bool {
    let id = post_id.clone();
    match tokio::task::spawn_blocking(move || archive.mark_resolved(&id)).await {
        Ok(Ok(true)) => {
            info!("Post {} marked resolved in archive", post_id);
            true
        }
        Ok(Ok(false)) => false,
        Ok(Err(e)) => {
            warn!("Archive resolve failed for {}: {}", post_id, e);
            false
        }
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            false
        }
    }
}

/// Load archived posts into the hub. Called once at startup.
pub async fn restore(hub: &Hub, archive: Arc<Archive>) -> usize {
    let now_ms = Utc::now().timestamp_millis();
    let posts = match tokio::task::spawn_blocking(move || archive.load_active_posts(now_ms)).await {
        Ok(Ok(posts)) => posts,
        Ok(Err(e)) => {
            warn!("Archive load failed, starting with an empty feed: {}", e);
            return 0;
        }
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            return 0;
        }
    };

    let loaded = posts.len();
    let added = hub.import(posts).await;
    info!("Restored {} of {} archived posts", added, loaded);
    added
}

/// Save every important post currently in the feed.
pub async fn backup(hub: &Hub, archive: Arc<Archive>) -> usize {
    let posts = hub.important_posts().await;
    save(archive, posts).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::HubConfig;

    #[tokio::test]
    async fn backup_then_restore_into_fresh_hub() {
        let archive = Arc::new(Archive::open_in_memory().unwrap());

        let hub = Hub::new(HubConfig::default(), None);
        hub.create_post("ana", "hola", None).await.unwrap();
        let collab = hub.create_post("ana", "🤝 COLABORACIÓN: dueto", None).await.unwrap();

        assert_eq!(backup(&hub, archive.clone()).await, 1);
        assert_eq!(backup(&hub, archive.clone()).await, 0);

        let fresh = Hub::new(HubConfig::default(), None);
        assert_eq!(restore(&fresh, archive).await, 1);

        let posts = fresh.snapshot(10).await;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, collab.id);
        assert!(posts[0].is_persistent);
    }
}
