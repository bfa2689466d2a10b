//! Completed-play log behind the play report.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use mesh_db::Archive;
use mesh_feed::plays::report_csv;
use mesh_types::models::Play;

/// Plays go to the archive when one is configured. Without one, or when a
/// write fails, they are held in memory until the process exits.
pub struct PlayLog {
    archive: Option<Arc<Archive>>,
    pending: Mutex<Vec<Play>>,
}

impl PlayLog {
    pub fn new(archive: Option<Arc<Archive>>) -> Self {
        Self {
            archive,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub async fn record(&self, play: Play) {
        if let Some(archive) = &self.archive {
            let archive = archive.clone();
            let row = play.clone();
            match tokio::task::spawn_blocking(move || archive.record_play(&row)).await {
                Ok(Ok(())) => {
                    debug!("Play of {} archived", play.song_id);
                    return;
                }
                Ok(Err(e)) => warn!("Play archive failed, keeping it in memory: {}", e),
                Err(e) => error!("spawn_blocking join error: {}", e),
            }
        }
        self.pending.lock().await.push(play);
    }

    /// Archived plays first, then the ones held in memory.
    pub async fn all(&self) -> Vec<Play> {
        let mut plays = match &self.archive {
            Some(archive) => {
                let archive = archive.clone();
                match tokio::task::spawn_blocking(move || archive.load_plays()).await {
                    Ok(Ok(plays)) => plays,
                    Ok(Err(e)) => {
                        warn!("Play archive unreadable, reporting memory only: {}", e);
                        Vec::new()
                    }
                    Err(e) => {
                        error!("spawn_blocking join error: {}", e);
                        Vec::new()
                    }
                }
            }
            None => Vec::new(),
        };
        plays.extend(self.pending.lock().await.iter().cloned());
        plays
    }

    pub async fn report(&self) -> String {
        report_csv(&self.all().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mesh_feed::plays::{REPORT_HEADER, new_play};

    #[tokio::test]
    async fn memory_only_log_keeps_plays() {
        let log = PlayLog::new(None);
        log.record(new_play("a", Some("bob"), 10.0, Utc::now()).unwrap()).await;
        log.record(new_play("b", None, 20.0, Utc::now()).unwrap()).await;

        let songs: Vec<_> = log.all().await.into_iter().map(|p| p.song_id).collect();
        assert_eq!(songs, vec!["a", "b"]);

        let report = log.report().await;
        assert!(report.starts_with(REPORT_HEADER));
        assert_eq!(report.lines().count(), 3);
    }

    #[tokio::test]
    async fn archived_plays_outlive_the_log() {
        let archive = Arc::new(Archive::open_in_memory().unwrap());
        let log = PlayLog::new(Some(archive.clone()));
        log.record(new_play("a", Some("bob"), 10.0, Utc::now()).unwrap()).await;
        drop(log);

        let reopened = PlayLog::new(Some(archive));
        let plays = reopened.all().await;
        assert_eq!(plays.len(), 1);
        assert_eq!(plays[0].song_id, "a");
    }
}
