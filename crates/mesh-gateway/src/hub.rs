use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use mesh_db::Archive;
use mesh_feed::playlist::DailyPlaylist;
use mesh_feed::store::{is_quick_reaction, validate_post};
use mesh_feed::{FeedConfig, FeedError, FeedStore, category, plays, policy};
use mesh_types::events::ServerEvent;
use mesh_types::models::{Post, PostType};

use crate::dispatcher::Dispatcher;
use crate::persist;
use crate::plays::PlayLog;
use crate::registry::{Frame, SessionId};

pub const WELCOME_MESSAGE: &str = "Welcome to MESH 🌟";

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub feed: FeedConfig,
    /// Number of posts in the `welcome` snapshot.
    pub welcome_limit: usize,
    pub playlist: DailyPlaylist,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            welcome_limit: 200,
            playlist: DailyPlaylist::default(),
        }
    }
}

/// Serial execution context around the feed.
///
/// Every mutation takes the single feed lock, applies the change and hands
/// the resulting event to the dispatcher before releasing it. Sessions
/// therefore see events in commit order, and timers go through the same lock
/// as client messages.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    feed: Mutex<FeedStore>,
    dispatcher: Dispatcher,
    playlist: DailyPlaylist,
    welcome_limit: usize,
    archive: Option<Arc<Archive>>,
    plays: PlayLog,
}

impl Hub {
    pub fn new(config: HubConfig, archive: Option<Arc<Archive>>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                feed: Mutex::new(FeedStore::new(config.feed)),
                dispatcher: Dispatcher::new(),
                playlist: config.playlist,
                welcome_limit: config.welcome_limit,
                plays: PlayLog::new(archive.clone()),
                archive,
            }),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn plays(&self) -> &PlayLog {
        &self.inner.plays
    }

    /// Register a session and queue its `welcome` snapshot ahead of any
    /// broadcast that commits after it.
    pub async fn open_session(&self) -> (SessionId, mpsc::UnboundedReceiver<Frame>) {
        let feed = self.inner.feed.lock().await;
        let (session_id, rx) = self.inner.dispatcher.register().await;

        let welcome = ServerEvent::Welcome {
            message: WELCOME_MESSAGE.to_string(),
            posts: feed.snapshot(self.inner.welcome_limit),
            daily_playlist: self.inner.playlist.for_day(Local::now().date_naive()),
        };
        self.inner.dispatcher.send_to(session_id, &welcome).await;

        (session_id, rx)
    }

    pub async fn close_session(&self, session_id: SessionId) {
        self.inner.dispatcher.unregister(session_id).await;
    }

    /// Validate, check the policy, insert, then announce the post (and
    /// anything the capacity limit pushed out).
    pub async fn create_post(
        &self,
        user: &str,
        content: &str,
        requested_type: Option<PostType>,
    ) -> Result<Post, FeedError> {
        validate_post(user, content)?;
        let now = Utc::now();
        let post_type = category::classify(content, requested_type);

        let mut feed = self.inner.feed.lock().await;
        let today = now.with_timezone(&Local).date_naive();
        policy::can_post(user, post_type, feed.posts(), today, &Local)?;

        let created = feed.create_post(user, content, post_type, now)?;
        info!(
            "New {:?} post {} by {}",
            created.post.post_type, created.post.id, created.post.user
        );

        self.inner
            .dispatcher
            .broadcast(&ServerEvent::NewPost {
                post: created.post.clone(),
            })
            .await;
        for post_id in created.evicted {
            debug!("Post {} evicted by capacity", post_id);
            self.inner
                .dispatcher
                .broadcast(&ServerEvent::PostRemoved { post_id })
                .await;
        }
        drop(feed);

        if category::is_important(&created.post) {
            if let Some(archive) = &self.inner.archive {
                persist::spawn_save(archive.clone(), vec![created.post.clone()]);
            }
        }

        Ok(created.post)
    }

    /// Append a comment or reaction and announce it. Returns the post's new
    /// interaction count.
    pub async fn add_comment(&self, post_id: &str, user: &str, text: &str) -> Result<u32, FeedError> {
        let mut feed = self.inner.feed.lock().await;
        let now = Utc::now();
        let (comment, new_interactions) = if is_quick_reaction(text) {
            feed.apply_reaction(post_id, user, text, now)?
        } else {
            feed.add_comment(post_id, user, text, now)?
        };
        debug!("{} commented on post {}", user, post_id);

        self.inner
            .dispatcher
            .broadcast(&ServerEvent::CommentAdded {
                post_id: post_id.to_string(),
                comment,
                new_interactions,
            })
            .await;

        Ok(new_interactions)
    }

    /// Resolve a composer post: flag it in the archive so it is not restored,
    /// then remove it from the feed and announce the removal. A composer post
    /// that only lives in the archive is still flagged. General posts and
    /// unknown ids return false.
    pub async fn resolve(&self, post_id: &str) -> bool {
        let mut feed = self.inner.feed.lock().await;
        if feed.get(post_id).is_some_and(|p| p.post_type == PostType::General) {
            return false;
        }

        let archived = match &self.inner.archive {
            Some(archive) => persist::mark_resolved(archive.clone(), post_id.to_string()).await,
            None => false,
        };

        let removed = feed.resolve(post_id);
        if removed {
            info!("Post {} resolved", post_id);
            self.inner
                .dispatcher
                .broadcast(&ServerEvent::PostRemoved {
                    post_id: post_id.to_string(),
                })
                .await;
        }
        removed || archived
    }

    /// Record a finished play for the play report.
    pub async fn record_play(
        &self,
        song_id: &str,
        user_id: Option<&str>,
        duration_seconds: f64,
    ) -> Result<(), FeedError> {
        let play = plays::new_play(song_id, user_id, duration_seconds, Utc::now())?;
        info!("Play completed: {} ({}s)", play.song_id, play.duration_seconds);
        self.inner.plays.record(play).await;
        Ok(())
    }

    /// Run one decay pass. Returns how many posts changed.
    pub async fn decay_tick(&self, now: DateTime<Utc>) -> usize {
        let mut feed = self.inner.feed.lock().await;
        let updates = feed.decay_tick(now);
        if updates.is_empty() {
            return 0;
        }

        let changed = updates.len();
        self.inner
            .dispatcher
            .broadcast(&ServerEvent::InteractionsDecayed { updates })
            .await;
        changed
    }

    /// Drop expired posts and announce each removal.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut feed = self.inner.feed.lock().await;
        let before = feed.len();
        let removed = feed.evict_expired(now);

        for post_id in &removed {
            self.inner
                .dispatcher
                .broadcast(&ServerEvent::PostRemoved {
                    post_id: post_id.clone(),
                })
                .await;
        }

        if !removed.is_empty() {
            info!("Cleanup: {} -> {} posts", before, feed.len());
        }
        removed.len()
    }

    /// Merge restored posts into the feed.
    pub async fn import(&self, posts: Vec<Post>) -> usize {
        self.inner.feed.lock().await.import(posts)
    }

    pub async fn snapshot(&self, limit: usize) -> Vec<Post> {
        self.inner.feed.lock().await.snapshot(limit)
    }

    pub async fn important_posts(&self) -> Vec<Post> {
        self.inner
            .feed
            .lock()
            .await
            .posts()
            .iter()
            .filter(|p| category::is_important(p))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.feed.lock().await.len()
    }
}
