use std::cmp::Reverse;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use mesh_types::events::InteractionUpdate;
use mesh_types::models::{Comment, Post, PostStatus, PostType};

use crate::category;
use crate::error::FeedError;

/// Glyphs offered by the client's quick-reaction bar.
pub const QUICK_REACTIONS: &[&str] = &["🔥", "❤️", "😂", "🎉", "👀", "💫"];

pub fn is_quick_reaction(text: &str) -> bool {
    QUICK_REACTIONS.contains(&text)
}

/// Tunables for the feed.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Hard cap on retained posts.
    pub max_posts: usize,
    pub max_content_chars: usize,
    pub max_comment_chars: usize,
    /// How long a general post stays in the feed.
    pub general_retention: TimeDelta,
    /// Posts younger than this never decay.
    pub decay_threshold: TimeDelta,
    /// Multiplier applied to the decay of composer posts.
    pub composer_decay_factor: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_posts: 200,
            max_content_chars: 500,
            max_comment_chars: 300,
            general_retention: TimeDelta::hours(24),
            decay_threshold: TimeDelta::hours(1),
            composer_decay_factor: 0.5,
        }
    }
}

/// Result of a successful `create_post`.
#[derive(Debug, Clone)]
pub struct Created {
    pub post: Post,
    /// Ids pushed out by the capacity limit.
    pub evicted: Vec<String>,
}

/// The authoritative, in-memory collection of posts.
///
/// Posts are kept newest-first. Nothing outside this type gets a mutable
/// reference to a post; reads hand out borrows or clones.
pub struct FeedStore {
    config: FeedConfig,
    posts: Vec<Post>,
    last_id: i64,
}

impl FeedStore {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            config,
            posts: Vec::new(),
            last_id: 0,
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Read-only view, newest first.
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn get(&self, post_id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == post_id)
    }

    /// Up to `limit` of the newest posts.
    pub fn snapshot(&self, limit: usize) -> Vec<Post> {
        self.posts.iter().take(limit).cloned().collect()
    }

    /// Merge posts restored from the archive. They are flagged persistent,
    /// duplicates of ids already present are skipped. Returns how many were
    /// added.
    pub fn import(&mut self, posts: Vec<Post>) -> usize {
        let mut added = 0;
        for mut post in posts {
            if self.get(&post.id).is_some() {
                continue;
            }
            if let Ok(numeric) = post.id.parse::<i64>() {
                self.last_id = self.last_id.max(numeric);
            }
            post.is_persistent = true;
            post.status = PostStatus::Active;
            self.posts.push(post);
            added += 1;
        }

        self.posts.sort_by_key(|p| Reverse(p.timestamp));
        let evicted = self.enforce_capacity();
        if !evicted.is_empty() {
            info!("Import pushed {} posts over capacity", evicted.len());
        }
        added
    }

    /// Validate and insert a new post at the head of the feed.
    pub fn create_post(
        &mut self,
        user: &str,
        content: &str,
        post_type: PostType,
        now: DateTime<Utc>,
    ) -> Result<Created, FeedError> {
        validate_post(user, content)?;

        let content = truncate(content, self.config.max_content_chars);
        let expires_at = category::expiration(post_type, &content, now).map(|t| t.timestamp_millis());

        let post = Post {
            id: self.next_id(now),
            user: user.to_string(),
            content,
            post_type,
            interactions: 0,
            comments: Vec::new(),
            timestamp: now.timestamp_millis(),
            status: PostStatus::Active,
            is_persistent: false,
            expires_at,
        };

        self.posts.insert(0, post.clone());
        let evicted = self.enforce_capacity();

        debug!("Created post {} by {} ({:?})", post.id, post.user, post.post_type);
        Ok(Created { post, evicted })
    }

    /// Append a comment and bump the post's engagement by one.
    /// Returns the stored comment and the new interaction count.
    pub fn add_comment(
        &mut self,
        post_id: &str,
        user: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<(Comment, u32), FeedError> {
        if post_id.is_empty() || user.trim().is_empty() || text.trim().is_empty() {
            return Err(FeedError::ValidationFailed("Incomplete comment data".into()));
        }

        let max_chars = self.config.max_comment_chars;
        let post = self
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| FeedError::NotFound(post_id.to_string()))?;

        let comment = Comment {
            user: user.to_string(),
            text: truncate(text, max_chars),
            timestamp: now.timestamp_millis(),
        };
        post.comments.push(comment.clone());
        post.interactions = post.interactions.saturating_add(1);

        Ok((comment, post.interactions))
    }

    /// A reaction is a comment whose text is the reaction glyph.
    pub fn apply_reaction(
        &mut self,
        post_id: &str,
        user: &str,
        reaction: &str,
        now: DateTime<Utc>,
    ) -> Result<(Comment, u32), FeedError> {
        self.add_comment(post_id, user, reaction, now)
    }

    /// Lower the engagement of posts older than the decay threshold by
    /// `floor(hours_old / 2)`, scaled down for composer posts. Returns the
    /// posts whose count actually changed; empty means nothing to announce.
    pub fn decay_tick(&mut self, now: DateTime<Utc>) -> Vec<InteractionUpdate> {
        let now_ms = now.timestamp_millis();
        let threshold_ms = self.config.decay_threshold.num_milliseconds();
        let factor = self.config.composer_decay_factor;

        let mut updates = Vec::new();
        for post in self.posts.iter_mut() {
            let age_ms = now_ms - post.timestamp;
            if age_ms <= threshold_ms || post.interactions == 0 {
                continue;
            }

            let hours_old = age_ms as f64 / 3_600_000.0;
            let rate = match post.post_type {
                PostType::General => 1.0,
                PostType::Composer => factor,
            };
            let amount = (hours_old / 2.0 * rate).floor() as u32;
            let next = post.interactions.saturating_sub(amount);

            if next != post.interactions {
                post.interactions = next;
                updates.push(InteractionUpdate {
                    post_id: post.id.clone(),
                    interactions: next,
                });
            }
        }
        updates
    }

    /// Drop general posts past the retention window and composer posts past
    /// their expiration. Returns the removed ids.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let now_ms = now.timestamp_millis();
        let retention_ms = self.config.general_retention.num_milliseconds();

        let mut removed = Vec::new();
        self.posts.retain(|post| {
            let keep = match (post.post_type, post.expires_at) {
                (_, Some(expires_at)) => expires_at > now_ms,
                (PostType::General, None) if !post.is_persistent => {
                    now_ms - post.timestamp < retention_ms
                }
                _ => true,
            };
            if !keep {
                removed.push(post.id.clone());
            }
            keep
        });
        removed
    }

    /// Close a composer post and take it out of the feed. General posts are
    /// never resolvable; they and unknown ids return `false`.
    pub fn resolve(&mut self, post_id: &str) -> bool {
        let position = self
            .posts
            .iter()
            .position(|p| p.id == post_id && p.post_type == PostType::Composer);
        match position {
            Some(idx) => {
                self.posts.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Time-derived id, bumped past the last one issued so that two posts in
    /// the same millisecond never share an id.
    fn next_id(&mut self, now: DateTime<Utc>) -> String {
        let mut candidate = now.timestamp_millis().max(self.last_id + 1);
        while self.get(&candidate.to_string()).is_some() {
            candidate += 1;
        }
        self.last_id = candidate;
        candidate.to_string()
    }

    /// Evict the oldest non-important posts until the cap holds. If only
    /// important posts remain, the oldest of those goes.
    fn enforce_capacity(&mut self) -> Vec<String> {
        let mut evicted = Vec::new();
        while self.posts.len() > self.config.max_posts {
            let victim = self
                .oldest_where(|p| !category::is_important(p))
                .or_else(|| self.oldest_where(|_| true));
            let Some(idx) = victim else { break };
            evicted.push(self.posts.remove(idx).id);
        }
        evicted
    }

    /// Oldest by creation time; among equal timestamps the one further down
    /// the newest-first list was inserted earlier.
    fn oldest_where(&self, pred: impl Fn(&Post) -> bool) -> Option<usize> {
        self.posts
            .iter()
            .enumerate()
            .filter(|(_, p)| pred(p))
            .min_by_key(|(idx, p)| (p.timestamp, Reverse(*idx)))
            .map(|(idx, _)| idx)
    }
}

/// Reject a post with a blank author or body.
pub fn validate_post(user: &str, content: &str) -> Result<(), FeedError> {
    if user.trim().is_empty() || content.trim().is_empty() {
        return Err(FeedError::ValidationFailed("Incomplete post data".into()));
    }
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
