use serde::{Deserialize, Serialize};

/// Category of a post, fixed at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    #[default]
    General,
    Composer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Active,
    Resolved,
}

/// A feed entry as it travels over the wire.
///
/// The feed store only ever hands out clones of its posts, so mutating one of
/// these never touches authoritative state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub user: String,
    pub content: String,
    pub post_type: PostType,
    pub interactions: u32,
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub status: PostStatus,
    /// Set on posts restored from the archive.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_persistent: bool,
    /// Epoch milliseconds after which a composer post is swept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub user: String,
    pub text: String,
    pub timestamp: i64,
}

/// One entry of the shared daily playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub file: String,
    pub image: String,
}

/// One completed playback, kept for the performance-rights report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Play {
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub song_id: String,
    pub user_hash: String,
    pub duration_seconds: f64,
    pub country: String,
}
