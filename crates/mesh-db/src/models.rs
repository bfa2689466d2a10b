use mesh_types::models::{Post, PostStatus, PostType};

/// Row of `important_posts`. Comments are not archived.
pub struct PostRow {
    pub id: String,
    pub user: String,
    pub content: String,
    pub post_type: String,
    pub interactions: i64,
    pub timestamp: i64,
    pub status: String,
    pub expires_at: Option<i64>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            user: row.user,
            content: row.content,
            post_type: match row.post_type.as_str() {
                "general" => PostType::General,
                _ => PostType::Composer,
            },
            interactions: u32::try_from(row.interactions).unwrap_or_default(),
            comments: Vec::new(),
            timestamp: row.timestamp,
            status: match row.status.as_str() {
                "resolved" => PostStatus::Resolved,
                _ => PostStatus::Active,
            },
            is_persistent: true,
            expires_at: row.expires_at,
        }
    }
}

pub fn post_type_str(post_type: PostType) -> &'static str {
    match post_type {
        PostType::General => "general",
        PostType::Composer => "composer",
    }
}
