use chrono::{NaiveDate, TimeZone};

use mesh_types::models::{Post, PostType};

use crate::error::FeedError;

const DAILY_LIMIT_MESSAGE: &str = "Only 1 general post per day! 🌅\n\
    Use the composer tools to share lyrics, chords, events and more without limits 🎵";

/// Decide whether `user` may publish a post of `post_type` right now.
///
/// General posts are limited to one per user per calendar day in `tz`.
/// Composer posts never count against the limit and are never denied.
/// Reads `existing` only.
pub fn can_post<Tz: TimeZone>(
    user: &str,
    post_type: PostType,
    existing: &[Post],
    today: NaiveDate,
    tz: &Tz,
) -> Result<(), FeedError> {
    if post_type == PostType::Composer {
        return Ok(());
    }

    let posted_today = existing.iter().any(|post| {
        post.user == user
            && post.post_type == PostType::General
            && tz
                .timestamp_millis_opt(post.timestamp)
                .single()
                .is_some_and(|created| created.date_naive() == today)
    });

    if posted_today {
        Err(FeedError::PolicyDenied(DAILY_LIMIT_MESSAGE.into()))
    } else {
        Ok(())
    }
}
