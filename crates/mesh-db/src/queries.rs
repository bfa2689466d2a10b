use anyhow::Result;
use rusqlite::Connection;

use mesh_types::models::{Play, Post};

use crate::Archive;
use crate::models::{PostRow, post_type_str};

impl Archive {
    /// Active, unexpired posts, oldest first.
    pub fn load_active_posts(&self, now_ms: i64) -> Result<Vec<Post>> {
        self.with_conn(|conn| query_active_posts(conn, now_ms))
    }

    /// Store posts not archived yet. Already-known ids are left alone.
    /// Returns how many rows were written.
    pub fn save_posts(&self, posts: &[Post]) -> Result<usize> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "INSERT OR IGNORE INTO important_posts
                    (id, user, content, post_type, interactions, timestamp, status, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'active', ?7)",
            )?;

            let mut written = 0;
            for post in posts {
                written += stmt.execute(rusqlite::params![
                    post.id,
                    post.user,
                    post.content,
                    post_type_str(post.post_type),
                    post.interactions,
                    post.timestamp,
                    post.expires_at,
                ])?;
            }
            Ok(written)
        })
    }

    /// Flag a post as resolved so it is not restored again.
    /// Returns false if the id was never archived or is already resolved.
    pub fn mark_resolved(&self, post_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE important_posts SET status = 'resolved' WHERE id = ?1 AND status = 'active'",
                [post_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn record_play(&self, play: &Play) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO plays (timestamp, song_id, user_hash, duration_seconds, country)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    play.timestamp,
                    play.song_id,
                    play.user_hash,
                    play.duration_seconds,
                    play.country,
                ],
            )?;
            Ok(())
        })
    }

    /// Every recorded play, in recording order.
    pub fn load_plays(&self) -> Result<Vec<Play>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, song_id, user_hash, duration_seconds, country
                 FROM plays ORDER BY id ASC",
            )?;
            let plays = stmt
                .query_map([], |row| {
                    Ok(Play {
                        timestamp: row.get(0)?,
                        song_id: row.get(1)?,
                        user_hash: row.get(2)?,
                        duration_seconds: row.get(3)?,
                        country: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(plays)
        })
    }
}

fn query_active_posts(conn: &Connection, now_ms: i64) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(
        "SELECT id, user, content, post_type, interactions, timestamp, status, expires_at
         FROM important_posts
         WHERE status = 'active'
           AND (expires_at IS NULL OR expires_at > ?1)
         ORDER BY timestamp ASC",
    )?;

    let rows = stmt
        .query_map([now_ms], |row| {
            Ok(PostRow {
                id: row.get(0)?,
                user: row.get(1)?,
                content: row.get(2)?,
                post_type: row.get(3)?,
                interactions: row.get(4)?,
                timestamp: row.get(5)?,
                status: row.get(6)?,
                expires_at: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows.into_iter().map(Post::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::models::{PostStatus, PostType};

    fn post(id: &str, expires_at: Option<i64>) -> Post {
        Post {
            id: id.into(),
            user: "ana".into(),
            content: "🤝 COLABORACIÓN: dueto".into(),
            post_type: PostType::Composer,
            interactions: 3,
            comments: vec![],
            timestamp: 1_000,
            status: PostStatus::Active,
            is_persistent: false,
            expires_at,
        }
    }

    #[test]
    fn saves_once_and_restores_as_persistent() {
        let archive = Archive::open_in_memory().unwrap();
        assert_eq!(archive.save_posts(&[post("1", Some(10_000))]).unwrap(), 1);
        assert_eq!(archive.save_posts(&[post("1", Some(10_000))]).unwrap(), 0);

        let restored = archive.load_active_posts(5_000).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].id, "1");
        assert_eq!(restored[0].interactions, 3);
        assert_eq!(restored[0].post_type, PostType::Composer);
        assert!(restored[0].is_persistent);
    }

    #[test]
    fn expired_and_resolved_rows_are_not_restored() {
        let archive = Archive::open_in_memory().unwrap();
        archive
            .save_posts(&[post("old", Some(2_000)), post("done", None), post("live", None)])
            .unwrap();

        assert!(archive.mark_resolved("done").unwrap());
        assert!(!archive.mark_resolved("done").unwrap());
        assert!(!archive.mark_resolved("missing").unwrap());

        let ids: Vec<_> = archive
            .load_active_posts(5_000)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["live".to_string()]);
    }

    #[test]
    fn plays_come_back_in_recording_order() {
        let archive = Archive::open_in_memory().unwrap();
        assert!(archive.load_plays().unwrap().is_empty());

        let play = |song: &str| Play {
            timestamp: "2025-03-10T12:00:00.000Z".into(),
            song_id: song.into(),
            user_hash: "61".into(),
            duration_seconds: 180.5,
            country: "MX".into(),
        };
        archive.record_play(&play("b")).unwrap();
        archive.record_play(&play("a")).unwrap();

        let plays = archive.load_plays().unwrap();
        assert_eq!(plays, vec![play("b"), play("a")]);
    }
}
