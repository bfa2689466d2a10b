use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS important_posts (
            id              TEXT PRIMARY KEY,
            user            TEXT NOT NULL,
            content         TEXT NOT NULL,
            post_type       TEXT NOT NULL DEFAULT 'composer',
            interactions    INTEGER NOT NULL DEFAULT 0,
            timestamp       INTEGER NOT NULL,
            status          TEXT NOT NULL DEFAULT 'active',
            expires_at      INTEGER,
            saved_at        TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_important_posts_status
            ON important_posts(status, expires_at);

        CREATE TABLE IF NOT EXISTS plays (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp           TEXT NOT NULL,
            song_id             TEXT NOT NULL,
            user_hash           TEXT NOT NULL,
            duration_seconds    REAL NOT NULL,
            country             TEXT NOT NULL
        );
        ",
    )?;

    info!("Archive migrations complete");
    Ok(())
}
