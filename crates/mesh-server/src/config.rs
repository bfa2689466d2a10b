use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Server settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    /// Archive location. Unset means the feed lives in memory only.
    pub db_path: Option<PathBuf>,
    pub max_posts: usize,
    pub welcome_posts: usize,
    pub decay_interval: Duration,
    pub cleanup_interval: Duration,
    pub backup_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secs = |key: &str, default: u64| parse_or(&lookup, key, default).map(Duration::from_secs);

        Ok(Self {
            host: lookup("MESH_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "MESH_PORT", 8000)?,
            static_dir: lookup("MESH_STATIC_DIR")
                .unwrap_or_else(|| "./public".into())
                .into(),
            db_path: lookup("MESH_DB_PATH")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            max_posts: parse_or(&lookup, "MESH_MAX_POSTS", 200)?,
            welcome_posts: parse_or(&lookup, "MESH_WELCOME_POSTS", 200)?,
            decay_interval: secs("MESH_DECAY_INTERVAL_SECS", 30)?,
            cleanup_interval: secs("MESH_CLEANUP_INTERVAL_SECS", 3600)?,
            backup_interval: secs("MESH_BACKUP_INTERVAL_SECS", 180)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("invalid {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
