use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, Utc};

use mesh_types::models::Play;

use crate::error::FeedError;

pub const PLAY_COUNTRY: &str = "MX";
pub const ANONYMOUS: &str = "anonymous";

pub const REPORT_HEADER: &str =
    "timestamp,song_id,user_hash,duration_seconds,country,isrc,registro_indautor,registro_sacm";

/// Build the record for a completed play. The user id is never stored, only
/// its hash.
pub fn new_play(
    song_id: &str,
    user_id: Option<&str>,
    duration_seconds: f64,
    now: DateTime<Utc>,
) -> Result<Play, FeedError> {
    if song_id.trim().is_empty() {
        return Err(FeedError::ValidationFailed("Incomplete play data".into()));
    }
    if !duration_seconds.is_finite() || duration_seconds < 0.0 {
        return Err(FeedError::ValidationFailed("Invalid play duration".into()));
    }

    let user_hash = match user_id.filter(|u| !u.is_empty()) {
        Some(user) => user_hash(user),
        None => ANONYMOUS.to_string(),
    };

    Ok(Play {
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        song_id: song_id.to_string(),
        user_hash,
        duration_seconds,
        country: PLAY_COUNTRY.to_string(),
    })
}

/// `h * 31 + unit` over UTF-16 units with 32-bit wraparound, printed as the
/// hex of its magnitude.
pub fn user_hash(user_id: &str) -> String {
    let hash = user_id.encode_utf16().fold(0i32, |h, unit| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit))
    });
    format!("{:x}", i64::from(hash).abs())
}

/// CSV report, one row per play. The registry columns stay empty.
pub fn report_csv(plays: &[Play]) -> String {
    let mut out = String::with_capacity(REPORT_HEADER.len() + plays.len() * 96);
    out.push_str(REPORT_HEADER);
    out.push('\n');
    for play in plays {
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{},{},{},{},{},,,",
            quote(&play.timestamp),
            quote(&play.song_id),
            quote(&play.user_hash),
            play.duration_seconds,
            quote(&play.country),
        );
    }
    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn hash_is_stable_and_hides_the_user() {
        assert_eq!(user_hash("a"), "61");
        assert_eq!(user_hash("ab"), "c21");
        assert_eq!(user_hash("bob"), user_hash("bob"));
        assert_ne!(user_hash("bob"), "bob");
    }

    #[test]
    fn hash_wraps_instead_of_overflowing() {
        let long = "ñandú".repeat(200);
        assert!(!user_hash(&long).is_empty());
    }

    #[test]
    fn anonymous_when_user_missing() {
        let play = new_play("track-1", None, 30.0, now()).unwrap();
        assert_eq!(play.user_hash, ANONYMOUS);
        assert_eq!(play.country, "MX");
        assert_eq!(play.timestamp, "2025-03-10T12:00:00.000Z");

        let play = new_play("track-1", Some(""), 30.0, now()).unwrap();
        assert_eq!(play.user_hash, ANONYMOUS);
    }

    #[test]
    fn rejects_blank_song_and_bad_duration() {
        assert!(matches!(
            new_play(" ", Some("bob"), 10.0, now()),
            Err(FeedError::ValidationFailed(_))
        ));
        assert!(matches!(
            new_play("x", Some("bob"), -1.0, now()),
            Err(FeedError::ValidationFailed(_))
        ));
        assert!(matches!(
            new_play("x", Some("bob"), f64::NAN, now()),
            Err(FeedError::ValidationFailed(_))
        ));
    }

    #[test]
    fn report_has_header_and_quoted_rows() {
        let plays = vec![
            new_play("track-1", Some("a"), 180.0, now()).unwrap(),
            new_play("say \"hi\"", None, 12.5, now()).unwrap(),
        ];
        let csv = report_csv(&plays);
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines[0], REPORT_HEADER);
        assert_eq!(
            lines[1],
            r#""2025-03-10T12:00:00.000Z","track-1","61",180,"MX",,,"#
        );
        assert_eq!(
            lines[2],
            r#""2025-03-10T12:00:00.000Z","say ""hi""","anonymous",12.5,"MX",,,"#
        );
    }

    #[test]
    fn empty_report_is_just_the_header() {
        assert_eq!(report_csv(&[]), format!("{}\n", REPORT_HEADER));
    }
}
