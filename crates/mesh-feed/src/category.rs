//! Composer categories, importance and retention horizons.
//!
//! Composer posts are recognised by a marker prefix the client's composer
//! tools insert into the content.

use chrono::{DateTime, Days, NaiveDate, Utc};
use mesh_types::models::{Post, PostType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerKind {
    Lyrics,
    Chords,
    Collaboration,
    Event,
    Project,
    Search,
}

const MARKERS: &[(&str, ComposerKind)] = &[
    ("🎵 LETRAS:", ComposerKind::Lyrics),
    ("🎸 ACORDES:", ComposerKind::Chords),
    ("🤝 COLABORACIÓN:", ComposerKind::Collaboration),
    ("📅 EVENTO:", ComposerKind::Event),
    ("💿 PROYECTO:", ComposerKind::Project),
    ("🔍 BUSCO:", ComposerKind::Search),
];

const COLLABORATION_DAYS: u64 = 30;
const PROJECT_DAYS: u64 = 60;
const DEFAULT_COMPOSER_DAYS: u64 = 7;

impl ComposerKind {
    pub fn marker(self) -> &'static str {
        MARKERS
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(marker, _)| *marker)
            .unwrap_or_default()
    }

    /// Kinds worth keeping beyond the in-memory feed.
    pub fn is_archival(self) -> bool {
        matches!(
            self,
            Self::Collaboration | Self::Event | Self::Project | Self::Search
        )
    }
}

fn kinds_in(content: &str) -> impl Iterator<Item = ComposerKind> + '_ {
    MARKERS
        .iter()
        .filter(move |(marker, _)| content.contains(marker))
        .map(|(_, kind)| *kind)
}

fn has_kind(content: &str, kind: ComposerKind) -> bool {
    kinds_in(content).any(|k| k == kind)
}

/// Resolve the category of a new post from an explicit client hint and the
/// content markers. Either one is enough to make it a composer post.
pub fn classify(content: &str, explicit: Option<PostType>) -> PostType {
    if explicit == Some(PostType::Composer) || kinds_in(content).next().is_some() {
        PostType::Composer
    } else {
        PostType::General
    }
}

/// Important posts survive capacity eviction and are written to the archive.
pub fn is_important(post: &Post) -> bool {
    post.is_persistent || kinds_in(&post.content).any(ComposerKind::is_archival)
}

/// Expiration instant for a composer post; general posts use the rolling
/// retention window instead and get `None`.
pub fn expiration(post_type: PostType, content: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if post_type == PostType::General {
        return None;
    }

    let days = |n| now.checked_add_days(Days::new(n));

    if has_kind(content, ComposerKind::Collaboration) || has_kind(content, ComposerKind::Search) {
        days(COLLABORATION_DAYS)
    } else if has_kind(content, ComposerKind::Project) {
        days(PROJECT_DAYS)
    } else if has_kind(content, ComposerKind::Event) {
        extract_event_date(content)
            .and_then(|date| date.succ_opt())
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .or_else(|| days(DEFAULT_COMPOSER_DAYS))
    } else {
        days(DEFAULT_COMPOSER_DAYS)
    }
}

/// Best-effort scan for a day-first `d/m/yyyy` or `d-m-yyyy` date.
pub fn extract_event_date(content: &str) -> Option<NaiveDate> {
    content
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_ascii_digit()))
        .filter(|token| !token.is_empty())
        .find_map(|token| {
            NaiveDate::parse_from_str(token, "%d/%m/%Y")
                .or_else(|_| NaiveDate::parse_from_str(token, "%d-%m-%Y"))
                .ok()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post(content: &str) -> Post {
        Post {
            id: "1".into(),
            user: "u".into(),
            content: content.into(),
            post_type: classify(content, None),
            interactions: 0,
            comments: vec![],
            timestamp: 0,
            status: Default::default(),
            is_persistent: false,
            expires_at: None,
        }
    }

    #[test]
    fn markers_make_composer_posts() {
        assert_eq!(classify("just saying hi", None), PostType::General);
        assert_eq!(classify("🎸 ACORDES: Am F C G", None), PostType::Composer);
        assert_eq!(classify("plain", Some(PostType::Composer)), PostType::Composer);
        assert_eq!(classify("plain", Some(PostType::General)), PostType::General);
    }

    #[test]
    fn only_archival_kinds_are_important() {
        assert!(!is_important(&post("🎵 LETRAS: la la la")));
        assert!(is_important(&post("🔍 BUSCO: bajista")));
        assert!(is_important(&post("💿 PROYECTO: EP")));

        let mut restored = post("hello");
        restored.is_persistent = true;
        assert!(is_important(&restored));
    }

    #[test]
    fn horizons_follow_kind() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let days_until = |content: &str| {
            let exp = expiration(classify(content, None), content, now).unwrap();
            (exp - now).num_days()
        };

        assert_eq!(days_until("🤝 COLABORACIÓN: busco letrista"), 30);
        assert_eq!(days_until("🔍 BUSCO: baterista"), 30);
        assert_eq!(days_until("💿 PROYECTO: disco"), 60);
        assert_eq!(days_until("🎵 LETRAS: verso"), 7);
        assert_eq!(days_until("📅 EVENTO: tocada sin fecha"), 7);
        assert_eq!(expiration(PostType::General, "hola", now), None);
    }

    #[test]
    fn event_expires_after_its_date() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let exp = expiration(PostType::Composer, "📅 EVENTO: concierto el 14/02/2025.", now).unwrap();
        assert_eq!(exp, Utc.with_ymd_and_hms(2025, 2, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn extracts_dash_dates_and_skips_noise() {
        assert_eq!(
            extract_event_date("show 3-7-2026 en el foro"),
            NaiveDate::from_ymd_opt(2026, 7, 3)
        );
        assert_eq!(extract_event_date("no date 99/99/2025 here"), None);
    }

    #[test]
    fn marker_lookup() {
        assert_eq!(ComposerKind::Event.marker(), "📅 EVENTO:");
        assert!(!ComposerKind::Chords.is_archival());
    }
}
