use chrono::{Datelike, NaiveDate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use mesh_types::models::Track;

/// Shuffled track list shared by every client on a given day.
///
/// The shuffle is seeded by the calendar day so that all sessions get the
/// same order without the server storing anything.
#[derive(Debug, Clone)]
pub struct DailyPlaylist {
    tracks: Vec<Track>,
}

impl DailyPlaylist {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn for_day(&self, day: NaiveDate) -> Vec<Track> {
        let mut playlist = self.tracks.clone();
        let mut rng = StdRng::seed_from_u64(day.num_days_from_ce() as u64);
        playlist.shuffle(&mut rng);
        playlist
    }
}

impl Default for DailyPlaylist {
    fn default() -> Self {
        let track = |name: &str, stem: &str| Track {
            name: name.to_string(),
            file: format!("/Music/{stem}.mp3"),
            image: format!("/Music/{stem}.jpg"),
        };

        Self::new(vec![
            track("🎵 4 - dR.iAn", "track1"),
            track("🎵 Me Reconozco - Rodrigo Escamilla", "mereconozco"),
            track("🎵 Toda La Noche - Mariu", "mariutodalanoche"),
            track("🎵 A Contratiempo - Demian Cobo ft. Daniel Tejeda", "acontratiempo"),
        ])
    }
}
