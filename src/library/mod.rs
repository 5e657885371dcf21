// Track library - everything the scanner or picker brought in

use std::collections::HashSet;

use fuzzy_matcher::{clangd::ClangdMatcher, FuzzyMatcher};
use tracing::{debug, info};

use crate::audio::{scanned_track_to_track, ScannedTrack, Track};

/// Known tracks in insertion order, unique by id.
///
/// Removing a track here does not touch the queue, playlists or behavior
/// data; `Session::remove_track` does the cascade.
#[derive(Default)]
pub struct Library {
    tracks: Vec<Track>,
    matcher: ClangdMatcher,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        let mut library = Self::new();
        library.add_tracks(tracks);
        library
    }

    /// Add tracks whose id is not known yet. Returns how many were added.
    pub fn add_tracks(&mut self, tracks: Vec<Track>) -> usize {
        let mut known: HashSet<String> = self.tracks.iter().map(|t| t.id.clone()).collect();
        let before = self.tracks.len();

        for track in tracks {
            if known.insert(track.id.clone()) {
                self.tracks.push(track);
            }
        }

        let added = self.tracks.len() - before;
        if added > 0 {
            info!("Added {} tracks to library ({} total)", added, self.tracks.len());
        }
        added
    }

    pub fn add_scanned(&mut self, scanned: &[ScannedTrack]) -> usize {
        self.add_tracks(scanned.iter().map(scanned_track_to_track).collect())
    }

    pub fn get(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn get_many(&self, ids: &[String]) -> Vec<&Track> {
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Fill in a duration the transport found out about
    pub fn set_duration(&mut self, id: &str, duration: f64) -> bool {
        match self.tracks.iter_mut().find(|t| t.id == id) {
            Some(track) if duration.is_finite() && duration > 0.0 => {
                track.duration = duration;
                true
            }
            _ => false,
        }
    }

    pub fn remove_track(&mut self, id: &str) -> Option<Track> {
        let pos = self.tracks.iter().position(|t| t.id == id)?;
        Some(self.tracks.remove(pos))
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Fuzzy search over title, artist, album and "artist - title".
    /// Best match first; an empty query returns everything.
    pub fn search(&self, query: &str) -> Vec<&Track> {
        let query = query.trim();
        if query.is_empty() {
            return self.tracks.iter().collect();
        }

        let mut scored: Vec<(&Track, i64)> = self
            .tracks
            .iter()
            .filter_map(|track| {
                let line = track.display_line();
                let fields = [track.title.as_str(), track.artist.as_str(), track.album.as_str(), line.as_str()];
                // choice first, pattern second
                let best = fields.iter().filter_map(|field| self.matcher.fuzzy_match(field, query)).max();
                best.map(|score| (track, score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.cmp(&a.1));
        debug!("Search '{}' matched {} of {} tracks", query, scored.len(), self.tracks.len());
        scored.into_iter().map(|(track, _)| track).collect()
    }
}
