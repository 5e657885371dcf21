// Behavior tracking - what you play, what you love, how it makes you feel
// One record per track id; the Track itself never carries these fields

pub mod tracker; // favorites, play counts, moods, ratings, recently played

pub use tracker::{BehaviorSnapshot, BehaviorTracker};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audio::Track;

pub const MAX_RATING: u8 = 5;

/// Mood ids the UI offers out of the box. Any string works as a mood.
pub const DEFAULT_MOODS: &[&str] = &[
    "energetic", "chill", "happy", "melancholic", "focus", "romantic", "party", "workout",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackMeta {
    pub is_favorite: bool,
    pub play_count: u64,
    pub last_played_at: Option<DateTime<Utc>>,
    pub added_at: DateTime<Utc>,
    /// Set while the track is a favorite
    #[serde(default)]
    pub favorited_at: Option<DateTime<Utc>>,
    /// Ordered, no duplicates
    pub moods: Vec<String>,
    /// 0 (unrated) to 5
    pub rating: u8,
}

impl TrackMeta {
    pub fn new() -> Self {
        Self {
            is_favorite: false,
            play_count: 0,
            last_played_at: None,
            added_at: Utc::now(),
            favorited_at: None,
            moods: Vec::new(),
            rating: 0,
        }
    }

    pub fn has_mood(&self, mood: &str) -> bool {
        self.moods.iter().any(|m| m == mood)
    }
}

impl Default for TrackMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a track together with its user data.
/// A track nobody has touched yet reads as all defaults.
#[derive(Debug, Clone, Copy)]
pub struct AnnotatedTrack<'a> {
    pub track: &'a Track,
    meta: Option<&'a TrackMeta>,
}

impl<'a> AnnotatedTrack<'a> {
    pub fn new(track: &'a Track, meta: Option<&'a TrackMeta>) -> Self {
        Self { track, meta }
    }

    pub fn is_favorite(&self) -> bool {
        self.meta.is_some_and(|m| m.is_favorite)
    }

    pub fn play_count(&self) -> u64 {
        self.meta.map_or(0, |m| m.play_count)
    }

    pub fn last_played_at(&self) -> Option<DateTime<Utc>> {
        self.meta.and_then(|m| m.last_played_at)
    }

    pub fn moods(&self) -> &'a [String] {
        self.meta.map(|m| m.moods.as_slice()).unwrap_or(&[])
    }

    pub fn rating(&self) -> u8 {
        self.meta.map_or(0, |m| m.rating)
    }
}
