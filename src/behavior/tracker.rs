use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AnnotatedTrack, TrackMeta, MAX_RATING};
use crate::audio::Track;

pub const DEFAULT_RECENTLY_PLAYED_LIMIT: usize = 100;
pub const DEFAULT_MOST_PLAYED_LIMIT: usize = 50;

/// What gets persisted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorSnapshot {
    pub track_meta: HashMap<String, TrackMeta>,
    pub recently_played: Vec<String>,
}

/// Owns the per-track user annotations.
///
/// Records are created lazily: the first write for an id creates a default
/// record, reads of unknown ids answer with defaults and create nothing.
#[derive(Debug, Clone)]
pub struct BehaviorTracker {
    track_meta: HashMap<String, TrackMeta>,
    /// Most recent first, each id at most once
    recently_played: VecDeque<String>,
    recently_played_limit: usize,
}

impl BehaviorTracker {
    pub fn new() -> Self {
        Self::with_recently_played_limit(DEFAULT_RECENTLY_PLAYED_LIMIT)
    }

    pub fn with_recently_played_limit(limit: usize) -> Self {
        Self {
            track_meta: HashMap::new(),
            recently_played: VecDeque::new(),
            recently_played_limit: limit.max(1),
        }
    }

    pub fn ensure_meta(&mut self, track_id: &str) -> &mut TrackMeta {
        self.track_meta.entry(track_id.to_string()).or_default()
    }

    pub fn meta(&self, track_id: &str) -> Option<&TrackMeta> {
        self.track_meta.get(track_id)
    }

    pub fn annotate<'a>(&'a self, track: &'a Track) -> AnnotatedTrack<'a> {
        AnnotatedTrack::new(track, self.track_meta.get(&track.id))
    }

    // --- favorites ---------------------------------------------------------

    pub fn is_favorite(&self, track_id: &str) -> bool {
        self.meta(track_id).is_some_and(|m| m.is_favorite)
    }

    /// Flip the flag and return the new value
    pub fn toggle_favorite(&mut self, track_id: &str) -> bool {
        let favorite = !self.is_favorite(track_id);
        self.set_favorite_at(track_id, favorite, Utc::now());
        favorite
    }

    pub fn set_favorite(&mut self, track_id: &str, favorite: bool) {
        self.set_favorite_at(track_id, favorite, Utc::now());
    }

    /// Re-favoriting an existing favorite keeps its original time
    pub fn set_favorite_at(&mut self, track_id: &str, favorite: bool, at: DateTime<Utc>) {
        let meta = self.ensure_meta(track_id);
        if favorite && !meta.is_favorite {
            meta.favorited_at = Some(at);
        } else if !favorite {
            meta.favorited_at = None;
        }
        meta.is_favorite = favorite;
    }

    /// Favorites, most recently favorited first (id breaks ties)
    pub fn favorite_ids(&self) -> Vec<String> {
        let mut favorites: Vec<(&String, &TrackMeta)> =
            self.track_meta.iter().filter(|(_, meta)| meta.is_favorite).collect();
        favorites.sort_by(|a, b| b.1.favorited_at.cmp(&a.1.favorited_at).then_with(|| a.0.cmp(b.0)));
        favorites.into_iter().map(|(id, _)| id.clone()).collect()
    }

    // --- plays -------------------------------------------------------------

    /// Count a play now. Returns the new play count.
    pub fn record_play(&mut self, track_id: &str) -> u64 {
        self.record_play_at(track_id, Utc::now())
    }

    pub fn record_play_at(&mut self, track_id: &str, at: DateTime<Utc>) -> u64 {
        let meta = self.ensure_meta(track_id);
        meta.play_count += 1;
        meta.last_played_at = Some(at);
        let count = meta.play_count;

        self.recently_played.retain(|id| id != track_id);
        self.recently_played.push_front(track_id.to_string());
        self.recently_played.truncate(self.recently_played_limit);

        debug!("Recorded play #{} for track {}", count, track_id);
        count
    }

    pub fn play_count(&self, track_id: &str) -> u64 {
        self.meta(track_id).map_or(0, |m| m.play_count)
    }

    pub fn recently_played(&self) -> Vec<String> {
        self.recently_played.iter().cloned().collect()
    }

    /// Played tracks by play count, highest first. Ties go to the more
    /// recently played track, then to the smaller id, so the order is stable.
    pub fn most_played_ids(&self, limit: usize) -> Vec<String> {
        let mut played: Vec<(&String, &TrackMeta)> =
            self.track_meta.iter().filter(|(_, meta)| meta.play_count > 0).collect();

        played.sort_by(|a, b| {
            b.1.play_count
                .cmp(&a.1.play_count)
                .then_with(|| match (a.1.last_played_at, b.1.last_played_at) {
                    (Some(x), Some(y)) => y.cmp(&x),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                })
                .then_with(|| a.0.cmp(b.0))
        });

        played.into_iter().take(limit).map(|(id, _)| id.clone()).collect()
    }

    // --- moods -------------------------------------------------------------

    /// Replace the moods of a track; duplicates are dropped, order kept
    pub fn set_track_moods(&mut self, track_id: &str, moods: Vec<String>) {
        let mut unique: Vec<String> = Vec::with_capacity(moods.len());
        for mood in moods {
            if !unique.contains(&mood) {
                unique.push(mood);
            }
        }
        self.ensure_meta(track_id).moods = unique;
    }

    /// Idempotent
    pub fn add_mood_to_track(&mut self, track_id: &str, mood: &str) {
        let meta = self.ensure_meta(track_id);
        if !meta.has_mood(mood) {
            meta.moods.push(mood.to_string());
        }
    }

    /// No-op when the mood is not there
    pub fn remove_mood_from_track(&mut self, track_id: &str, mood: &str) {
        if let Some(meta) = self.track_meta.get_mut(track_id) {
            meta.moods.retain(|m| m != mood);
        }
    }

    pub fn track_moods(&self, track_id: &str) -> Vec<String> {
        self.meta(track_id).map(|m| m.moods.clone()).unwrap_or_default()
    }

    /// Every track id tagged with `mood`, sorted by id
    pub fn tracks_by_mood(&self, mood: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .track_meta
            .iter()
            .filter(|(_, meta)| meta.has_mood(mood))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    // --- rating ------------------------------------------------------------

    /// Clamped to 0..=5. Returns the stored value.
    pub fn set_rating(&mut self, track_id: &str, rating: u8) -> u8 {
        let rating = rating.min(MAX_RATING);
        self.ensure_meta(track_id).rating = rating;
        rating
    }

    pub fn rating(&self, track_id: &str) -> u8 {
        self.meta(track_id).map_or(0, |m| m.rating)
    }

    // --- lifecycle ---------------------------------------------------------

    /// Drop everything known about a track
    pub fn forget_track(&mut self, track_id: &str) {
        self.track_meta.remove(track_id);
        self.recently_played.retain(|id| id != track_id);
    }

    pub fn clear(&mut self) {
        self.track_meta.clear();
        self.recently_played.clear();
    }

    pub fn snapshot(&self) -> BehaviorSnapshot {
        BehaviorSnapshot {
            track_meta: self.track_meta.clone(),
            recently_played: self.recently_played(),
        }
    }

    pub fn restore(&mut self, snapshot: BehaviorSnapshot) {
        self.track_meta = snapshot.track_meta;
        self.recently_played.clear();
        for id in snapshot.recently_played {
            if !self.recently_played.contains(&id) {
                self.recently_played.push_back(id);
            }
        }
        self.recently_played.truncate(self.recently_played_limit);
    }
}

impl Default for BehaviorTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Track;
    use chrono::Duration;

    #[test]
    fn test_toggle_favorite_creates_record() {
        let mut tracker = BehaviorTracker::new();
        assert!(tracker.meta("t1").is_none());
        assert!(!tracker.is_favorite("t1"));

        assert!(tracker.toggle_favorite("t1"));
        assert!(tracker.meta("t1").is_some());
        assert!(tracker.is_favorite("t1"));

        assert!(!tracker.toggle_favorite("t1"));
        assert!(!tracker.is_favorite("t1"));
    }

    #[test]
    fn test_favorites_ordered_by_when_favorited() {
        let mut tracker = BehaviorTracker::new();
        let base = Utc::now();
        // "old" gets its record long before it becomes a favorite
        tracker.record_play_at("old", base - Duration::days(30));
        tracker.set_favorite_at("new", true, base);
        tracker.set_favorite_at("old", true, base + Duration::seconds(10));
        assert_eq!(tracker.favorite_ids(), vec!["old", "new"]);

        // favoriting again does not bump it
        tracker.set_favorite_at("new", true, base + Duration::seconds(20));
        assert_eq!(tracker.favorite_ids(), vec!["old", "new"]);

        tracker.set_favorite("old", false);
        assert!(tracker.meta("old").unwrap().favorited_at.is_none());
        assert_eq!(tracker.favorite_ids(), vec!["new"]);
    }

    #[test]
    fn test_record_play_moves_to_front() {
        let mut tracker = BehaviorTracker::new();
        let base = Utc::now();
        tracker.record_play_at("t3", base);
        tracker.record_play_at("t1", base + Duration::seconds(1));
        tracker.record_play_at("t2", base + Duration::seconds(2));
        assert_eq!(tracker.recently_played(), vec!["t2", "t1", "t3"]);

        let before = tracker.play_count("t1");
        tracker.record_play("t1");

        assert_eq!(tracker.recently_played(), vec!["t1", "t2", "t3"]);
        assert_eq!(tracker.play_count("t1"), before + 1);
        assert!(tracker.meta("t1").unwrap().last_played_at.is_some());
    }

    #[test]
    fn test_recently_played_is_bounded() {
        let mut tracker = BehaviorTracker::new();
        for i in 0..150 {
            tracker.record_play(&format!("t{}", i));
        }

        let recent = tracker.recently_played();
        assert_eq!(recent.len(), 100);
        assert_eq!(recent[0], "t149");
        assert_eq!(recent[99], "t50");
    }

    #[test]
    fn test_most_played_ordering() {
        let mut tracker = BehaviorTracker::new();
        let base = Utc::now();

        for _ in 0..3 {
            tracker.record_play_at("a", base);
        }
        tracker.record_play_at("b", base);
        tracker.record_play_at("c", base + Duration::seconds(5));
        tracker.set_favorite("never-played", true);

        // c and b tie on count; c was played later
        assert_eq!(tracker.most_played_ids(50), vec!["a", "c", "b"]);
        assert_eq!(tracker.most_played_ids(1), vec!["a"]);
    }

    #[test]
    fn test_most_played_ties_fall_back_to_id() {
        let mut tracker = BehaviorTracker::new();
        let at = Utc::now();
        tracker.record_play_at("z", at);
        tracker.record_play_at("m", at);

        assert_eq!(tracker.most_played_ids(10), vec!["m", "z"]);
    }

    #[test]
    fn test_add_mood_is_idempotent() {
        let mut tracker = BehaviorTracker::new();
        tracker.add_mood_to_track("t1", "chill");
        let once = tracker.track_moods("t1");
        tracker.add_mood_to_track("t1", "chill");

        assert_eq!(tracker.track_moods("t1"), once);
        assert_eq!(once, vec!["chill"]);
    }

    #[test]
    fn test_mood_index() {
        let mut tracker = BehaviorTracker::new();
        tracker.set_track_moods("t2", vec!["chill".into(), "focus".into(), "chill".into()]);
        tracker.add_mood_to_track("t1", "chill");
        tracker.add_mood_to_track("t3", "party");

        assert_eq!(tracker.track_moods("t2"), vec!["chill", "focus"]);
        assert_eq!(tracker.tracks_by_mood("chill"), vec!["t1", "t2"]);
        assert!(tracker.tracks_by_mood("sad").is_empty());

        tracker.remove_mood_from_track("t2", "chill");
        tracker.remove_mood_from_track("t2", "not-there");
        tracker.remove_mood_from_track("unknown", "chill");
        assert_eq!(tracker.tracks_by_mood("chill"), vec!["t1"]);
        assert!(tracker.meta("unknown").is_none());
    }

    #[test]
    fn test_rating_is_clamped() {
        let mut tracker = BehaviorTracker::new();
        assert_eq!(tracker.set_rating("t1", 9), 5);
        assert_eq!(tracker.rating("t1"), 5);
        assert_eq!(tracker.set_rating("t1", 2), 2);
        assert_eq!(tracker.rating("nope"), 0);
    }

    #[test]
    fn test_forget_track() {
        let mut tracker = BehaviorTracker::new();
        tracker.record_play("t1");
        tracker.record_play("t2");
        tracker.forget_track("t1");

        assert!(tracker.meta("t1").is_none());
        assert_eq!(tracker.recently_played(), vec!["t2"]);
    }

    #[test]
    fn test_annotation_projection() {
        let mut tracker = BehaviorTracker::new();
        let track = Track::from_picked("file:///a.mp3", "Band - Song.mp3");

        let view = tracker.annotate(&track);
        assert!(!view.is_favorite());
        assert_eq!(view.play_count(), 0);
        assert!(view.moods().is_empty());

        tracker.toggle_favorite(&track.id);
        tracker.record_play(&track.id);
        tracker.add_mood_to_track(&track.id, "happy");

        let view = tracker.annotate(&track);
        assert!(view.is_favorite());
        assert_eq!(view.play_count(), 1);
        assert_eq!(view.moods().to_vec(), vec!["happy"]);
        assert!(view.last_played_at().is_some());
    }

    #[test]
    fn test_snapshot_roundtrip_dedupes_recent() {
        let mut tracker = BehaviorTracker::new();
        tracker.record_play("a");
        tracker.toggle_favorite("b");

        let mut snapshot = tracker.snapshot();
        snapshot.recently_played.push("a".to_string());

        let mut restored = BehaviorTracker::new();
        restored.restore(snapshot);
        assert_eq!(restored.recently_played(), vec!["a"]);
        assert!(restored.is_favorite("b"));
        assert_eq!(restored.play_count("a"), 1);
    }
}
