//! Playback queue state machine
//!
//! Owns queue membership and ordering, the current position, shuffle and
//! repeat. The audio transport is only ever told what to play; it never
//! decides ordering.
//!
//! Every bounds problem is handled by clamping or by returning `false`/`None`,
//! never by panicking. Nothing in here does I/O.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::player::TransportStatus;
use super::track::Track;

/// Default for "previous restarts the current track instead" (seconds)
pub const DEFAULT_RESTART_THRESHOLD_SECS: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueSource {
    Manual,
    Playlist,
    Streaming,
}

/// One entry in the queue. The same track may be queued more than once;
/// each entry gets its own id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: String,
    pub track: Track,
    pub added_at: DateTime<Utc>,
    pub source: QueueSource,
    pub source_id: Option<String>,
}

impl QueueItem {
    pub fn new(track: Track, source: QueueSource, source_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            track,
            added_at: Utc::now(),
            source,
            source_id,
        }
    }

    pub fn manual(track: Track) -> Self {
        Self::new(track, QueueSource::Manual, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Buffering,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    Queue,
    Track,
}

impl RepeatMode {
    /// off -> queue -> track -> off
    pub fn next(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::Queue,
            RepeatMode::Queue => RepeatMode::Track,
            RepeatMode::Track => RepeatMode::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub position: f64,
    pub duration: f64,
    pub buffered: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// Right after the current item
    Next,
    /// At the end
    Last,
}

/// What `skip_to_previous` decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviousAction {
    /// Far enough into the track: start it over, index unchanged
    RestartCurrent,
    /// Now pointing at this index (may equal the old one when clamped at 0)
    MovedTo(usize),
    /// Nothing queued
    Empty,
}

/// The part of the queue state that is persisted between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub queue: Vec<QueueItem>,
    pub original_queue: Vec<QueueItem>,
    pub queue_index: Option<usize>,
    pub repeat_mode: RepeatMode,
    pub is_shuffled: bool,
    pub volume: f32,
    pub is_muted: bool,
}

#[derive(Debug, Clone)]
pub struct PlayerQueue {
    queue: Vec<QueueItem>,

    /// Order before shuffling. Only meaningful while `is_shuffled`.
    original_queue: Vec<QueueItem>,

    /// `None` exactly when the queue is empty
    queue_index: Option<usize>,

    state: PlaybackState,
    progress: Progress,
    volume: f32,
    is_muted: bool,
    repeat_mode: RepeatMode,
    is_shuffled: bool,
    last_error: Option<String>,
    restart_threshold: f64,
}

impl PlayerQueue {
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            original_queue: Vec::new(),
            queue_index: None,
            state: PlaybackState::Idle,
            progress: Progress::default(),
            volume: 1.0,
            is_muted: false,
            repeat_mode: RepeatMode::Off,
            is_shuffled: false,
            last_error: None,
            restart_threshold: DEFAULT_RESTART_THRESHOLD_SECS,
        }
    }

    pub fn with_restart_threshold(mut self, seconds: f64) -> Self {
        self.restart_threshold = seconds.max(0.0);
        self
    }

    // --- reads -------------------------------------------------------------

    pub fn queue(&self) -> &[QueueItem] {
        &self.queue
    }

    pub fn original_queue(&self) -> &[QueueItem] {
        &self.original_queue
    }

    pub fn queue_index(&self) -> Option<usize> {
        self.queue_index
    }

    pub fn current_item(&self) -> Option<&QueueItem> {
        self.queue_index.and_then(|i| self.queue.get(i))
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_item().map(|item| &item.track)
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// What actually reaches the speaker
    pub fn effective_volume(&self) -> f32 {
        if self.is_muted {
            0.0
        } else {
            self.volume
        }
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    pub fn is_shuffled(&self) -> bool {
        self.is_shuffled
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    // --- queue membership --------------------------------------------------

    /// Replace the queue. Does not start playback; that is the transport's job.
    pub fn set_queue(&mut self, items: Vec<QueueItem>) {
        self.queue_index = if items.is_empty() { None } else { Some(0) };
        self.original_queue = items.clone();
        self.queue = items;
        self.progress = Progress::default();
        self.last_error = None;
        if self.queue.is_empty() {
            self.state = PlaybackState::Idle;
        }
        debug!("Queue replaced with {} items", self.queue.len());
    }

    /// Insert after the current item (`Next`) or append (`Last`).
    ///
    /// `Next` with nothing current falls back to appending. Either way the
    /// original order is reset to the new order, so a fresh add forgets
    /// the pre-shuffle order.
    pub fn add_to_queue(&mut self, items: Vec<QueueItem>, position: InsertPosition) {
        if items.is_empty() {
            return;
        }

        let count = items.len();
        match (position, self.queue_index) {
            (InsertPosition::Next, Some(current)) => {
                let tail = self.queue.split_off(current + 1);
                self.queue.extend(items);
                self.queue.extend(tail);
            }
            _ => self.queue.extend(items),
        }

        if self.queue_index.is_none() {
            self.queue_index = Some(0);
        }
        self.original_queue = self.queue.clone();
        debug!("Added {} items to queue ({:?})", count, position);
    }

    /// Remove the item at `index`, keeping the index on the same logical track
    /// where possible. Returns the removed item, or `None` when out of bounds.
    pub fn remove_from_queue(&mut self, index: usize) -> Option<QueueItem> {
        if index >= self.queue.len() {
            return None;
        }

        let removed = self.queue.remove(index);
        if let Some(pos) = self.original_queue.iter().position(|item| item.id == removed.id) {
            self.original_queue.remove(pos);
        }

        let new_len = self.queue.len();
        self.queue_index = match self.queue_index {
            _ if new_len == 0 => None,
            Some(current) if index < current => Some(current - 1),
            Some(current) if index == current => {
                self.progress = Progress::default();
                Some(current.min(new_len - 1))
            }
            other => other,
        };

        if self.queue.is_empty() {
            self.state = PlaybackState::Idle;
            self.progress = Progress::default();
        }

        Some(removed)
    }

    /// Drop every queue entry for `track_id`. Returns whether the current
    /// item was among them, in which case playback goes idle.
    pub fn purge_track(&mut self, track_id: &str) -> bool {
        let current_id = self.current_item().map(|item| item.id.clone());
        let mut current_removed = false;

        let mut index = 0;
        while index < self.queue.len() {
            if self.queue[index].track.id == track_id {
                if let Some(removed) = self.remove_from_queue(index) {
                    current_removed |= current_id.as_deref() == Some(removed.id.as_str());
                }
            } else {
                index += 1;
            }
        }
        // remove_from_queue only touches original entries it finds; clean leftovers
        self.original_queue.retain(|item| item.track.id != track_id);

        if current_removed {
            self.state = PlaybackState::Idle;
            self.progress = Progress::default();
        }
        current_removed
    }

    /// Move an item, keeping the index on whatever was current
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        let len = self.queue.len();
        if from >= len || to >= len {
            return false;
        }
        if from == to {
            return true;
        }

        let current_id = self.current_item().map(|item| item.id.clone());
        let item = self.queue.remove(from);
        self.queue.insert(to, item);

        if let Some(id) = current_id {
            self.queue_index = self.queue.iter().position(|item| item.id == id);
        }
        if !self.is_shuffled {
            self.original_queue = self.queue.clone();
        }
        true
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.original_queue.clear();
        self.queue_index = None;
        self.state = PlaybackState::Idle;
        self.progress = Progress::default();
        debug!("Queue cleared");
    }

    // --- navigation --------------------------------------------------------

    /// Jump to `index`. `false` (and no change) when out of bounds.
    pub fn set_queue_index(&mut self, index: usize) -> bool {
        if index >= self.queue.len() {
            return false;
        }
        self.queue_index = Some(index);
        self.progress = Progress::default();
        true
    }

    pub fn skip_to_index(&mut self, index: usize) -> bool {
        self.set_queue_index(index)
    }

    /// Advance one item. Wraps only with `RepeatMode::Queue`; otherwise
    /// returns `false` at the end and leaves everything as it was, and the
    /// caller is expected to stop playback.
    pub fn skip_to_next(&mut self) -> bool {
        let Some(current) = self.queue_index else {
            return false;
        };

        let next = current + 1;
        if next < self.queue.len() {
            self.set_queue_index(next)
        } else if self.repeat_mode == RepeatMode::Queue {
            self.set_queue_index(0)
        } else {
            false
        }
    }

    /// Whether `skip_to_previous` would restart the current track
    pub fn should_restart_current(&self) -> bool {
        self.queue_index.is_some() && self.progress.position > self.restart_threshold
    }

    /// Go back one item, or restart the current one when past the restart
    /// threshold. At the start of the queue this wraps with
    /// `RepeatMode::Queue` and otherwise clamps to 0; unlike `skip_to_next`
    /// it never reports failure.
    pub fn skip_to_previous(&mut self) -> PreviousAction {
        let Some(current) = self.queue_index else {
            return PreviousAction::Empty;
        };

        if self.should_restart_current() {
            self.progress.position = 0.0;
            return PreviousAction::RestartCurrent;
        }

        let target = match current.checked_sub(1) {
            Some(previous) => previous,
            None if self.repeat_mode == RepeatMode::Queue => self.queue.len() - 1,
            None => 0,
        };
        self.set_queue_index(target);
        PreviousAction::MovedTo(target)
    }

    // --- modes -------------------------------------------------------------

    /// Shuffle on: Fisher-Yates over everything but the current item, which
    /// is put back at its old position so it does not visibly move.
    /// Shuffle off: restore the original order and find the current item in it.
    pub fn toggle_shuffle(&mut self) {
        self.toggle_shuffle_with(&mut rand::thread_rng());
    }

    pub fn toggle_shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.is_shuffled {
            self.unshuffle();
        } else {
            self.shuffle(rng);
        }
        debug!("Shuffle is now {}", if self.is_shuffled { "on" } else { "off" });
    }

    fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.original_queue = self.queue.clone();

        match self.queue_index {
            Some(current) => {
                let current_item = self.queue.remove(current);
                self.queue.shuffle(rng);
                self.queue.insert(current, current_item);
            }
            None => self.queue.shuffle(rng),
        }

        self.is_shuffled = true;
    }

    fn unshuffle(&mut self) {
        let current = self.current_item().map(|item| (item.id.clone(), item.track.id.clone()));
        self.queue = self.original_queue.clone();

        self.queue_index = if self.queue.is_empty() {
            None
        } else {
            // same entry first, then any entry of the same track, then the top
            let found = current.and_then(|(item_id, track_id)| {
                self.queue
                    .iter()
                    .position(|item| item.id == item_id)
                    .or_else(|| self.queue.iter().position(|item| item.track.id == track_id))
            });
            Some(found.unwrap_or(0))
        };

        self.is_shuffled = false;
    }

    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        self.repeat_mode = self.repeat_mode.next();
        self.repeat_mode
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat_mode = mode;
    }

    // --- transport-driven state ---------------------------------------------

    pub fn set_state(&mut self, state: PlaybackState) {
        self.state = state;
    }

    pub fn set_progress(&mut self, position: f64, duration: f64) {
        self.progress.position = position.max(0.0);
        self.progress.duration = duration.max(0.0);
        self.resolve_duration(duration);
    }

    /// Fold a transport status report into progress and state. Returns true
    /// when the report resolved the current track's unknown duration.
    pub fn apply_status(&mut self, status: &TransportStatus) -> bool {
        let learned = status.duration_seconds.is_finite()
            && status.duration_seconds > 0.0
            && self.current_track().is_some_and(|track| !track.has_known_duration());

        self.set_progress(status.position_seconds, status.duration_seconds);

        if self.queue_index.is_some() && !status.did_just_finish {
            if status.is_playing {
                self.state = PlaybackState::Playing;
            } else if self.state == PlaybackState::Playing {
                self.state = PlaybackState::Paused;
            }
        }
        learned
    }

    pub fn set_buffered(&mut self, buffered: f64) {
        self.progress.buffered = buffered.max(0.0);
    }

    pub fn restart_current(&mut self) {
        self.progress.position = 0.0;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.last_error = error;
    }

    /// A track scanned with an unknown length gets it from the first load
    fn resolve_duration(&mut self, duration: f64) {
        if !(duration.is_finite() && duration > 0.0) {
            return;
        }
        let Some(current) = self.queue_index else {
            return;
        };

        let track_id = match self.queue.get(current) {
            Some(item) if !item.track.has_known_duration() => item.track.id.clone(),
            _ => return,
        };

        for item in self.queue.iter_mut().chain(self.original_queue.iter_mut()) {
            if item.track.id == track_id {
                item.track.duration = duration;
            }
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 0.0 };
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.is_muted = !self.is_muted;
        self.is_muted
    }

    // --- persistence -------------------------------------------------------

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            queue: self.queue.clone(),
            original_queue: self.original_queue.clone(),
            queue_index: self.queue_index,
            repeat_mode: self.repeat_mode,
            is_shuffled: self.is_shuffled,
            volume: self.volume,
            is_muted: self.is_muted,
        }
    }

    /// Restore persisted state. Playback state and progress start fresh and
    /// a stale index is clamped back into range.
    pub fn restore(&mut self, snapshot: QueueSnapshot) {
        self.queue = snapshot.queue;
        self.original_queue = if snapshot.is_shuffled {
            snapshot.original_queue
        } else {
            self.queue.clone()
        };
        self.queue_index = match (self.queue.len(), snapshot.queue_index) {
            (0, _) => None,
            (len, Some(index)) => Some(index.min(len - 1)),
            (_, None) => Some(0),
        };
        self.repeat_mode = snapshot.repeat_mode;
        self.is_shuffled = snapshot.is_shuffled;
        self.set_volume(snapshot.volume);
        self.is_muted = snapshot.is_muted;
        self.state = PlaybackState::Idle;
        self.progress = Progress::default();
        self.last_error = None;
    }
}

impl Default for PlayerQueue {
    fn default() -> Self {
        Self::new()
    }
}
