use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::queue::{InsertPosition, PlaybackState, PlayerQueue, PreviousAction, QueueItem, RepeatMode};
use super::track::Track;
use crate::behavior::BehaviorTracker;
use crate::error::{Error, Result};

/// Whatever actually makes sound. It is handed the queue to play but never
/// decides ordering; every navigation decision is made by `PlayerQueue`.
#[allow(async_fn_in_trait)]
pub trait AudioTransport {
    /// Load `items` and start playing at `start_index`
    async fn play_queue(&mut self, items: &[QueueItem], start_index: usize) -> Result<()>;
    /// Jump within the queue last handed to `play_queue`
    async fn skip_to_index(&mut self, index: usize) -> Result<()>;
    async fn pause(&mut self) -> Result<()>;
    async fn resume(&mut self) -> Result<()>;
    async fn seek_to(&mut self, seconds: f64) -> Result<()>;
    async fn stop(&mut self) -> Result<()>;
}

/// Status report pushed by the transport
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransportStatus {
    pub position_seconds: f64,
    pub duration_seconds: f64,
    pub is_playing: bool,
    pub did_just_finish: bool,
}

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    TrackStarted(Track),
    TrackPaused,
    TrackResumed,
    TrackStopped,
    TrackFinished(Track),
    DurationLearned { track_id: String, duration: f64 },
    QueueChanged { len: usize },
    QueueEnded,
    ShuffleChanged(bool),
    RepeatModeChanged(RepeatMode),
    VolumeChanged(f32),
    Error(String),
}

/// Drives an `AudioTransport` from a `PlayerQueue` and records plays.
pub struct PlaybackController<T: AudioTransport> {
    queue: PlayerQueue,
    behavior: BehaviorTracker,
    transport: T,
    event_sender: Option<mpsc::UnboundedSender<PlayerEvent>>,
    /// Whether the transport holds the same item list as `queue`
    transport_synced: bool,
}

impl<T: AudioTransport> PlaybackController<T> {
    pub fn new(transport: T) -> Self {
        Self::with_parts(transport, PlayerQueue::new(), BehaviorTracker::new())
    }

    pub fn with_parts(transport: T, queue: PlayerQueue, behavior: BehaviorTracker) -> Self {
        Self {
            queue,
            behavior,
            transport,
            event_sender: None,
            transport_synced: false,
        }
    }

    pub fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<PlayerEvent>) {
        self.event_sender = Some(sender);
    }

    pub fn queue(&self) -> &PlayerQueue {
        &self.queue
    }

    /// Direct access for restore; marks the transport as stale
    pub fn queue_mut(&mut self) -> &mut PlayerQueue {
        self.transport_synced = false;
        &mut self.queue
    }

    pub fn behavior(&self) -> &BehaviorTracker {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut BehaviorTracker {
        &mut self.behavior
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.queue.current_track()
    }

    // --- starting playback ----------------------------------------------------

    /// Replace the queue with `tracks` and start at `start_index` (clamped)
    pub async fn play_tracks(&mut self, tracks: Vec<Track>, start_index: usize) -> Result<()> {
        let items = tracks.into_iter().map(QueueItem::manual).collect();
        self.play_items(items, start_index).await
    }

    pub async fn play_items(&mut self, items: Vec<QueueItem>, start_index: usize) -> Result<()> {
        self.queue.set_queue(items);
        self.transport_synced = false;
        self.emit(PlayerEvent::QueueChanged { len: self.queue.len() });

        if self.queue.is_empty() {
            return self.stop().await;
        }

        self.queue.set_queue_index(start_index.min(self.queue.len() - 1));
        self.start_current().await
    }

    /// Start whatever the queue index points at
    async fn start_current(&mut self) -> Result<()> {
        let Some(index) = self.queue.queue_index() else {
            return Ok(());
        };

        self.queue.set_state(PlaybackState::Buffering);
        self.queue.set_error(None);

        let result = if self.transport_synced {
            self.transport.skip_to_index(index).await
        } else {
            self.transport.play_queue(self.queue.queue(), index).await
        };

        match result {
            Ok(()) => {
                self.transport_synced = true;
                self.queue.set_state(PlaybackState::Playing);
                if let Some(track) = self.queue.current_track().cloned() {
                    let plays = self.behavior.record_play(&track.id);
                    info!("Now playing: {} (play #{})", track.display_line(), plays);
                    self.emit(PlayerEvent::TrackStarted(track));
                }
                Ok(())
            }
            Err(e) => {
                // current track is kept; navigation puts the old index back
                warn!("Transport failed to start item {}: {}", index, e);
                Err(self.transport_failed(e))
            }
        }
    }

    /// Resume a paused track after the queue changed under it. The transport
    /// gets the new list and is put back at the paused position; this is not
    /// a new play.
    async fn resume_resynced(&mut self) -> Result<()> {
        let Some(index) = self.queue.queue_index() else {
            return Ok(());
        };
        let position = self.queue.progress().position;

        let mut result = self.transport.play_queue(self.queue.queue(), index).await;
        if result.is_ok() && position > 0.0 {
            result = self.transport.seek_to(position).await;
        }

        match result {
            Ok(()) => {
                self.transport_synced = true;
                self.queue.set_error(None);
                self.queue.set_state(PlaybackState::Playing);
                debug!("Resynced transport at item {} ({:.1}s)", index, position);
                self.emit(PlayerEvent::TrackResumed);
                Ok(())
            }
            Err(e) => {
                warn!("Transport failed to resume item {}: {}", index, e);
                Err(self.transport_failed(e))
            }
        }
    }

    fn transport_failed(&mut self, error: Error) -> Error {
        self.transport_synced = false;
        self.queue.set_error(Some(error.to_string()));
        self.queue.set_state(PlaybackState::Idle);
        self.emit(PlayerEvent::Error(error.to_string()));
        error
    }

    // --- navigation -----------------------------------------------------------

    /// Returns `Ok(false)` at the end of the queue without repeat; nothing changes then.
    pub async fn next(&mut self) -> Result<bool> {
        let previous = self.queue.queue_index();
        if !self.queue.skip_to_next() {
            return Ok(false);
        }
        self.start_or_revert(previous).await?;
        Ok(true)
    }

    pub async fn previous(&mut self) -> Result<PreviousAction> {
        // the transport seeks first so a refused seek leaves the position alone
        if self.queue.should_restart_current() {
            self.transport.seek_to(0.0).await?;
        }

        let previous = self.queue.queue_index();
        let action = self.queue.skip_to_previous();
        if let PreviousAction::MovedTo(_) = action {
            self.start_or_revert(previous).await?;
        }
        Ok(action)
    }

    /// Returns `Ok(false)` for an out-of-range index
    pub async fn skip_to(&mut self, index: usize) -> Result<bool> {
        let previous = self.queue.queue_index();
        if !self.queue.skip_to_index(index) {
            return Ok(false);
        }
        self.start_or_revert(previous).await?;
        Ok(true)
    }

    /// Start the new current item; if the transport refuses, point back at
    /// the item that was current before the jump.
    async fn start_or_revert(&mut self, previous: Option<usize>) -> Result<()> {
        let result = self.start_current().await;
        if result.is_err() {
            if let Some(index) = previous {
                self.queue.set_queue_index(index);
            }
        }
        result
    }

    pub async fn toggle_play_pause(&mut self) -> Result<()> {
        match self.queue.state() {
            PlaybackState::Playing | PlaybackState::Buffering => {
                self.transport.pause().await?;
                self.queue.set_state(PlaybackState::Paused);
                self.emit(PlayerEvent::TrackPaused);
            }
            PlaybackState::Paused if self.transport_synced => {
                self.transport.resume().await?;
                self.queue.set_state(PlaybackState::Playing);
                self.emit(PlayerEvent::TrackResumed);
            }
            PlaybackState::Paused => self.resume_resynced().await?,
            // nothing loaded in the transport yet (fresh restore, or after a failure)
            PlaybackState::Idle => self.start_current().await?,
        }
        Ok(())
    }

    pub async fn seek(&mut self, seconds: f64) -> Result<()> {
        if self.queue.current_item().is_none() {
            return Ok(());
        }
        let duration = self.queue.progress().duration;
        let target = if duration > 0.0 { seconds.clamp(0.0, duration) } else { seconds.max(0.0) };
        self.transport.seek_to(target).await?;
        self.queue.set_progress(target, duration);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.transport.stop().await?;
        self.queue.set_state(PlaybackState::Idle);
        self.queue.restart_current();
        self.emit(PlayerEvent::TrackStopped);
        Ok(())
    }

    /// Feed a transport status report. End of track advances according to
    /// the repeat mode and pauses at the end of the queue.
    pub async fn on_status(&mut self, status: TransportStatus) -> Result<()> {
        if self.queue.apply_status(&status) {
            if let Some(track) = self.queue.current_track() {
                debug!("Learned duration {:.1}s for {}", track.duration, track.id);
                self.emit(PlayerEvent::DurationLearned {
                    track_id: track.id.clone(),
                    duration: track.duration,
                });
            }
        }

        if !status.did_just_finish {
            return Ok(());
        }

        if let Some(track) = self.queue.current_track().cloned() {
            self.emit(PlayerEvent::TrackFinished(track));
        }

        if self.queue.repeat_mode() == RepeatMode::Track {
            self.queue.restart_current();
            return self.start_current().await;
        }

        if self.queue.skip_to_next() {
            self.start_current().await
        } else {
            self.queue.set_state(PlaybackState::Paused);
            self.queue.restart_current();
            self.emit(PlayerEvent::QueueEnded);
            Ok(())
        }
    }

    // --- queue membership -----------------------------------------------------

    pub fn add_to_queue(&mut self, tracks: Vec<Track>, position: InsertPosition) {
        let items = tracks.into_iter().map(QueueItem::manual).collect();
        self.add_items(items, position);
    }

    pub fn add_items(&mut self, items: Vec<QueueItem>, position: InsertPosition) {
        self.queue.add_to_queue(items, position);
        self.transport_synced = false;
        self.emit(PlayerEvent::QueueChanged { len: self.queue.len() });
    }

    /// Remove one entry. Removing the playing entry moves playback on to
    /// whatever now sits at the current index.
    pub async fn remove_from_queue(&mut self, index: usize) -> Result<Option<QueueItem>> {
        let was_current = self.queue.queue_index() == Some(index);
        let was_active = matches!(self.queue.state(), PlaybackState::Playing | PlaybackState::Buffering);

        let Some(removed) = self.queue.remove_from_queue(index) else {
            return Ok(None);
        };
        self.transport_synced = false;
        self.emit(PlayerEvent::QueueChanged { len: self.queue.len() });

        if self.queue.is_empty() {
            self.stop().await?;
        } else if was_current && was_active {
            self.start_current().await?;
        }
        Ok(Some(removed))
    }

    /// Drop every entry of a track (library removal). Stops the transport
    /// when the playing track was among them.
    pub async fn purge_track(&mut self, track_id: &str) -> Result<()> {
        let before = self.queue.len();
        let was_current = self.queue.purge_track(track_id);
        if self.queue.len() != before {
            self.transport_synced = false;
            self.emit(PlayerEvent::QueueChanged { len: self.queue.len() });
        }
        if was_current {
            self.transport.stop().await?;
            self.emit(PlayerEvent::TrackStopped);
        }
        Ok(())
    }

    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        let moved = self.queue.move_item(from, to);
        if moved && from != to {
            self.transport_synced = false;
        }
        moved
    }

    pub async fn clear_queue(&mut self) -> Result<()> {
        self.queue.clear_queue();
        self.transport_synced = false;
        self.emit(PlayerEvent::QueueChanged { len: 0 });
        self.transport.stop().await?;
        self.emit(PlayerEvent::TrackStopped);
        Ok(())
    }

    // --- modes ----------------------------------------------------------------

    pub fn toggle_shuffle(&mut self) -> bool {
        self.toggle_shuffle_with(&mut rand::thread_rng())
    }

    pub fn toggle_shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        self.queue.toggle_shuffle_with(rng);
        self.transport_synced = false;
        let shuffled = self.queue.is_shuffled();
        self.emit(PlayerEvent::ShuffleChanged(shuffled));
        shuffled
    }

    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        let mode = self.queue.cycle_repeat_mode();
        self.emit(PlayerEvent::RepeatModeChanged(mode));
        mode
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.queue.set_volume(volume);
        self.emit(PlayerEvent::VolumeChanged(self.queue.volume()));
    }

    pub fn toggle_mute(&mut self) -> bool {
        let muted = self.queue.toggle_mute();
        self.emit(PlayerEvent::VolumeChanged(self.queue.effective_volume()));
        muted
    }

    fn emit(&self, event: PlayerEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event);
        }
    }
}
