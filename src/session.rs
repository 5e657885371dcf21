//! Application state container
//!
//! Built once at startup and passed to whatever drives it. Owns the library,
//! playlists, player and settings plus the store they persist to. Mutations
//! only touch memory; `flush` writes everything out afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::audio::queue::QueueSnapshot;
use crate::audio::{
    AudioTransport, CustomPlaylist, PlaybackController, PlayerEvent, PlayerQueue, PlaylistManager, QueueItem,
    QueueSource, ScannedTrack, Track, TransportStatus,
};
use crate::behavior::{AnnotatedTrack, BehaviorSnapshot, BehaviorTracker, TrackMeta};
use crate::config::PlaybackConfig;
use crate::error::{Error, Result};
use crate::library::Library;
use crate::settings::Settings;
use crate::storage::{
    load_value, save_value, KeyValueStore, LIBRARY_STORAGE_KEY, PLAYER_STORAGE_KEY, PLAYLISTS_STORAGE_KEY,
    SETTINGS_STORAGE_KEY,
};

/// Blob under `tunewell-playlists`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PlaylistsBlob {
    track_meta: HashMap<String, TrackMeta>,
    recently_played: Vec<String>,
    custom_playlists: Vec<CustomPlaylist>,
}

/// Blob under `tunewell-library`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct LibraryBlob {
    tracks: Vec<Track>,
}

pub struct Session<T: AudioTransport> {
    library: Library,
    playlists: PlaylistManager,
    player: PlaybackController<T>,
    settings: Settings,
    store: Box<dyn KeyValueStore>,
    most_played_limit: usize,
}

impl<T: AudioTransport> Session<T> {
    /// Build a session and restore whatever `store` holds. An empty store
    /// (first run) gives an empty session.
    pub fn open(transport: T, store: Box<dyn KeyValueStore>, playback: &PlaybackConfig) -> Self {
        let queue = PlayerQueue::new().with_restart_threshold(playback.restart_threshold_secs);
        let behavior = BehaviorTracker::with_recently_played_limit(playback.recently_played_limit);

        let mut session = Self {
            library: Library::new(),
            playlists: PlaylistManager::new(),
            player: PlaybackController::with_parts(transport, queue, behavior),
            settings: Settings::default(),
            store,
            most_played_limit: playback.most_played_limit,
        };
        session.restore();
        session
    }

    /// Reload every store from persistence. Missing or corrupt blobs leave
    /// that part at its defaults.
    pub fn restore(&mut self) {
        let store = &*self.store;

        if let Some(blob) = load_value::<LibraryBlob>(store, LIBRARY_STORAGE_KEY) {
            self.library = Library::from_tracks(blob.tracks);
        }

        if let Some(blob) = load_value::<PlaylistsBlob>(store, PLAYLISTS_STORAGE_KEY) {
            self.player.behavior_mut().restore(BehaviorSnapshot {
                track_meta: blob.track_meta,
                recently_played: blob.recently_played,
            });
            self.playlists = PlaylistManager::from_playlists(blob.custom_playlists);
        }

        if let Some(mut settings) = load_value::<Settings>(store, SETTINGS_STORAGE_KEY) {
            settings.equalizer.sanitize();
            self.settings = settings;
        }

        if let Some(snapshot) = load_value::<QueueSnapshot>(store, PLAYER_STORAGE_KEY) {
            self.player.queue_mut().restore(snapshot);
        }

        info!(
            "Session restored: {} tracks, {} playlists, {} queued",
            self.library.len(),
            self.playlists.list_playlists().len(),
            self.player.queue().len()
        );
    }

    /// Write every store out. Failures are logged and state stays as it is
    /// in memory; returns whether every write went through.
    pub fn flush(&mut self) -> bool {
        let behavior = self.player.behavior().snapshot();
        let playlists = PlaylistsBlob {
            track_meta: behavior.track_meta,
            recently_played: behavior.recently_played,
            custom_playlists: self.playlists.list_playlists().to_vec(),
        };
        let library = LibraryBlob {
            tracks: self.library.tracks().to_vec(),
        };
        let queue = self.player.queue().snapshot();

        let store = &mut *self.store;
        let results = [
            (PLAYER_STORAGE_KEY, save_value(store, PLAYER_STORAGE_KEY, &queue)),
            (PLAYLISTS_STORAGE_KEY, save_value(store, PLAYLISTS_STORAGE_KEY, &playlists)),
            (SETTINGS_STORAGE_KEY, save_value(store, SETTINGS_STORAGE_KEY, &self.settings)),
            (LIBRARY_STORAGE_KEY, save_value(store, LIBRARY_STORAGE_KEY, &library)),
        ];

        let mut ok = true;
        for (key, result) in results {
            if let Err(e) = result {
                warn!("Failed to persist '{}': {}", key, e);
                ok = false;
            }
        }
        ok
    }

    /// Player events from now on go to the returned receiver
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<PlayerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.player.set_event_sender(tx);
        rx
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn playlists(&self) -> &PlaylistManager {
        &self.playlists
    }

    pub fn playlists_mut(&mut self) -> &mut PlaylistManager {
        &mut self.playlists
    }

    pub fn player(&self) -> &PlaybackController<T> {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut PlaybackController<T> {
        &mut self.player
    }

    pub fn behavior(&self) -> &BehaviorTracker {
        self.player.behavior()
    }

    pub fn behavior_mut(&mut self) -> &mut BehaviorTracker {
        self.player.behavior_mut()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    // --- library -----------------------------------------------------------

    pub fn import_scanned(&mut self, scanned: &[ScannedTrack]) -> usize {
        self.library.add_scanned(scanned)
    }

    pub fn add_tracks(&mut self, tracks: Vec<Track>) -> usize {
        self.library.add_tracks(tracks)
    }

    /// Remove a track from the library and from everything that refers to it
    pub async fn remove_track(&mut self, track_id: &str) -> Result<Option<Track>> {
        let removed = self.library.remove_track(track_id);
        self.player.behavior_mut().forget_track(track_id);
        self.playlists.remove_track_everywhere(track_id);

        if let Some(track) = &removed {
            info!("Removed '{}' from library", track.display_line());
        }
        // queue entries go before the transport is told to stop
        self.player.purge_track(track_id).await?;
        Ok(removed)
    }

    /// Empty the library. The queue goes with it, playlists stay but lose
    /// their tracks, and all per-track data is dropped.
    pub async fn clear_library(&mut self) -> Result<()> {
        let ids: Vec<String> = self.library.tracks().iter().map(|t| t.id.clone()).collect();
        for id in &ids {
            self.playlists.remove_track_everywhere(id);
        }
        self.library.clear();
        self.player.behavior_mut().clear();
        self.player.clear_queue().await?;
        info!("Library cleared ({} tracks)", ids.len());
        Ok(())
    }

    pub fn annotated(&self, track_id: &str) -> Option<AnnotatedTrack<'_>> {
        self.library
            .get(track_id)
            .map(|track| self.player.behavior().annotate(track))
    }

    // --- behavior views ----------------------------------------------------

    pub fn most_played(&self) -> Vec<&Track> {
        let ids = self.player.behavior().most_played_ids(self.most_played_limit);
        self.library.get_many(&ids)
    }

    pub fn favorites(&self) -> Vec<&Track> {
        self.library.get_many(&self.player.behavior().favorite_ids())
    }

    pub fn recently_played(&self) -> Vec<&Track> {
        self.library.get_many(&self.player.behavior().recently_played())
    }

    pub fn tracks_by_mood(&self, mood: &str) -> Vec<&Track> {
        self.library.get_many(&self.player.behavior().tracks_by_mood(mood))
    }

    /// Tracks of a playlist in playlist order; ids no longer in the library are skipped
    pub fn playlist_tracks(&self, playlist_id: &str) -> Option<Vec<&Track>> {
        self.playlists
            .get_playlist(playlist_id)
            .map(|playlist| self.library.get_many(&playlist.track_ids))
    }

    // --- playback ----------------------------------------------------------

    pub async fn play_playlist(&mut self, playlist_id: &str, start_index: usize) -> Result<()> {
        let tracks = self
            .playlist_tracks(playlist_id)
            .ok_or_else(|| Error::PlaylistNotFound(playlist_id.to_string()))?;
        let items = tracks
            .into_iter()
            .map(|track| QueueItem::new(track.clone(), QueueSource::Playlist, Some(playlist_id.to_string())))
            .collect();
        self.player.play_items(items, start_index).await
    }

    /// Play library tracks by id; unknown ids are skipped
    pub async fn play_track_ids(&mut self, ids: &[String], start_index: usize) -> Result<()> {
        let tracks = self.library.get_many(ids).into_iter().cloned().collect();
        self.player.play_tracks(tracks, start_index).await
    }

    /// Forward a transport report and copy a newly learned duration into the library
    pub async fn on_status(&mut self, status: TransportStatus) -> Result<()> {
        let learning = self
            .player
            .current_track()
            .filter(|track| !track.has_known_duration())
            .map(|track| track.id.clone());

        self.player.on_status(status).await?;

        if let Some(id) = learning {
            self.library.set_duration(&id, status.duration_seconds);
        }
        Ok(())
    }
}
