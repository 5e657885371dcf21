// Tunewell Library - Core modules for a local music player
// Everything here is UI-agnostic; audio output plugs in through AudioTransport

pub mod audio;     // tracks, scanning, metadata, queue, playback control
pub mod behavior;  // favorites, plays, moods, ratings
pub mod config;    // settings file
pub mod error;     // crate error type
pub mod library;   // known tracks + search
pub mod session;   // owns and persists everything
pub mod settings;  // equalizer values
pub mod storage;   // key-value persistence backends

// Export the stuff other modules actually use
pub use audio::{
    AudioTransport, MusicScanner, PlaybackController, PlayerEvent, PlayerQueue, Track, TransportStatus,
};
pub use behavior::{AnnotatedTrack, BehaviorTracker, TrackMeta};
pub use config::Config;
pub use error::{Error, Result};
pub use library::Library;
pub use session::Session;
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
