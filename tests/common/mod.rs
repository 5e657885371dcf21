#![allow(dead_code)]

use tunewell::audio::{scanned_track_to_track, QueueItem, ScannedTrack};
use tunewell::{AudioTransport, Error, Result, Track, TransportStatus};

/// Transport double that remembers every call and can be told to fail
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub calls: Vec<String>,
    pub fail_next: bool,
}

impl RecordingTransport {
    fn record(&mut self, call: String) -> Result<()> {
        if self.fail_next {
            self.fail_next = false;
            return Err(Error::Transport("device unavailable".to_string()));
        }
        self.calls.push(call);
        Ok(())
    }

    pub fn last_call(&self) -> Option<&str> {
        self.calls.last().map(String::as_str)
    }
}

impl AudioTransport for RecordingTransport {
    async fn play_queue(&mut self, items: &[QueueItem], start_index: usize) -> Result<()> {
        self.record(format!("play_queue({}, {})", items.len(), start_index))
    }

    async fn skip_to_index(&mut self, index: usize) -> Result<()> {
        self.record(format!("skip_to_index({})", index))
    }

    async fn pause(&mut self) -> Result<()> {
        self.record("pause".to_string())
    }

    async fn resume(&mut self) -> Result<()> {
        self.record("resume".to_string())
    }

    async fn seek_to(&mut self, seconds: f64) -> Result<()> {
        self.record(format!("seek_to({})", seconds))
    }

    async fn stop(&mut self) -> Result<()> {
        self.record("stop".to_string())
    }
}

pub fn track(id: &str) -> Track {
    scanned_track_to_track(&ScannedTrack {
        id: id.to_string(),
        uri: format!("file:///music/{}.flac", id),
        path: format!("/music/{}.flac", id),
        filename: format!("{}.flac", id),
        folder: "/music".to_string(),
        title: Some(format!("Song {}", id)),
        artist: Some("Band".to_string()),
        extension: "flac".to_string(),
        ..Default::default()
    })
}

pub fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| track(id)).collect()
}

pub fn playing_at(position: f64, duration: f64) -> TransportStatus {
    TransportStatus {
        position_seconds: position,
        duration_seconds: duration,
        is_playing: true,
        did_just_finish: false,
    }
}

pub fn finished(duration: f64) -> TransportStatus {
    TransportStatus {
        position_seconds: duration,
        duration_seconds: duration,
        is_playing: false,
        did_just_finish: true,
    }
}
