use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::metadata_parser::{extension_of, strip_extension, MetadataParser};
use super::quality::{get_quality_label, QualityLabel};
use super::{
    is_dsd_format, is_high_res, is_lossless_format, normalize_extension, DEFAULT_BIT_DEPTH, DEFAULT_CHANNELS,
    DEFAULT_SAMPLE_RATE, UNKNOWN_ALBUM, UNKNOWN_ARTIST,
};

/// Canonical playable unit.
///
/// User data (favorite, play count, moods, rating) is not stored here; it lives
/// in the behavior store keyed by `id` and is projected on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub uri: String,
    pub file_path: String,
    pub file_name: String,

    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: Option<String>,
    pub genre: Option<String>,
    pub year: Option<u32>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub composer: Option<String>,
    pub album_art_uri: Option<String>,

    /// Seconds. 0.0 means unknown until the transport loads the file.
    pub duration: f64,
    pub sample_rate: u32,
    pub bit_depth: u16,
    /// kbps
    pub bit_rate: Option<u32>,
    pub channels: u16,
    /// Uppercase extension, e.g. "FLAC"
    pub format: String,
    pub codec: Option<String>,

    pub added_at: DateTime<Utc>,
}

/// Raw record coming out of a library scan, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedTrack {
    pub id: String,
    pub uri: String,
    pub path: String,
    pub filename: String,
    pub folder: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub genre: Option<String>,
    pub year: Option<u32>,
    pub track_number: Option<u32>,
    pub duration: Option<f64>,
    pub sample_rate: Option<u32>,
    pub bit_depth: Option<u16>,
    pub bitrate: Option<u32>,
    pub channels: Option<u16>,
    /// With or without the dot, any case
    pub extension: String,
    pub album_art_uri: Option<String>,
}

impl Track {
    /// Build a track for a file the user picked directly (not from a scan).
    /// The id is random; title/artist/album come from the file name.
    pub fn from_picked(uri: impl Into<String>, file_name: impl Into<String>) -> Self {
        let uri = uri.into();
        let file_name = file_name.into();
        let parsed = MetadataParser::new().parse_filename(&file_name);
        let extension = extension_of(&file_name).unwrap_or_default();

        Self {
            id: Uuid::new_v4().to_string(),
            file_path: uri.clone(),
            uri,
            title: parsed.title,
            artist: parsed.artist,
            album: parsed.album,
            album_artist: None,
            genre: None,
            year: None,
            track_number: parsed.track_number,
            disc_number: None,
            composer: None,
            album_art_uri: None,
            duration: 0.0,
            sample_rate: DEFAULT_SAMPLE_RATE,
            bit_depth: DEFAULT_BIT_DEPTH,
            bit_rate: None,
            channels: DEFAULT_CHANNELS,
            format: normalize_extension(extension).to_ascii_uppercase(),
            codec: None,
            added_at: Utc::now(),
            file_name,
        }
    }

    pub fn is_lossless(&self) -> bool {
        is_lossless_format(&self.format)
    }

    pub fn is_dsd(&self) -> bool {
        is_dsd_format(&self.format)
    }

    pub fn is_high_res(&self) -> bool {
        is_high_res(&self.format, self.sample_rate, self.bit_depth)
    }

    pub fn quality_label(&self) -> QualityLabel {
        get_quality_label(&self.format, self.sample_rate, self.bit_depth)
    }

    pub fn has_known_duration(&self) -> bool {
        self.duration > 0.0
    }

    pub fn display_line(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

/// Normalize a scanned record into a playable track. Total: any combination of
/// missing fields maps to a documented default instead of failing.
pub fn scanned_track_to_track(scanned: &ScannedTrack) -> Track {
    let extension = normalize_extension(&scanned.extension);

    let title = non_empty(scanned.title.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| strip_extension(&scanned.filename).to_string());

    Track {
        id: scanned.id.clone(),
        uri: scanned.uri.clone(),
        file_path: scanned.path.clone(),
        file_name: scanned.filename.clone(),
        title,
        artist: non_empty(scanned.artist.as_deref()).unwrap_or(UNKNOWN_ARTIST).to_string(),
        album: non_empty(scanned.album.as_deref()).unwrap_or(UNKNOWN_ALBUM).to_string(),
        album_artist: scanned.album_artist.clone(),
        genre: scanned.genre.clone(),
        year: scanned.year,
        track_number: scanned.track_number,
        disc_number: None,
        composer: None,
        album_art_uri: scanned.album_art_uri.clone(),
        duration: scanned.duration.filter(|d| d.is_finite() && *d > 0.0).unwrap_or(0.0),
        sample_rate: scanned.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE),
        bit_depth: scanned.bit_depth.unwrap_or(DEFAULT_BIT_DEPTH),
        bit_rate: scanned.bitrate,
        channels: scanned.channels.unwrap_or(DEFAULT_CHANNELS),
        format: extension.to_ascii_uppercase(),
        codec: None,
        added_at: Utc::now(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanned(extension: &str) -> ScannedTrack {
        ScannedTrack {
            id: "abc".to_string(),
            uri: "file:///music/a.flac".to_string(),
            path: "/music/a.flac".to_string(),
            filename: "a.flac".to_string(),
            folder: "/music".to_string(),
            extension: extension.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_all_optional_fields_absent() {
        let track = scanned_track_to_track(&ScannedTrack::default());

        assert_eq!(track.duration, 0.0);
        assert_eq!(track.sample_rate, 44_100);
        assert_eq!(track.bit_depth, 16);
        assert_eq!(track.channels, 2);
        assert_eq!(track.title, "");
        assert_eq!(track.artist, "Unknown Artist");
        assert_eq!(track.album, "Unknown Album");
        assert_eq!(track.format, "");
        assert!(!track.is_lossless());
        assert!(!track.is_high_res());
    }

    #[test]
    fn test_title_falls_back_to_file_stem() {
        let track = scanned_track_to_track(&scanned("flac"));
        assert_eq!(track.title, "a");

        let mut blank_title = scanned("flac");
        blank_title.title = Some("   ".to_string());
        assert_eq!(scanned_track_to_track(&blank_title).title, "a");
    }

    #[test]
    fn test_extension_normalized_for_classification() {
        for ext in ["flac", ".flac", "FLAC", ".Flac"] {
            let track = scanned_track_to_track(&scanned(ext));
            assert_eq!(track.format, "FLAC");
            assert!(track.is_lossless(), "{}", ext);
            assert!(!track.is_dsd());
        }
    }

    #[test]
    fn test_dsd_is_high_res_but_not_lossless() {
        let track = scanned_track_to_track(&scanned(".DSF"));
        assert!(track.is_dsd());
        assert!(track.is_high_res());
        assert!(!track.is_lossless());
        assert_eq!(track.quality_label(), QualityLabel::Dsd64);
    }

    #[test]
    fn test_high_res_needs_rate_and_depth() {
        let mut record = scanned("flac");
        record.sample_rate = Some(96_000);
        record.bit_depth = Some(24);
        assert!(scanned_track_to_track(&record).is_high_res());

        record.bit_depth = None;
        assert!(!scanned_track_to_track(&record).is_high_res());
    }

    #[test]
    fn test_provided_fields_are_kept() {
        let mut record = scanned("mp3");
        record.title = Some("Song".to_string());
        record.artist = Some("Band".to_string());
        record.album = Some("Record".to_string());
        record.duration = Some(201.5);
        record.bitrate = Some(320);
        record.year = Some(1999);
        record.track_number = Some(4);

        let track = scanned_track_to_track(&record);
        assert_eq!(track.id, "abc");
        assert_eq!(track.title, "Song");
        assert_eq!(track.artist, "Band");
        assert_eq!(track.album, "Record");
        assert_eq!(track.duration, 201.5);
        assert_eq!(track.bit_rate, Some(320));
        assert_eq!(track.year, Some(1999));
        assert_eq!(track.track_number, Some(4));
        assert_eq!(track.format, "MP3");
    }

    #[test]
    fn test_bad_duration_becomes_unknown() {
        let mut record = scanned("mp3");
        record.duration = Some(f64::NAN);
        assert_eq!(scanned_track_to_track(&record).duration, 0.0);

        record.duration = Some(-1.0);
        assert!(!scanned_track_to_track(&record).has_known_duration());
    }

    #[test]
    fn test_picked_track() {
        let track = Track::from_picked("content://picker/42", "03. Jacob's Note.flac");
        let other = Track::from_picked("content://picker/42", "03. Jacob's Note.flac");

        assert_ne!(track.id, other.id);
        assert_eq!(track.title, "Jacob's Note");
        assert_eq!(track.track_number, Some(3));
        assert_eq!(track.format, "FLAC");
        assert_eq!(track.duration, 0.0);
        assert!(track.is_lossless());
    }

    #[test]
    fn test_picked_track_without_extension() {
        let track = Track::from_picked("content://picker/7", "03. Jacob's Note");

        assert_eq!(track.title, "Jacob's Note");
        assert_eq!(track.format, "");
        assert!(!track.is_lossless());
    }
}
