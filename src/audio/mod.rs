pub mod metadata_parser;
pub mod player;
pub mod playlist;
pub mod quality;
pub mod queue;
pub mod scanner;
pub mod track;

pub use metadata_parser::{extension_of, MetadataParser, ParsedMetadata};
pub use player::{AudioTransport, PlaybackController, PlayerEvent, TransportStatus};
pub use playlist::{CustomPlaylist, PlaylistManager};
pub use quality::{get_quality_label, QualityLabel};
pub use queue::{InsertPosition, PlaybackState, PlayerQueue, PreviousAction, Progress, QueueItem, QueueSource, RepeatMode};
pub use scanner::{MusicScanner, ScanProgress};
pub use track::{scanned_track_to_track, ScannedTrack, Track};

/// Lossless PCM containers/codecs
pub const LOSSLESS_FORMATS: &[&str] = &["flac", "wav", "aiff", "alac", "ape", "wv"];

/// Direct Stream Digital containers
pub const DSD_FORMATS: &[&str] = &["dsf", "dff", "dsd"];

/// Everything the scanner will pick up
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "aac", "ogg", "opus", "flac", "wav", "aiff", "aif", "alac", "ape", "wv", "dsf", "dff", "dsd",
];

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_BIT_DEPTH: u16 = 16;
pub const DEFAULT_CHANNELS: u16 = 2;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Lowercase an extension or format name and drop a leading dot: ".FLAC" -> "flac"
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

pub fn is_lossless_format(format: &str) -> bool {
    LOSSLESS_FORMATS.contains(&normalize_extension(format).as_str())
}

pub fn is_dsd_format(format: &str) -> bool {
    DSD_FORMATS.contains(&normalize_extension(format).as_str())
}

/// DSD always counts as high resolution; PCM needs both >= 88.2kHz and >= 24 bit
pub fn is_high_res(format: &str, sample_rate: u32, bit_depth: u16) -> bool {
    is_dsd_format(format) || (sample_rate >= 88_200 && bit_depth >= 24)
}

pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&normalize_extension(ext).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_normalization() {
        assert_eq!(normalize_extension(".FLAC"), "flac");
        assert_eq!(normalize_extension("Dsf"), "dsf");
        assert_eq!(normalize_extension(""), "");
    }

    #[test]
    fn test_format_families() {
        assert!(is_lossless_format(".Flac"));
        assert!(is_lossless_format("WV"));
        assert!(!is_lossless_format("mp3"));
        assert!(!is_lossless_format("dsf"));

        assert!(is_dsd_format("DFF"));
        assert!(!is_dsd_format("flac"));
    }

    #[test]
    fn test_high_res_rules() {
        assert!(is_high_res("flac", 96_000, 24));
        assert!(is_high_res("flac", 88_200, 24));
        assert!(!is_high_res("flac", 96_000, 16));
        assert!(!is_high_res("flac", 48_000, 24));
        // DSD qualifies regardless of the reported numbers
        assert!(is_high_res("dsf", 0, 1));
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_extension("M4A"));
        assert!(is_supported_extension(".dff"));
        assert!(!is_supported_extension("txt"));
    }
}
