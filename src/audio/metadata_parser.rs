use regex::Regex;

use super::{UNKNOWN_ALBUM, UNKNOWN_ARTIST};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub track_number: Option<u32>,
    pub pattern_used: String,
}

impl ParsedMetadata {
    fn fallback(title: String) -> Self {
        Self {
            title,
            artist: UNKNOWN_ARTIST.to_string(),
            album: UNKNOWN_ALBUM.to_string(),
            track_number: None,
            pattern_used: "Filename only".to_string(),
        }
    }

    pub fn has_artist(&self) -> bool {
        self.artist != UNKNOWN_ARTIST
    }

    pub fn has_album(&self) -> bool {
        self.album != UNKNOWN_ALBUM
    }
}

/// Best-effort {title, artist, album, track number} from a file name.
///
/// Patterns are tried most-specific first and the first match wins, so the
/// order of `patterns` is part of the observable behavior. The matching is
/// loose on purpose: "Artist - Song - Live" will come back as an album split.
pub struct MetadataParser {
    patterns: Vec<ParsePattern>,
}

#[derive(Debug, Clone)]
struct ParsePattern {
    name: &'static str,
    regex: Regex,
    track_group: Option<usize>,
    artist_group: Option<usize>,
    album_group: Option<usize>,
    title_group: usize,
}

impl MetadataParser {
    pub fn new() -> Self {
        // (name, regex, track, artist, album, title)
        let table: [(&'static str, &str, Option<usize>, Option<usize>, Option<usize>, usize); 5] = [
            // "01. Artist - Album - Title"
            (
                "Number. Artist - Album - Title",
                r"^(\d+)\.\s*(.+?)\s+-\s+(.+?)\s+-\s+(.+)$",
                Some(1),
                Some(2),
                Some(3),
                4,
            ),
            // "Artist - Album - Title"; the artist may start with digits ("2Pac")
            // but may not be a bare number, which belongs to the next pattern
            (
                "Artist - Album - Title",
                r"^(\d*[^\d\s].*?)\s+-\s+(.+?)\s+-\s+(.+)$",
                None,
                Some(1),
                Some(2),
                3,
            ),
            // "01 - Artist - Title"
            (
                "Number - Artist - Title",
                r"^(\d+)\s*-\s*(.+?)\s+-\s+(.+)$",
                Some(1),
                Some(2),
                None,
                3,
            ),
            // "Artist - Title"
            ("Artist - Title", r"^(.+?)\s+-\s+(.+)$", None, Some(1), None, 2),
            // "01. Title"
            ("Number. Title", r"^(\d+)\.\s*(.+)$", Some(1), None, None, 2),
        ];

        let mut patterns = Vec::with_capacity(table.len());
        for (name, source, track_group, artist_group, album_group, title_group) in table {
            if let Ok(regex) = Regex::new(source) {
                patterns.push(ParsePattern {
                    name,
                    regex,
                    track_group,
                    artist_group,
                    album_group,
                    title_group,
                });
            }
        }

        Self { patterns }
    }

    /// Parse just the file name. Never fails; the worst case is "whole name is the title".
    pub fn parse_filename(&self, filename: &str) -> ParsedMetadata {
        let name = clean_text(strip_extension(filename));

        for pattern in &self.patterns {
            let Some(captures) = pattern.regex.captures(&name) else {
                continue;
            };

            let group = |index: Option<usize>| {
                index
                    .and_then(|i| captures.get(i))
                    .map(|m| clean_text(m.as_str()))
                    .filter(|s| !s.is_empty())
            };

            let Some(title) = group(Some(pattern.title_group)) else {
                continue;
            };

            return ParsedMetadata {
                title,
                artist: group(pattern.artist_group).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
                album: group(pattern.album_group).unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
                track_number: group(pattern.track_group).and_then(|n| n.parse().ok()),
                pattern_used: pattern.name.to_string(),
            };
        }

        ParsedMetadata::fallback(name)
    }

    /// Parse the file name, then fill a still-unknown artist/album from the
    /// `.../Artist/Album/File.ext` folder layout.
    pub fn parse(&self, filename: &str, path: Option<&str>) -> ParsedMetadata {
        let mut parsed = self.parse_filename(filename);

        if let Some(path) = path {
            if !parsed.has_artist() || !parsed.has_album() {
                fill_from_path(&mut parsed, path);
            }
        }

        parsed
    }
}

impl Default for MetadataParser {
    fn default() -> Self {
        Self::new()
    }
}

fn fill_from_path(parsed: &mut ParsedMetadata, path: &str) {
    let segments: Vec<&str> = path
        .split(['/', '\\'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if segments.len() < 3 {
        return;
    }

    let artist_dir = segments[segments.len() - 3];
    let album_dir = segments[segments.len() - 2];

    // a dot means the segment is probably a file, not a folder
    if !parsed.has_artist() && !artist_dir.contains('.') {
        parsed.artist = artist_dir.to_string();
    }
    if !parsed.has_album() && !album_dir.contains('.') {
        parsed.album = album_dir.to_string();
    }
}

/// Drop a trailing ".ext". Only short alphanumeric suffixes count, so
/// "03. Jacob's Note" keeps its dot.
pub fn strip_extension(filename: &str) -> &str {
    match extension_of(filename) {
        Some(ext) => &filename[..filename.len() - ext.len() - 1],
        None => filename,
    }
}

/// The suffix `strip_extension` would drop, without the dot
pub fn extension_of(filename: &str) -> Option<&str> {
    let pos = filename.rfind('.').filter(|&pos| pos > 0)?;
    let ext = &filename[pos + 1..];
    if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext)
    } else {
        None
    }
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
