use std::fs;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, warn};
use walkdir::WalkDir;
use xxhash_rust::xxh64::xxh64;

use super::metadata_parser::MetadataParser;
use super::track::ScannedTrack;
use super::{normalize_extension, SUPPORTED_EXTENSIONS};
use crate::error::Result;

/// Files bigger than this are not music
const MAX_FILE_SIZE: u64 = 1_000_000_000;

/// Walks music folders and turns every supported file into a `ScannedTrack`.
/// Tags are not read; title/artist/album come from the file name and folders.
pub struct MusicScanner {
    supported_extensions: Vec<String>,
    parser: MetadataParser,
}

#[derive(Debug, Clone)]
pub enum ScanProgress {
    Started { total_directories: usize },
    DirectoryStarted { path: PathBuf },
    TrackFound { track: ScannedTrack, progress: usize },
    DirectoryCompleted { path: PathBuf, tracks_found: usize },
    Completed { total_tracks: usize },
    Error { path: PathBuf, error: String },
}

impl MusicScanner {
    pub fn new() -> Self {
        Self {
            supported_extensions: SUPPORTED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            parser: MetadataParser::new(),
        }
    }

    /// Restrict the scan to the given extensions (any case, dot optional)
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.supported_extensions = extensions.iter().map(|e| normalize_extension(e)).collect();
        self
    }

    pub fn scan_directory<P: AsRef<Path>>(&self, path: P) -> Vec<ScannedTrack> {
        self.candidate_files(path.as_ref())
            .into_iter()
            .filter_map(|file| match self.scan_file(&file) {
                Ok(track) => Some(track),
                Err(e) => {
                    warn!("Skipping {}: {}", file.display(), e);
                    None
                }
            })
            .collect()
    }

    pub fn scan_directories(&self, paths: &[PathBuf]) -> Vec<ScannedTrack> {
        let mut all_tracks = Vec::new();

        for path in paths {
            if path.exists() {
                all_tracks.extend(self.scan_directory(path));
            } else {
                warn!("Music directory does not exist: {}", path.display());
            }
        }

        debug!("Scanned {} directories, found {} tracks", paths.len(), all_tracks.len());
        all_tracks
    }

    /// Same as `scan_directories` but reports each step on `progress_tx`.
    /// A dropped receiver does not stop the scan.
    pub async fn scan_directories_incremental(
        &self,
        paths: &[PathBuf],
        progress_tx: mpsc::Sender<ScanProgress>,
    ) -> Vec<ScannedTrack> {
        let mut all_tracks = Vec::new();

        let _ = progress_tx
            .send(ScanProgress::Started {
                total_directories: paths.len(),
            })
            .await;

        for path in paths {
            if !path.exists() {
                let _ = progress_tx
                    .send(ScanProgress::Error {
                        path: path.clone(),
                        error: "Directory does not exist".to_string(),
                    })
                    .await;
                continue;
            }

            let _ = progress_tx
                .send(ScanProgress::DirectoryStarted { path: path.clone() })
                .await;

            let mut directory_tracks = 0;
            for file in self.candidate_files(path) {
                match self.scan_file(&file) {
                    Ok(track) => {
                        directory_tracks += 1;
                        all_tracks.push(track.clone());

                        let _ = progress_tx
                            .send(ScanProgress::TrackFound {
                                track,
                                progress: all_tracks.len(),
                            })
                            .await;

                        // Yield now and then so the receiver gets to run
                        if all_tracks.len() % 10 == 0 {
                            tokio::task::yield_now().await;
                        }
                    }
                    Err(e) => {
                        let _ = progress_tx
                            .send(ScanProgress::Error {
                                path: file.clone(),
                                error: e.to_string(),
                            })
                            .await;
                    }
                }
            }

            let _ = progress_tx
                .send(ScanProgress::DirectoryCompleted {
                    path: path.clone(),
                    tracks_found: directory_tracks,
                })
                .await;
        }

        let _ = progress_tx
            .send(ScanProgress::Completed {
                total_tracks: all_tracks.len(),
            })
            .await;

        all_tracks
    }

    /// Build the scan record for one file. The id is stable for a given path.
    pub fn scan_file(&self, path: &Path) -> Result<ScannedTrack> {
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file").into());
        }

        let path_str = path.to_string_lossy().to_string();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let folder = path
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| normalize_extension(&e.to_string_lossy()))
            .unwrap_or_default();

        let parsed = self.parser.parse(&filename, Some(&path_str));

        Ok(ScannedTrack {
            id: path_id(&path_str),
            uri: format!("file://{}", path_str),
            title: Some(parsed.title.clone()),
            artist: parsed.has_artist().then(|| parsed.artist.clone()),
            album: parsed.has_album().then(|| parsed.album.clone()),
            track_number: parsed.track_number,
            path: path_str,
            filename,
            folder,
            extension,
            ..Default::default()
        })
    }

    fn candidate_files(&self, root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| !is_hidden(path))
            .filter(|path| {
                fs::metadata(path)
                    .map(|m| m.len() > 0 && m.len() <= MAX_FILE_SIZE)
                    .unwrap_or(false)
            })
            .filter(|path| self.is_supported_file(path))
            .collect()
    }

    fn is_supported_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.supported_extensions.contains(&normalize_extension(ext)))
            .unwrap_or(false)
    }
}

impl Default for MusicScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Hex xxh64 of the path
pub fn path_id(path: &str) -> String {
    format!("{:016x}", xxh64(path.as_bytes(), 0))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}
