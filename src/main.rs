// Tunewell - local music library core
// Scans folders, infers metadata from file names, keeps plays/favorites/moods
// and playlists between runs. Audio output is somebody else's job.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use tunewell::audio::quality::{format_bit_depth, format_duration, format_sample_rate};
use tunewell::audio::{
    extension_of, get_quality_label, AudioTransport, MetadataParser, MusicScanner, QueueItem,
    ScanProgress, DEFAULT_BIT_DEPTH, DEFAULT_SAMPLE_RATE,
};
use tunewell::{Config, Session};

#[derive(Parser)]
#[command(name = "tunewell")]
#[command(about = "Music library core: scanning, metadata inference, listening history")]
struct Args {
    /// Enable developer logging (stderr + file)
    #[arg(long, global = true)]
    dev: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan music folders into the library (configured folders when none given)
    Scan { dirs: Vec<PathBuf> },
    /// Show what would be inferred from a file name
    Inspect {
        file: String,
        /// Full path, for the Artist/Album folder fallback
        #[arg(long)]
        path: Option<String>,
    },
    /// Print the quality badge for a format
    Quality {
        format: String,
        sample_rate: u32,
        bit_depth: u16,
    },
    /// Library and listening statistics
    Stats,
}

/// Stand-in transport for the command line, which never plays anything
struct SilentTransport;

impl AudioTransport for SilentTransport {
    async fn play_queue(&mut self, items: &[QueueItem], start_index: usize) -> tunewell::Result<()> {
        debug!("play_queue: {} items from {}", items.len(), start_index);
        Ok(())
    }

    async fn skip_to_index(&mut self, index: usize) -> tunewell::Result<()> {
        debug!("skip_to_index: {}", index);
        Ok(())
    }

    async fn pause(&mut self) -> tunewell::Result<()> {
        Ok(())
    }

    async fn resume(&mut self) -> tunewell::Result<()> {
        Ok(())
    }

    async fn seek_to(&mut self, _seconds: f64) -> tunewell::Result<()> {
        Ok(())
    }

    async fn stop(&mut self) -> tunewell::Result<()> {
        Ok(())
    }
}

fn init_logging(log_dir: &Path, default_filter: &str, dev: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    // Daily rotating file appender
    let file_appender = tracing_appender::rolling::daily(log_dir, "tunewell.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let base_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(base_filter);

    if dev {
        // Same events on stderr as in the file
        let subscriber = builder.with_writer(file_writer.and(std::io::stderr)).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = builder.with_writer(file_writer).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(guard)
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn open_session(config: &Config) -> Result<Session<SilentTransport>> {
    let store = config.open_store()?;
    Ok(Session::open(SilentTransport, store, &config.playback))
}

async fn run_scan(config: &Config, dirs: Vec<PathBuf>) -> Result<()> {
    let dirs = if dirs.is_empty() { config.music_directories.clone() } else { dirs };
    let mut session = open_session(config)?;

    let (progress_tx, mut progress_rx) = mpsc::channel(64);
    let reporter = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            match progress {
                ScanProgress::DirectoryStarted { path } => println!("Scanning {}", path.display()),
                ScanProgress::DirectoryCompleted { path, tracks_found } => {
                    println!("  {} tracks in {}", tracks_found, path.display())
                }
                ScanProgress::Error { path, error } => eprintln!("  skipped {}: {}", path.display(), error),
                _ => {}
            }
        }
    });

    let scanned = MusicScanner::new().scan_directories_incremental(&dirs, progress_tx).await;
    reporter.await?;

    let added = session.import_scanned(&scanned);
    let flushed = session.flush();
    info!("Scan finished: {} found, {} new", scanned.len(), added);

    let library = session.library();
    let lossless = library.tracks().iter().filter(|t| t.is_lossless()).count();
    let hi_res = library.tracks().iter().filter(|t| t.is_high_res()).count();
    println!(
        "Found {} tracks, {} new. Library: {} tracks ({} lossless, {} hi-res)",
        scanned.len(),
        added,
        library.len(),
        lossless,
        hi_res
    );
    if !flushed {
        eprintln!("Warning: library could not be saved, see the log for details");
    }
    Ok(())
}

fn run_inspect(file: &str, path: Option<&str>) {
    let parsed = MetadataParser::new().parse(file, path);
    let extension = extension_of(file).unwrap_or_default();

    println!("Pattern:  {}", parsed.pattern_used);
    println!("Title:    {}", parsed.title);
    println!("Artist:   {}", parsed.artist);
    println!("Album:    {}", parsed.album);
    match parsed.track_number {
        Some(number) => println!("Track:    {}", number),
        None => println!("Track:    -"),
    }
    println!(
        "Quality:  {} (assuming {} / {})",
        get_quality_label(extension, DEFAULT_SAMPLE_RATE, DEFAULT_BIT_DEPTH),
        format_sample_rate(DEFAULT_SAMPLE_RATE),
        format_bit_depth(DEFAULT_BIT_DEPTH)
    );
}

fn run_stats(config: &Config) -> Result<()> {
    let session = open_session(config)?;
    let library = session.library();

    let total_seconds: f64 = library.tracks().iter().map(|t| t.duration).sum();
    println!("Tracks:          {}", library.len());
    println!("Known playtime:  {}", format_duration(total_seconds));
    println!("Playlists:       {}", session.playlists().list_playlists().len());
    println!("Favorites:       {}", session.favorites().len());
    println!("Recently played: {}", session.recently_played().len());

    let most_played = session.most_played();
    if !most_played.is_empty() {
        println!("\nMost played:");
        for (rank, track) in most_played.iter().take(10).enumerate() {
            println!(
                "{:>3}. {} ({} plays)",
                rank + 1,
                track.display_line(),
                session.behavior().play_count(&track.id)
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Pure lookups need neither config nor logging
    match &args.command {
        Command::Inspect { file, path } => {
            run_inspect(file, path.as_deref());
            return Ok(());
        }
        Command::Quality {
            format,
            sample_rate,
            bit_depth,
        } => {
            println!("{}", get_quality_label(format, *sample_rate, *bit_depth));
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(args.config.as_deref())?;
    let _guard = init_logging(&config.logging.directory, &config.logging.filter, args.dev)?;
    info!("Tunewell starting (dev: {})", args.dev);

    match args.command {
        Command::Scan { dirs } => run_scan(&config, dirs).await?,
        Command::Stats => run_stats(&config)?,
        Command::Inspect { .. } | Command::Quality { .. } => {}
    }

    Ok(())
}
