// Error type for everything that crosses an I/O boundary.
// Queue and store operations never fail - they clamp, return false or do nothing.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "sqlite")]
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("audio transport error: {0}")]
    Transport(String),

    #[error("playlist not found: {0}")]
    PlaylistNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
