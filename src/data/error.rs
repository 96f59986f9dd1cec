use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// DataError – every failure the ingestion pipeline can report
// ---------------------------------------------------------------------------

/// Errors produced by discovery, weight extraction and external-value loading.
///
/// Each variant carries enough context (path or folder name) for the UI to
/// show a self-explanatory message.
#[derive(Error, Debug)]
pub enum DataError {
    /// Base folder, day folders or details file could not be found.
    #[error("{0}")]
    NotFound(String),

    /// A per-day values file is absent from its day folder.
    #[error("Missing values file '{filename}' in folder: {folder}")]
    MissingFile { filename: String, folder: String },

    /// File extension is not one of the recognised encodings.
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// Content did not decode to a numeric / array-like shape.
    #[error("{0}")]
    Parse(String),

    /// Count or argument mismatch.
    #[error("{0}")]
    Validation(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DataError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        DataError::Parse(msg.into())
    }
}

/// Result type for the data layer.
pub type Result<T> = std::result::Result<T, DataError>;
