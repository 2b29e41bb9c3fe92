//! Error types for every fallible operation in the crate
//!
//! Each concern has its own enum so callers can match on exactly
//! what went wrong and pick the user-facing message themselves.

use crate::state::data::RollNumber;
use thiserror::Error;

/// Persistence read/write failure (quota, disk, database)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("could not serialize roll data: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The current roll has no frames left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("roll {roll} is full ({capacity} frames), start a new roll")]
pub struct RollFull {
    pub roll: RollNumber,
    pub capacity: usize,
}

/// The camera stream is missing, denied or not producing frames
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("camera unavailable: {0}")]
pub struct CameraUnavailable(pub String);

/// Why a position fix could not be used
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    Denied,

    #[error("no position fix within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("position fix predates the request")]
    Stale,

    #[error("position fix has invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Everything that can abort a capture
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    CameraUnavailable(#[from] CameraUnavailable),

    #[error(transparent)]
    LocationUnavailable(#[from] LocationError),

    #[error(transparent)]
    RollFull(#[from] RollFull),

    #[error("a capture is already in progress")]
    CaptureInProgress,

    #[error("could not encode frame as JPEG: {0}")]
    Encode(#[from] image::ImageError),
}

/// Export serialization or delivery failure
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not serialize export: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("could not write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("no export directory available")]
    NoDirectory,
}

/// Settings file problems
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
