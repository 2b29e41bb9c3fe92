//! Camera settings
//!
//! All tunables of the capture pipeline live here. Settings are stored
//! as JSON next to the other per-user files and every field falls back
//! to its default, so a partial (or missing) file is fine.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Frames on a standard 35mm roll
pub const FRAMES_PER_ROLL: usize = 36;

/// Whether a roll stops accepting frames once it holds `max_frames`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "policy", rename_all = "camelCase")]
pub enum CapacityPolicy {
    /// Appends beyond `max_frames` are rejected with `RollFull`
    Enforced {
        #[serde(rename = "maxFrames")]
        max_frames: usize,
    },
    /// Rolls grow without bound
    Unbounded,
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        CapacityPolicy::Enforced {
            max_frames: FRAMES_PER_ROLL,
        }
    }
}

impl CapacityPolicy {
    /// The frame limit, if any
    pub fn max_frames(&self) -> Option<usize> {
        match self {
            CapacityPolicy::Enforced { max_frames } => Some(*max_frames),
            CapacityPolicy::Unbounded => None,
        }
    }

    /// True when a roll holding `len` frames cannot take another
    pub fn is_full(&self, len: usize) -> bool {
        self.max_frames().is_some_and(|max| len >= max)
    }
}

/// Single-shot position fix options
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PositionRequest {
    pub high_accuracy: bool,
    pub timeout_ms: u64,
    /// Oldest acceptable cached fix; 0 means a cached fix is never used
    pub maximum_age_ms: u64,
}

impl Default for PositionRequest {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout_ms: 5000,
            maximum_age_ms: 0,
        }
    }
}

/// Which way the camera should face
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Facing {
    /// Rear camera
    #[default]
    Environment,
    /// Selfie camera
    User,
}

/// Video stream constraints handed to the camera when it is opened
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamRequest {
    pub facing: Facing,
    /// Width / height, 1.5 is the 3:2 frame of 35mm film
    pub aspect_ratio: f64,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            facing: Facing::Environment,
            aspect_ratio: 1.5,
        }
    }
}

/// Everything configurable about the camera
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraSettings {
    pub capacity: CapacityPolicy,
    /// JPEG quality in (0, 1]
    pub jpeg_quality: f32,
    pub location: PositionRequest,
    pub stream: StreamRequest,
    /// Key of the single persisted blob
    pub storage_key: String,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            capacity: CapacityPolicy::default(),
            jpeg_quality: 0.7,
            location: PositionRequest::default(),
            stream: StreamRequest::default(),
            storage_key: "photoData".to_string(),
        }
    }
}

impl CameraSettings {
    /// Load settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let json = fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&json)?;
        settings.validate()?;

        tracing::info!(path = %path.display(), "⚙️ loaded camera settings");
        Ok(settings)
    }

    /// Write settings as pretty JSON, creating the parent directory
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity.max_frames() == Some(0) {
            return Err(ConfigError::Invalid {
                field: "capacity",
                reason: "a roll must hold at least one frame".to_string(),
            });
        }
        if !(self.jpeg_quality > 0.0 && self.jpeg_quality <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "jpegQuality",
                reason: format!("{} is outside (0, 1]", self.jpeg_quality),
            });
        }
        if self.location.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "location.timeoutMs",
                reason: "timeout must be positive".to_string(),
            });
        }
        if !(self.stream.aspect_ratio.is_finite() && self.stream.aspect_ratio > 0.0) {
            return Err(ConfigError::Invalid {
                field: "stream.aspectRatio",
                reason: format!("{} is not a positive ratio", self.stream.aspect_ratio),
            });
        }
        if self.storage_key.is_empty() {
            return Err(ConfigError::Invalid {
                field: "storageKey",
                reason: "key must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// JPEG quality on the encoder's 1-100 scale
    pub fn encoder_quality(&self) -> u8 {
        (self.jpeg_quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// Where settings live by default:
/// - Linux: ~/.config/film-roll/settings.json
/// - macOS: ~/Library/Application Support/film-roll/settings.json
/// - Windows: %APPDATA%\film-roll\settings.json
pub fn default_settings_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
    path.push("film-roll");
    path.push("settings.json");
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CameraSettings::default();
        assert_eq!(settings.capacity.max_frames(), Some(36));
        assert_eq!(settings.encoder_quality(), 70);
        assert_eq!(settings.location.timeout_ms, 5000);
        assert_eq!(settings.location.maximum_age_ms, 0);
        assert!(settings.location.high_accuracy);
        assert_eq!(settings.stream.facing, Facing::Environment);
        assert_eq!(settings.stream.aspect_ratio, 1.5);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: CameraSettings =
            serde_json::from_str(r#"{"capacity":{"policy":"unbounded"}}"#).unwrap();
        assert_eq!(settings.capacity, CapacityPolicy::Unbounded);
        assert_eq!(settings.storage_key, "photoData");
        assert_eq!(settings.jpeg_quality, 0.7);
    }

    #[test]
    fn test_enforced_policy_json() {
        let settings: CameraSettings =
            serde_json::from_str(r#"{"capacity":{"policy":"enforced","maxFrames":24}}"#).unwrap();
        assert_eq!(settings.capacity, CapacityPolicy::Enforced { max_frames: 24 });
        assert!(settings.capacity.is_full(24));
        assert!(!settings.capacity.is_full(23));
        assert!(!CapacityPolicy::Unbounded.is_full(10_000));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = CameraSettings::default();
        settings.jpeg_quality = 1.5;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { field: "jpegQuality", .. })
        ));

        let mut settings = CameraSettings::default();
        settings.capacity = CapacityPolicy::Enforced { max_frames: 0 };
        assert!(settings.validate().is_err());

        let mut settings = CameraSettings::default();
        settings.location.timeout_ms = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = CameraSettings::default();
        settings.capacity = CapacityPolicy::Unbounded;
        settings.jpeg_quality = 0.9;
        settings.save(&path).unwrap();

        let loaded = CameraSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_default_settings_path() {
        if let Some(path) = default_settings_path() {
            assert!(path.ends_with("film-roll/settings.json"));
        }
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = CameraSettings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, CameraSettings::default());
    }
}
