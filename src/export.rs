//! JSON export of every roll
//!
//! An export is a standalone, pretty-printed copy of the whole data
//! model (all rolls, not just the current one). Producing it has no
//! effect on the store; delivering it is up to an `ArtifactSink`.

use crate::capture::sources::Clock;
use crate::error::ExportError;
use crate::state::data::PhotoData;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};

pub const EXPORT_MIME_TYPE: &str = "application/json";

/// A ready-to-save export file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// `film-photos-export-YYYY-MM-DD.json`
pub fn export_filename(date: NaiveDate) -> String {
    format!("film-photos-export-{}.json", date.format("%Y-%m-%d"))
}

/// Serialize `data` as indented JSON, named after the UTC calendar date
/// of `exported_at`
pub fn export<Tz: TimeZone>(
    data: &PhotoData,
    exported_at: &DateTime<Tz>,
) -> Result<ExportArtifact, ExportError> {
    let date = exported_at.with_timezone(&Utc).date_naive();
    let bytes = serde_json::to_vec_pretty(data)?;

    Ok(ExportArtifact {
        filename: export_filename(date),
        mime_type: EXPORT_MIME_TYPE,
        bytes,
    })
}

/// Somewhere an export can be handed off to (a download folder, a share
/// sheet, an upload)
pub trait ArtifactSink {
    fn deliver(&mut self, artifact: &ExportArtifact) -> Result<(), ExportError>;
}

/// Writes exports as files into one directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The user's download directory (falls back to the home directory)
    pub fn downloads() -> Result<Self, ExportError> {
        dirs::download_dir()
            .or_else(dirs::home_dir)
            .map(Self::new)
            .ok_or(ExportError::NoDirectory)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where `artifact` ends up
    pub fn path_for(&self, artifact: &ExportArtifact) -> PathBuf {
        self.dir.join(&artifact.filename)
    }
}

impl ArtifactSink for DirectorySink {
    fn deliver(&mut self, artifact: &ExportArtifact) -> Result<(), ExportError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(artifact);
        fs::write(&path, &artifact.bytes)?;

        tracing::info!(
            path = %path.display(),
            bytes = artifact.bytes.len(),
            "💾 export written"
        );
        Ok(())
    }
}

/// Export with a clock, so the filename date comes from the same time
/// source as capture timestamps
pub struct ExportService {
    clock: Box<dyn Clock>,
}

impl ExportService {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Build the artifact for `data` as of now
    pub fn export(&self, data: &PhotoData) -> Result<ExportArtifact, ExportError> {
        let artifact = export(data, &self.clock.now())?;
        tracing::debug!(
            filename = %artifact.filename,
            rolls = data.rolls().len(),
            photos = data.photo_count(),
            "export built"
        );
        Ok(artifact)
    }

    /// Build the artifact and hand it to `sink`
    pub fn export_to(
        &self,
        data: &PhotoData,
        sink: &mut dyn ArtifactSink,
    ) -> Result<ExportArtifact, ExportError> {
        let artifact = self.export(data)?;
        sink.deliver(&artifact)?;
        Ok(artifact)
    }
}

impl std::fmt::Debug for ExportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::sources::FixedClock;
    use crate::config::CameraSettings;
    use crate::state::data::{Location, PhotoEntry};
    use crate::state::rolls::RollStore;
    use crate::state::storage::MemoryStore;

    fn two_roll_store() -> RollStore {
        let mut store = RollStore::load(Box::new(MemoryStore::new()), &CameraSettings::default());
        store
            .append(PhotoEntry::new(
                "2024-01-01T10:00:00.000+01:00".to_string(),
                Location::new(52.520008, 13.404954),
                "data:image/jpeg;base64,AAAA".to_string(),
            ))
            .unwrap();
        store.new_roll();
        store
            .append(PhotoEntry::new(
                "2024-01-02T10:00:00.000+01:00".to_string(),
                Location::new(-33.865143, 151.2099),
                "data:image/jpeg;base64,BBBB".to_string(),
            ))
            .unwrap();
        store
    }

    #[test]
    fn test_export_round_trips_all_rolls() {
        let store = two_roll_store();
        let at = DateTime::parse_from_rfc3339("2024-05-06T12:00:00Z").unwrap();

        let artifact = export(store.data(), &at).unwrap();
        assert_eq!(artifact.filename, "film-photos-export-2024-05-06.json");
        assert_eq!(artifact.mime_type, "application/json");

        let parsed: PhotoData = serde_json::from_slice(&artifact.bytes).unwrap();
        assert_eq!(&parsed, store.data());
        assert_eq!(parsed.rolls().len(), 2);
    }

    #[test]
    fn test_export_is_indented_with_stable_key_order() {
        let store = two_roll_store();
        let artifact = export(store.data(), &Utc::now()).unwrap();
        let text = String::from_utf8(artifact.bytes).unwrap();

        assert!(text.starts_with("{\n  \"rolls\": {\n    \"1\": ["));
        assert!(text.find("\"rolls\"").unwrap() < text.find("\"currentRoll\"").unwrap());
        assert!(text.trim_end().ends_with("\"currentRoll\": 2\n}"));
    }

    #[test]
    fn test_filename_uses_utc_date() {
        // Still the 5th locally, already the 6th in UTC
        let at = DateTime::parse_from_rfc3339("2024-05-05T23:30:00-02:00").unwrap();
        let artifact = export(&PhotoData::default(), &at).unwrap();
        assert_eq!(artifact.filename, "film-photos-export-2024-05-06.json");
    }

    #[test]
    fn test_service_writes_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = two_roll_store();
        let clock = FixedClock(DateTime::parse_from_rfc3339("2024-07-08T09:00:00+00:00").unwrap());
        let service = ExportService::new(Box::new(clock));
        let mut sink = DirectorySink::new(dir.path().join("exports"));

        let artifact = service.export_to(store.data(), &mut sink).unwrap();

        let written = std::fs::read(sink.path_for(&artifact)).unwrap();
        assert_eq!(written, artifact.bytes);
        assert!(sink
            .path_for(&artifact)
            .ends_with("film-photos-export-2024-07-08.json"));
    }

    #[test]
    fn test_export_leaves_store_untouched() {
        let store = two_roll_store();
        let before = store.data().clone();
        let _ = export(store.data(), &Utc::now()).unwrap();
        assert_eq!(store.data(), &before);
    }
}
