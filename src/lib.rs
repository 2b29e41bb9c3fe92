//! Roll-based film camera core
//!
//! Photos are taken one at a time, tagged with a fresh position fix and
//! a local timestamp, and appended to the current roll. Rolls hold 36
//! frames by default, every change is written back to a key-value store
//! as one JSON blob, and the whole collection can be exported as a
//! single JSON file.
//!
//! The camera, geolocation, clock, storage and export destination are
//! injected through small traits (`CameraSource`, `LocationSource`,
//! `Clock`, `KeyValueStore`, `ArtifactSink`).

pub mod capture;
pub mod config;
pub mod error;
pub mod export;
pub mod state;

pub use capture::{CameraSource, CaptureService, Clock, LocationSource, PositionFix, SystemClock};
pub use config::{CameraSettings, CapacityPolicy, PositionRequest, StreamRequest};
pub use error::{CaptureError, LocationError, RollFull, StorageError};
pub use export::{ArtifactSink, DirectorySink, ExportArtifact, ExportService};
pub use state::{KeyValueStore, Location, PhotoData, PhotoEntry, RollNumber, RollStore};
