/// Capture pipeline
///
/// This module handles:
/// - The camera, location and clock interfaces the pipeline consumes
/// - Encoding frames as JPEG data URIs and formatting timestamps
/// - The CaptureService that turns one shutter press into one entry

pub mod encode;
pub mod service;
pub mod sources;

pub use service::CaptureService;
pub use sources::{
    CameraSource, Clock, FixedClock, FixedLocation, LocationSource, PositionFix, StillCamera,
    SystemClock,
};
