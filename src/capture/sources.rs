//! External capabilities the capture pipeline consumes
//!
//! The camera, the position fix and the wall clock are platform
//! services. The pipeline only sees these narrow traits, so hosts plug
//! in their real devices and tests plug in fakes.

use crate::config::{PositionRequest, StreamRequest};
use crate::error::{CameraUnavailable, LocationError};
use crate::state::data::Location;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, Utc};
use image::DynamicImage;

/// A live video stream that can hand out its current frame
pub trait CameraSource: Send + Sync {
    /// Start the stream with the requested constraints
    fn open(&mut self, request: &StreamRequest) -> Result<(), CameraUnavailable>;

    /// The frame currently on screen (full stream resolution)
    fn grab_frame(&self) -> Result<DynamicImage, CameraUnavailable>;
}

/// A single position fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub location: Location,
    /// Horizontal accuracy radius in meters, when the device reports one
    pub accuracy_m: Option<f64>,
    /// When the fix was taken
    pub taken_at: DateTime<Utc>,
}

/// Single-shot geolocation
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Resolve one position fix. The caller enforces `request.timeout_ms`
    /// and `request.maximum_age_ms` itself, sources may also honor them.
    ///
    /// `requested_at` is the request instant on the caller's `Clock`.
    /// `PositionFix::taken_at` must be on that same time base, so a
    /// source with its own device clock reports the fix relative to it.
    async fn current_position(
        &self,
        request: &PositionRequest,
        requested_at: DateTime<Utc>,
    ) -> Result<PositionFix, LocationError>;
}

/// Wall clock with the local UTC offset
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// The system clock in the machine's local time zone
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock stopped at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// A camera that always shows the same still frame.
///
/// Useful for replaying a scene or driving the pipeline without
/// hardware. Until `open` is called it behaves like a stream that
/// never started.
#[derive(Debug, Clone)]
pub struct StillCamera {
    frame: DynamicImage,
    opened: Option<StreamRequest>,
}

impl StillCamera {
    pub fn new(frame: DynamicImage) -> Self {
        Self {
            frame,
            opened: None,
        }
    }

    /// The constraints the stream was opened with
    pub fn stream(&self) -> Option<&StreamRequest> {
        self.opened.as_ref()
    }
}

impl CameraSource for StillCamera {
    fn open(&mut self, request: &StreamRequest) -> Result<(), CameraUnavailable> {
        self.opened = Some(*request);
        Ok(())
    }

    fn grab_frame(&self) -> Result<DynamicImage, CameraUnavailable> {
        if self.opened.is_none() {
            return Err(CameraUnavailable("stream not started".to_string()));
        }
        Ok(self.frame.clone())
    }
}

/// A location source that always reports the same coordinates,
/// stamped with the moment of the request
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Location);

#[async_trait]
impl LocationSource for FixedLocation {
    async fn current_position(
        &self,
        _request: &PositionRequest,
        requested_at: DateTime<Utc>,
    ) -> Result<PositionFix, LocationError> {
        Ok(PositionFix {
            location: self.0,
            accuracy_m: None,
            taken_at: requested_at,
        })
    }
}
