use super::encode::{encode_jpeg, format_timestamp, jpeg_data_uri};
use super::sources::{CameraSource, Clock, LocationSource, PositionFix};
use crate::config::CameraSettings;
use crate::error::{CameraUnavailable, CaptureError, LocationError, RollFull};
use crate::state::data::PhotoEntry;
use crate::state::rolls::RollStore;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Runs one capture at a time: position fix, frame, entry, append.
///
/// The location request is the only suspension point and is bounded by
/// `settings.location.timeout_ms`, so `capture` needs a Tokio runtime
/// with the time driver enabled. Nothing is retried; every failure is
/// returned once and the caller decides whether to ask again.
pub struct CaptureService {
    camera: Box<dyn CameraSource>,
    location: Box<dyn LocationSource>,
    clock: Box<dyn Clock>,
    settings: CameraSettings,
    in_flight: AtomicBool,
}

impl CaptureService {
    pub fn new(
        camera: Box<dyn CameraSource>,
        location: Box<dyn LocationSource>,
        clock: Box<dyn Clock>,
        settings: CameraSettings,
    ) -> Self {
        Self {
            camera,
            location,
            clock,
            settings,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    /// Open the camera stream with the configured constraints
    /// (rear camera, 3:2 by default)
    pub fn start_camera(&mut self) -> Result<(), CameraUnavailable> {
        match self.camera.open(&self.settings.stream) {
            Ok(()) => {
                tracing::info!(
                    facing = ?self.settings.stream.facing,
                    aspect_ratio = self.settings.stream.aspect_ratio,
                    "📷 camera stream started"
                );
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not start camera");
                Err(err)
            }
        }
    }

    /// True while a capture is waiting on its position fix
    pub fn is_capturing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Take one photo and append it to the current roll.
    ///
    /// On success the new entry is returned so the caller can refresh
    /// its display. On any error nothing has been appended.
    pub async fn capture(&self, store: &mut RollStore) -> Result<PhotoEntry, CaptureError> {
        let _guard = InFlight::acquire(&self.in_flight).ok_or_else(|| {
            tracing::debug!("capture rejected, another one is in flight");
            CaptureError::CaptureInProgress
        })?;

        // No point waiting for a fix if the frame cannot be stored
        if store.is_current_roll_full() {
            let roll = store.current_roll();
            let capacity = store.capacity().max_frames().unwrap_or_default();
            tracing::info!(roll, capacity, "roll is full, capture skipped");
            return Err(RollFull { roll, capacity }.into());
        }

        // Step 1: Fresh position fix
        let fix = self.request_fix().await?;

        // Step 2: Grab and encode the current frame
        let frame = self.camera.grab_frame()?;
        if frame.width() == 0 || frame.height() == 0 {
            return Err(CameraUnavailable("stream produced an empty frame".to_string()).into());
        }
        let jpeg = encode_jpeg(&frame, self.settings.encoder_quality())?;

        // Step 3: Tag it and hand it to the store
        let timestamp = format_timestamp(&self.clock.now());
        let entry = PhotoEntry::new(timestamp, fix.location, jpeg_data_uri(&jpeg));
        store.append(entry.clone())?;

        tracing::info!(
            roll = store.current_roll(),
            frame = store.current_roll_len(),
            latitude = fix.location.latitude,
            longitude = fix.location.longitude,
            accuracy_m = fix.accuracy_m,
            bytes = jpeg.len(),
            "📸 photo captured"
        );
        Ok(entry)
    }

    /// Single-shot fix with the configured timeout and no cache tolerance
    async fn request_fix(&self) -> Result<PositionFix, LocationError> {
        let request = self.settings.location;
        let requested_at = self.clock.now().with_timezone(&Utc);

        let fix = match tokio::time::timeout(
            Duration::from_millis(request.timeout_ms),
            self.location.current_position(&request, requested_at),
        )
        .await
        {
            Ok(Ok(fix)) => fix,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "position fix failed");
                return Err(err);
            }
            Err(_) => {
                tracing::warn!(timeout_ms = request.timeout_ms, "position fix timed out");
                return Err(LocationError::Timeout {
                    timeout_ms: request.timeout_ms,
                });
            }
        };

        let oldest_accepted = i64::try_from(request.maximum_age_ms)
            .ok()
            .and_then(chrono::Duration::try_milliseconds)
            .and_then(|max_age| requested_at.checked_sub_signed(max_age))
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        if fix.taken_at < oldest_accepted {
            tracing::warn!(taken_at = %fix.taken_at, "position fix is cached, rejecting");
            return Err(LocationError::Stale);
        }

        if !fix.location.is_valid() {
            return Err(LocationError::InvalidCoordinates {
                latitude: fix.location.latitude,
                longitude: fix.location.longitude,
            });
        }

        Ok(fix)
    }
}

impl std::fmt::Debug for CaptureService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureService")
            .field("settings", &self.settings)
            .field("in_flight", &self.is_capturing())
            .finish()
    }
}

/// Marks a capture as running until dropped, including when the
/// capture future itself is dropped mid-await
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
