//! Frame and timestamp encoding for photo entries

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, FixedOffset};
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageResult};

const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// `YYYY-MM-DDTHH:mm:ss.sss±HH:MM`, local wall time plus its offset
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// Encode a frame as baseline JPEG at `quality` (1-100).
///
/// The frame keeps its full resolution; alpha is dropped.
pub fn encode_jpeg(frame: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
    let rgb = frame.to_rgb8();
    let mut jpeg = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
        encoder.encode_image(&rgb)?;
    }
    Ok(jpeg)
}

/// Wrap JPEG bytes in a `data:` URI
pub fn jpeg_data_uri(jpeg: &[u8]) -> String {
    format!("{}{}", JPEG_DATA_URI_PREFIX, STANDARD.encode(jpeg))
}

/// Get the JPEG bytes back out of a `data:` URI
pub fn decode_jpeg_data_uri(uri: &str) -> Option<Vec<u8>> {
    let payload = uri.strip_prefix(JPEG_DATA_URI_PREFIX)?;
    STANDARD.decode(payload).ok()
}

/// Format an instant as the entry timestamp. Offsets east of UTC are
/// positive, e.g. `2024-01-01T12:00:00.000+02:00`.
pub fn format_timestamp(instant: &DateTime<FixedOffset>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}
