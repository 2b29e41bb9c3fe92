//! Shared data structures for the roll state
//!
//! These structs represent the data model that flows between
//! the storage layer, the capture pipeline and the export file.
//! The JSON shape (`rolls`, `currentRoll`, `imageData`) is the
//! persisted and exported format, so field names are fixed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Roll identifier. Rolls are numbered 1, 2, 3, ... in creation order.
pub type RollNumber = u32;

/// The first roll of a fresh store
pub const FIRST_ROLL: RollNumber = 1;

/// A position fix in decimal degrees
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// True when both coordinates are finite and inside the WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// One captured frame: when, where, and the JPEG itself.
///
/// Entries are immutable once built; there are no setters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoEntry {
    /// Local time with explicit offset, e.g. `2024-01-01T12:00:00.000+02:00`
    timestamp: String,
    location: Location,
    /// `data:image/jpeg;base64,...`
    image_data: String,
}

impl PhotoEntry {
    pub fn new(timestamp: String, location: Location, image_data: String) -> Self {
        Self {
            timestamp,
            location,
            image_data,
        }
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn image_data(&self) -> &str {
        &self.image_data
    }

    /// The `±HH:MM` suffix of the timestamp, as shown next to each photo
    pub fn utc_offset(&self) -> &str {
        let len = self.timestamp.len();
        match self.timestamp.get(len.saturating_sub(6)..) {
            Some(suffix) => suffix,
            None => "",
        }
    }

    /// `lat, lon` with six decimals (roughly 10cm precision)
    pub fn coordinates_label(&self) -> String {
        format!(
            "{:.6}, {:.6}",
            self.location.latitude, self.location.longitude
        )
    }
}

/// Root aggregate: every roll plus the pointer to the one being shot.
///
/// Invariant: `current_roll` is always a key of `rolls`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoData {
    pub(crate) rolls: BTreeMap<RollNumber, Vec<PhotoEntry>>,
    pub(crate) current_roll: RollNumber,
}

impl Default for PhotoData {
    /// First run: roll 1, no frames
    fn default() -> Self {
        let mut rolls = BTreeMap::new();
        rolls.insert(FIRST_ROLL, Vec::new());
        Self {
            rolls,
            current_roll: FIRST_ROLL,
        }
    }
}

impl PhotoData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rolls(&self) -> &BTreeMap<RollNumber, Vec<PhotoEntry>> {
        &self.rolls
    }

    pub fn current_roll(&self) -> RollNumber {
        self.current_roll
    }

    pub fn roll(&self, number: RollNumber) -> Option<&[PhotoEntry]> {
        self.rolls.get(&number).map(Vec::as_slice)
    }

    /// Total frames across all rolls
    pub fn photo_count(&self) -> usize {
        self.rolls.values().map(Vec::len).sum()
    }

    /// Convert to JSON string for storage
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON string (from storage)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Bring a deserialized blob back in line with the invariants.
    ///
    /// Returns `None` when the blob cannot be trusted: roll 0 anywhere,
    /// or a roll numbered `RollNumber::MAX`, which leaves no room for
    /// another roll. A missing sequence for the current roll is created, and a
    /// pointer behind the newest roll is moved forward so `new_roll`
    /// can never overwrite existing frames.
    pub(crate) fn repaired(mut self) -> Option<Self> {
        if self.current_roll < FIRST_ROLL
            || self.current_roll == RollNumber::MAX
            || self.rolls.contains_key(&0)
            || self.rolls.contains_key(&RollNumber::MAX)
        {
            return None;
        }

        if let Some(&newest) = self.rolls.keys().next_back() {
            if newest > self.current_roll {
                tracing::warn!(
                    current = self.current_roll,
                    newest,
                    "stored roll pointer is behind the newest roll, moving it forward"
                );
                self.current_roll = newest;
            }
        }

        self.rolls.entry(self.current_roll).or_default();
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ts: &str, lat: f64, lon: f64) -> PhotoEntry {
        PhotoEntry::new(
            ts.to_string(),
            Location::new(lat, lon),
            "data:image/jpeg;base64,AAAA".to_string(),
        )
    }

    #[test]
    fn test_default_has_empty_first_roll() {
        let data = PhotoData::default();
        assert_eq!(data.current_roll(), 1);
        assert_eq!(data.roll(1), Some(&[][..]));
        assert_eq!(data.rolls().len(), 1);
    }

    #[test]
    fn test_json_shape_matches_storage_format() {
        let mut data = PhotoData::default();
        data.rolls
            .get_mut(&1)
            .unwrap()
            .push(entry("2024-01-01T00:00:00.000+00:00", 1.0, 2.0));

        let value: serde_json::Value = serde_json::from_str(&data.to_json().unwrap()).unwrap();
        assert_eq!(value["currentRoll"], 1);
        assert_eq!(value["rolls"]["1"][0]["location"]["latitude"], 1.0);
        assert_eq!(
            value["rolls"]["1"][0]["imageData"],
            "data:image/jpeg;base64,AAAA"
        );

        // rolls comes before currentRoll
        let json = data.to_json().unwrap();
        assert!(json.find("\"rolls\"").unwrap() < json.find("\"currentRoll\"").unwrap());
    }

    #[test]
    fn test_coordinates_keep_full_precision() {
        let mut data = PhotoData::default();
        data.rolls.get_mut(&1).unwrap().push(entry(
            "2024-01-01T00:00:00.000+00:00",
            48.858_370_123_456_78,
            -2.294_481_987_654_321,
        ));

        let restored = PhotoData::from_json(&data.to_json().unwrap()).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn test_many_rolls_round_trip() {
        let extremes = [
            (90.0, 180.0),
            (-90.0, -180.0),
            (0.0, -0.0),
            (5e-324, -5e-324),
            (89.999_999_999_999_99, -179.999_999_999_999_97),
            (0.1 + 0.2, 1.0 / 3.0),
        ];

        let mut rolls = BTreeMap::new();
        for number in 1..=12u32 {
            let frames = (0..number as usize % 4)
                .map(|i| {
                    let (lat, lon) = extremes[(number as usize + i) % extremes.len()];
                    entry(&format!("2024-02-{:02}T10:00:00.000-03:00", number), lat, lon)
                })
                .collect();
            rolls.insert(number, frames);
        }
        let data = PhotoData {
            rolls,
            current_roll: 12,
        };

        let json = data.to_json().unwrap();
        // Numeric order, not string order: "10" after "9"
        assert!(json.find("\"9\"").unwrap() < json.find("\"10\"").unwrap());

        let restored = PhotoData::from_json(&json).unwrap().repaired().unwrap();
        assert_eq!(restored, data);
        assert_eq!(restored.rolls().keys().copied().collect::<Vec<_>>(), (1..=12).collect::<Vec<_>>());
        for (a, b) in restored.rolls().values().flatten().zip(data.rolls().values().flatten()) {
            assert_eq!(a.location().latitude.to_bits(), b.location().latitude.to_bits());
            assert_eq!(a.location().longitude.to_bits(), b.location().longitude.to_bits());
        }
    }

    #[test]
    fn test_repair_creates_missing_current_roll() {
        let data = PhotoData::from_json(r#"{"rolls":{},"currentRoll":1}"#)
            .unwrap()
            .repaired()
            .unwrap();
        assert_eq!(data, PhotoData::default());
    }

    #[test]
    fn test_repair_rejects_roll_zero() {
        let data = PhotoData::from_json(r#"{"rolls":{"0":[]},"currentRoll":0}"#).unwrap();
        assert!(data.repaired().is_none());
    }

    #[test]
    fn test_repair_rejects_last_roll_number() {
        let data = PhotoData::from_json(r#"{"rolls":{"4294967295":[]},"currentRoll":4294967295}"#)
            .unwrap();
        assert!(data.repaired().is_none());

        // Pointer below, but a stored roll already at the ceiling
        let data = PhotoData::from_json(r#"{"rolls":{"1":[],"4294967295":[]},"currentRoll":1}"#)
            .unwrap();
        assert!(data.repaired().is_none());

        let data = PhotoData::from_json(r#"{"rolls":{"4294967294":[]},"currentRoll":4294967294}"#)
            .unwrap()
            .repaired()
            .unwrap();
        assert_eq!(data.current_roll(), RollNumber::MAX - 1);
    }

    #[test]
    fn test_repair_moves_pointer_to_newest_roll() {
        let data = PhotoData::from_json(r#"{"rolls":{"1":[],"2":[],"3":[]},"currentRoll":2}"#)
            .unwrap()
            .repaired()
            .unwrap();
        assert_eq!(data.current_roll(), 3);
    }

    #[test]
    fn test_display_helpers() {
        let e = entry("2024-06-01T09:30:00.250-04:30", 40.7128, -74.006);
        assert_eq!(e.utc_offset(), "-04:30");
        assert_eq!(e.coordinates_label(), "40.712800, -74.006000");
    }

    #[test]
    fn test_location_validation() {
        assert!(Location::new(90.0, -180.0).is_valid());
        assert!(!Location::new(90.1, 0.0).is_valid());
        assert!(!Location::new(0.0, f64::NAN).is_valid());
    }
}
