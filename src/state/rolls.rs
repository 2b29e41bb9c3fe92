use super::data::{PhotoData, PhotoEntry, RollNumber};
use super::storage::KeyValueStore;
use crate::config::{CameraSettings, CapacityPolicy};
use crate::error::{RollFull, StorageError};

/// Read the persisted blob under `key`.
///
/// Never fails: a missing, unreadable or corrupt blob is the same as a
/// first run and yields a fresh `PhotoData`.
pub fn read_photo_data(storage: &dyn KeyValueStore, key: &str) -> PhotoData {
    let json = match storage.get(key) {
        Ok(Some(json)) => json,
        Ok(None) => {
            tracing::debug!(key, "no stored roll data, starting fresh");
            return PhotoData::default();
        }
        Err(err) => {
            tracing::warn!(key, error = %err, "could not read roll data, starting fresh");
            return PhotoData::default();
        }
    };

    match PhotoData::from_json(&json).ok().and_then(PhotoData::repaired) {
        Some(data) => {
            tracing::info!(
                rolls = data.rolls().len(),
                photos = data.photo_count(),
                current = data.current_roll(),
                "📷 loaded roll data"
            );
            data
        }
        None => {
            tracing::warn!(key, "stored roll data is corrupt, starting fresh");
            PhotoData::default()
        }
    }
}

/// The RollStore is the sole owner of the roll data.
///
/// Every mutation goes through it and is written back to storage
/// immediately as one whole blob. A failed write keeps the in-memory
/// state, marks the store dirty and is retried on the next mutation
/// or on `flush`.
pub struct RollStore {
    data: PhotoData,
    storage: Box<dyn KeyValueStore + Send>,
    key: String,
    capacity: CapacityPolicy,
    dirty: bool,
    last_save_error: Option<StorageError>,
}

impl RollStore {
    /// Load the roll data from `storage` using the key and capacity
    /// policy from `settings`
    pub fn load(storage: Box<dyn KeyValueStore + Send>, settings: &CameraSettings) -> Self {
        let data = read_photo_data(&*storage, &settings.storage_key);
        RollStore {
            data,
            storage,
            key: settings.storage_key.clone(),
            capacity: settings.capacity,
            dirty: false,
            last_save_error: None,
        }
    }

    /// Read-only view of everything (for export)
    pub fn data(&self) -> &PhotoData {
        &self.data
    }

    pub fn current_roll(&self) -> RollNumber {
        self.data.current_roll
    }

    pub fn capacity(&self) -> CapacityPolicy {
        self.capacity
    }

    /// Frames on the current roll
    pub fn current_roll_len(&self) -> usize {
        self.data
            .rolls
            .get(&self.data.current_roll)
            .map_or(0, Vec::len)
    }

    /// Frames left on the current roll, `None` when rolls are unbounded
    pub fn remaining_frames(&self) -> Option<usize> {
        self.capacity
            .max_frames()
            .map(|max| max.saturating_sub(self.current_roll_len()))
    }

    pub fn is_current_roll_full(&self) -> bool {
        self.capacity.is_full(self.current_roll_len())
    }

    /// Copy of the current roll for display or export
    pub fn current_roll_snapshot(&self) -> (RollNumber, Vec<PhotoEntry>) {
        let roll = self.data.current_roll;
        let entries = self.data.rolls.get(&roll).cloned().unwrap_or_default();
        (roll, entries)
    }

    /// Append a frame to the current roll.
    ///
    /// Fails with `RollFull` (leaving the roll untouched) once the
    /// capacity policy is reached.
    pub fn append(&mut self, entry: PhotoEntry) -> Result<(), RollFull> {
        let roll = self.data.current_roll;
        if let Some(capacity) = self.capacity.max_frames() {
            if self.current_roll_len() >= capacity {
                tracing::debug!(roll, capacity, "append rejected, roll is full");
                return Err(RollFull { roll, capacity });
            }
        }

        let frames = self.data.rolls.entry(roll).or_default();
        frames.push(entry);
        tracing::debug!(roll, frame = frames.len(), "frame appended");

        self.persist();
        Ok(())
    }

    /// Start the next roll and make it current. Returns its number.
    ///
    /// Once the last roll number is reached the current roll stays
    /// current and nothing is overwritten.
    pub fn new_roll(&mut self) -> RollNumber {
        let Some(next) = self.data.current_roll.checked_add(1) else {
            tracing::warn!(roll = self.data.current_roll, "no roll numbers left, keeping current roll");
            return self.data.current_roll;
        };
        self.data.current_roll = next;
        self.data.rolls.insert(next, Vec::new());
        tracing::info!(roll = next, "🎞️ new roll loaded");

        self.persist();
        next
    }

    /// Drop every roll and frame and clear the stored blob.
    ///
    /// Irreversible; the caller must have asked for confirmation.
    pub fn reset_all(&mut self) {
        self.data = PhotoData::default();
        tracing::warn!(key = %self.key, "all roll data deleted");

        match self.storage.remove(&self.key) {
            Ok(()) => {
                self.dirty = false;
                self.last_save_error = None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not clear stored roll data, will retry");
                self.dirty = true;
                self.last_save_error = Some(err);
            }
        }
    }

    /// True when the last write failed and storage is behind memory
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_save_error(&self) -> Option<&StorageError> {
        self.last_save_error.as_ref()
    }

    /// Retry writing the full state if an earlier save failed
    pub fn flush(&mut self) -> Result<(), StorageError> {
        if !self.dirty {
            return Ok(());
        }
        self.save()?;
        self.dirty = false;
        self.last_save_error = None;
        Ok(())
    }

    fn save(&mut self) -> Result<(), StorageError> {
        let json = self.data.to_json()?;
        self.storage.set(&self.key, &json)
    }

    fn persist(&mut self) {
        match self.save() {
            Ok(()) => {
                if self.dirty {
                    tracing::info!("pending roll data saved");
                }
                self.dirty = false;
                self.last_save_error = None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "⚠️ could not save roll data, keeping it in memory");
                self.dirty = true;
                self.last_save_error = Some(err);
            }
        }
    }
}

impl std::fmt::Debug for RollStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollStore")
            .field("key", &self.key)
            .field("current_roll", &self.data.current_roll)
            .field("current_roll_len", &self.current_roll_len())
            .field("capacity", &self.capacity)
            .field("dirty", &self.dirty)
            .finish()
    }
}
