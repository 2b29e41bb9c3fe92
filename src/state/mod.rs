/// State management module
///
/// This module handles all roll state, including:
/// - The roll/photo data model (data.rs)
/// - Key-value persistence backends (storage.rs)
/// - The RollStore that owns the data and writes it back (rolls.rs)

pub mod data;
pub mod rolls;
pub mod storage;

pub use data::{Location, PhotoData, PhotoEntry, RollNumber};
pub use rolls::{read_photo_data, RollStore};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
