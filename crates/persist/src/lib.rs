//! Persistence for player records: CRC-32, a versioned big-endian save format,
//! and crash-safe file storage.
//!
//! # Invariants
//! - Every save image starts with `SAVE_MAGIC` and a version, and ends with the
//!   CRC-32 of everything before it.
//! - Encoding always targets `CURRENT_VERSION`; decoding accepts 1 through it.
//! - A committed save file is only ever replaced by an atomic rename.
//! - Only `PlayerStore::load` substitutes a new player for a rejected save.

pub mod checksum;
pub mod codec;
pub mod config;
pub mod cursor;
pub mod player_store;
pub mod store;

pub use checksum::{Crc32, checksum};
pub use codec::{
    CURRENT_VERSION, CodecError, HeaderInfo, RejectReason, SAVE_MAGIC, SaveImage, decode, encode,
    read_header,
};
pub use config::{ConfigError, PersistConfig};
pub use cursor::{CursorError, ReadCursor, WriteCursor};
pub use player_store::{FreshReason, LoadOutcome, LoadStatus, PersistError, PlayerStore};
pub use store::{SaveFileStore, SaveStage, StoreError};

pub fn crate_info() -> &'static str {
    "keepsake-persist v0.1.0"
}
