//! Player-level save/load: encodes through the codec, persists through the
//! file store, and substitutes a new player when a stored save is unusable.
//!
//! Only `PlayerStore::load` turns a missing, oversized or rejected save into a
//! fresh record; every other I/O failure is returned to the caller.

use crate::codec::{self, CodecError, RejectReason};
use crate::config::{ConfigError, PersistConfig};
use crate::store::{SaveFileStore, SaveStage, StoreError};
use keepsake_common::{PlayerId, PlayerRecord};
use tracing::{info, warn};

/// Errors surfaced by `PlayerStore`.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("encode failed: {0}")]
    Encode(#[from] CodecError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why `load` handed back a fresh record instead of a stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreshReason {
    /// No save exists for the id.
    NoSave,
    /// A save exists but exceeds the size limit.
    Oversized { size: u64, limit: u64 },
    /// A save exists but the codec refused it.
    Rejected(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded,
    Fresh(FreshReason),
}

/// Result of `PlayerStore::load`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub record: PlayerRecord,
    pub status: LoadStatus,
}

impl LoadOutcome {
    pub fn is_fresh(&self) -> bool {
        matches!(self.status, LoadStatus::Fresh(_))
    }

    /// The codec's reason, when a stored save was rejected.
    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match &self.status {
            LoadStatus::Fresh(FreshReason::Rejected(reason)) => Some(reason),
            _ => None,
        }
    }

    fn fresh(reason: FreshReason) -> Self {
        Self {
            record: PlayerRecord::new_player(),
            status: LoadStatus::Fresh(reason),
        }
    }
}

/// Player save/load on top of the codec and the file store.
///
/// Callers serialize operations on the same id; nothing here locks.
#[derive(Debug, Clone)]
pub struct PlayerStore {
    files: SaveFileStore,
}

impl PlayerStore {
    /// Validate `config` and make sure its root directory exists.
    pub fn open(config: PersistConfig) -> Result<Self, PersistError> {
        config.validate()?;
        let files = SaveFileStore::new(&config);
        if let Err(source) = std::fs::create_dir_all(files.root()) {
            return Err(StoreError::Save {
                stage: SaveStage::CreateDir,
                path: files.root().to_path_buf(),
                source,
            }
            .into());
        }
        info!(root = %files.root().display(), "player store opened");
        Ok(Self { files })
    }

    pub fn files(&self) -> &SaveFileStore {
        &self.files
    }

    /// Encode `record` and atomically replace the stored save for `id`.
    pub fn save(&self, id: &PlayerId, record: &PlayerRecord) -> Result<(), PersistError> {
        let image = codec::encode(record)?;
        if let Err(e) = self.files.save(id, image.as_bytes()) {
            warn!(%id, error = %e, "player save failed");
            return Err(e.into());
        }
        info!(%id, bytes = image.len(), "player saved");
        Ok(())
    }

    /// Load the record for `id`, falling back to a new player when there is no
    /// usable save. Read errors other than a missing file are returned.
    pub fn load(&self, id: &PlayerId) -> Result<LoadOutcome, PersistError> {
        let bytes = match self.files.load(id) {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound { .. }) => {
                info!(%id, "no save, starting new player");
                return Ok(LoadOutcome::fresh(FreshReason::NoSave));
            }
            Err(StoreError::TooLarge { size, limit, .. }) => {
                warn!(%id, size, limit, "save exceeds size limit, resetting player");
                return Ok(LoadOutcome::fresh(FreshReason::Oversized { size, limit }));
            }
            Err(e) => return Err(e.into()),
        };

        match codec::decode(&bytes) {
            Ok(record) => {
                info!(%id, bytes = bytes.len(), "player loaded");
                Ok(LoadOutcome {
                    record,
                    status: LoadStatus::Loaded,
                })
            }
            Err(reason) => {
                warn!(%id, %reason, "save rejected, resetting player");
                Ok(LoadOutcome::fresh(FreshReason::Rejected(reason)))
            }
        }
    }
}
