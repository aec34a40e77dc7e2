//! Crash-safe file storage for save images.
//!
//! Layout inside the store directory:
//! ```text
//! <id>.<extension>                 - committed save image
//! <id>.<extension>.<temp_suffix>   - in-flight write, renamed over the above
//! ```
//!
//! A save moves through `Idle → WritingTemp → Synced → Committed → Idle`. Any
//! failure removes the temp file and returns to `Idle`; the committed file is
//! only ever replaced by `rename`, so readers see either the old or the new
//! image in full.
//!
//! On filesystems where `rename` does not atomically replace an existing file
//! (some network mounts), a reader racing the commit can briefly find no file.

use crate::config::PersistConfig;
use keepsake_common::PlayerId;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The step of a save that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStage {
    CreateDir,
    WritingTemp,
    Syncing,
    Committing,
}

impl fmt::Display for SaveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SaveStage::CreateDir => "directory creation",
            SaveStage::WritingTemp => "temp file write",
            SaveStage::Syncing => "sync",
            SaveStage::Committing => "rename",
        })
    }
}

/// Errors from file-backed save storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no save at {}", .path.display())]
    NotFound { path: PathBuf },
    #[error("{} is {size} bytes, limit is {limit}", .path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },
    #[error("save to {} failed during {stage}: {source}", .path.display())]
    Save {
        stage: SaveStage,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("IO error reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("IO error removing {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One file per player id under a root directory.
#[derive(Debug, Clone)]
pub struct SaveFileStore {
    root: PathBuf,
    extension: String,
    temp_suffix: String,
    max_file_size: u64,
}

impl SaveFileStore {
    pub fn new(config: &PersistConfig) -> Self {
        Self {
            root: config.root.clone(),
            extension: config.extension.clone(),
            temp_suffix: config.temp_suffix.clone(),
            max_file_size: config.max_file_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn path_for(&self, id: &PlayerId) -> PathBuf {
        self.root.join(format!("{id}.{}", self.extension))
    }

    pub fn temp_path_for(&self, id: &PlayerId) -> PathBuf {
        self.root
            .join(format!("{id}.{}.{}", self.extension, self.temp_suffix))
    }

    pub fn exists(&self, id: &PlayerId) -> bool {
        self.path_for(id).is_file()
    }

    /// Replace the stored image for `id` with `bytes`.
    pub fn save(&self, id: &PlayerId, bytes: &[u8]) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.root).map_err(|source| StoreError::Save {
            stage: SaveStage::CreateDir,
            path: self.root.clone(),
            source,
        })?;

        let path = self.path_for(id);
        let tmp = self.temp_path_for(id);
        if let Err((stage, source)) = write_and_commit(&tmp, &path, bytes) {
            discard_temp(&tmp);
            return Err(StoreError::Save {
                stage,
                path,
                source,
            });
        }
        sync_dir(&self.root);
        debug!(%id, bytes = bytes.len(), path = %path.display(), "save committed");
        Ok(())
    }

    /// Read the stored image for `id`, refusing files over the size limit.
    pub fn load(&self, id: &PlayerId) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(id);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound { path });
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        let size = match file.metadata() {
            Ok(meta) => meta.len(),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        if size > self.max_file_size {
            return Err(StoreError::TooLarge {
                path,
                size,
                limit: self.max_file_size,
            });
        }

        // The file may grow between stat and read; never take more than limit + 1.
        let mut bytes = Vec::with_capacity(size as usize);
        if let Err(source) = file
            .take(self.max_file_size + 1)
            .read_to_end(&mut bytes)
        {
            return Err(StoreError::Read { path, source });
        }
        if bytes.len() as u64 > self.max_file_size {
            return Err(StoreError::TooLarge {
                path,
                size: bytes.len() as u64,
                limit: self.max_file_size,
            });
        }
        debug!(%id, bytes = bytes.len(), "save read");
        Ok(bytes)
    }

    /// Delete the stored image. Returns whether a file was removed.
    pub fn remove(&self, id: &PlayerId) -> Result<bool, StoreError> {
        let path = self.path_for(id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Remove { path, source }),
        }
    }
}

fn write_and_commit(tmp: &Path, path: &Path, bytes: &[u8]) -> Result<(), (SaveStage, io::Error)> {
    let mut file = File::create(tmp).map_err(|e| (SaveStage::WritingTemp, e))?;
    file.write_all(bytes)
        .map_err(|e| (SaveStage::WritingTemp, e))?;
    file.sync_all().map_err(|e| (SaveStage::Syncing, e))?;
    drop(file);
    std::fs::rename(tmp, path).map_err(|e| (SaveStage::Committing, e))
}

fn discard_temp(tmp: &Path) {
    match std::fs::remove_file(tmp) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %tmp.display(), error = %e, "failed to remove temp save file"),
    }
}

/// Persist the rename itself. Best effort.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(dir) = File::open(dir) {
        let _ = dir.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(root: &Path) -> SaveFileStore {
        SaveFileStore::new(&PersistConfig::with_root(root))
    }

    fn id(s: &str) -> PlayerId {
        PlayerId::new(s).unwrap()
    }

    #[test]
    fn paths_follow_layout() {
        let store = store_in(Path::new("/srv/saves"));
        assert_eq!(store.path_for(&id("bob")), PathBuf::from("/srv/saves/bob.sav"));
        assert_eq!(
            store.temp_path_for(&id("bob")),
            PathBuf::from("/srv/saves/bob.sav.tmp")
        );
    }

    #[test]
    fn save_creates_dirs_and_loads_back() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp.path().join("a").join("b"));
        let bob = id("bob");

        store.save(&bob, b"first image").unwrap();
        assert!(store.exists(&bob));
        assert_eq!(store.load(&bob).unwrap(), b"first image");
        assert!(!store.temp_path_for(&bob).exists());
    }

    #[test]
    fn save_replaces_wholesale() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let bob = id("bob");

        store.save(&bob, &[1u8; 100]).unwrap();
        store.save(&bob, &[2u8; 10]).unwrap();
        assert_eq!(store.load(&bob).unwrap(), vec![2u8; 10]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        assert!(matches!(
            store.load(&id("nobody")),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn oversized_file_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = PersistConfig::with_root(tmp.path());
        config.max_file_size = 64;
        let store = SaveFileStore::new(&config);
        let bob = id("bob");

        store.save(&bob, &[7u8; 64]).unwrap();
        assert_eq!(store.load(&bob).unwrap().len(), 64);

        std::fs::write(store.path_for(&bob), [7u8; 65]).unwrap();
        match store.load(&bob) {
            Err(StoreError::TooLarge { size, limit, .. }) => {
                assert_eq!(size, 65);
                assert_eq!(limit, 64);
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[test]
    fn failure_before_rename_keeps_previous_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let bob = id("bob");
        store.save(&bob, b"committed").unwrap();
        let before = std::fs::read(store.path_for(&bob)).unwrap();

        // A directory squatting on the temp path makes the temp write fail.
        std::fs::create_dir(store.temp_path_for(&bob)).unwrap();
        let err = store.save(&bob, b"never lands").unwrap_err();
        assert!(matches!(
            err,
            StoreError::Save {
                stage: SaveStage::WritingTemp,
                ..
            }
        ));
        assert_eq!(std::fs::read(store.path_for(&bob)).unwrap(), before);
    }

    #[test]
    fn failed_rename_cleans_up_temp() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let bob = id("bob");

        // A non-empty directory at the final path cannot be replaced by a file.
        let final_path = store.path_for(&bob);
        std::fs::create_dir(&final_path).unwrap();
        std::fs::write(final_path.join("keep"), b"x").unwrap();

        let err = store.save(&bob, b"image").unwrap_err();
        assert!(matches!(
            err,
            StoreError::Save {
                stage: SaveStage::Committing,
                ..
            }
        ));
        assert!(!store.temp_path_for(&bob).exists());
        assert!(final_path.join("keep").exists());
    }

    #[test]
    fn unusable_root_fails_at_create_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"not a dir").unwrap();
        let store = store_in(&blocker.join("saves"));

        let err = store.save(&id("bob"), b"image").unwrap_err();
        assert!(matches!(
            err,
            StoreError::Save {
                stage: SaveStage::CreateDir,
                ..
            }
        ));
    }

    #[test]
    fn stale_temp_file_is_overwritten() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let bob = id("bob");

        std::fs::write(store.temp_path_for(&bob), [0xAAu8; 500]).unwrap();
        store.save(&bob, b"fresh").unwrap();
        assert_eq!(store.load(&bob).unwrap(), b"fresh");
        assert!(!store.temp_path_for(&bob).exists());
    }

    #[test]
    fn remove_reports_presence() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let bob = id("bob");

        assert!(!store.remove(&bob).unwrap());
        store.save(&bob, b"x").unwrap();
        assert!(store.remove(&bob).unwrap());
        assert!(!store.exists(&bob));
    }
}
