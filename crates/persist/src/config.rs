//! Persistence settings: save root, file naming, and the load size ceiling.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default ceiling on the size of a save file accepted by `load`.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Errors loading or validating a `PersistConfig`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Where and how player saves are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistConfig {
    /// Directory holding one file per player.
    pub root: PathBuf,
    /// Save file extension, without the dot.
    pub extension: String,
    /// Suffix appended to the save path for in-flight writes.
    pub temp_suffix: String,
    /// Files larger than this are refused on load.
    pub max_file_size: u64,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("saves"),
            extension: "sav".into(),
            temp_suffix: "tmp".into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl PersistConfig {
    /// Default settings rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Read a JSON config file. Missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extension.is_empty() {
            return Err(ConfigError::Invalid("extension must not be empty"));
        }
        if self.temp_suffix.is_empty() {
            return Err(ConfigError::Invalid("temp_suffix must not be empty"));
        }
        if self.temp_suffix == self.extension {
            return Err(ConfigError::Invalid("temp_suffix must differ from extension"));
        }
        if self.extension.contains(['/', '\\']) || self.temp_suffix.contains(['/', '\\']) {
            return Err(ConfigError::Invalid("extension and temp_suffix must not contain path separators"));
        }
        if self.max_file_size == 0 {
            return Err(ConfigError::Invalid("max_file_size must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PersistConfig::default();
        config.validate().unwrap();
        assert_eq!(config.extension, "sav");
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("persist.json");
        std::fs::write(&path, r#"{ "root": "/srv/players", "max_file_size": 4096 }"#).unwrap();

        let config = PersistConfig::from_json_file(&path).unwrap();
        assert_eq!(config.root, PathBuf::from("/srv/players"));
        assert_eq!(config.max_file_size, 4096);
        assert_eq!(config.temp_suffix, "tmp");
    }

    #[test]
    fn invalid_values_rejected() {
        let mut config = PersistConfig::with_root("x");
        config.temp_suffix = "sav".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = PersistConfig::with_root("x");
        config.max_file_size = 0;
        assert!(config.validate().is_err());

        let mut config = PersistConfig::with_root("x");
        config.extension = "a/b".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = PersistConfig::from_json_file(tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_json_is_json_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "{ root: ").unwrap();
        assert!(matches!(
            PersistConfig::from_json_file(&path),
            Err(ConfigError::Json(_))
        ));
    }
}
