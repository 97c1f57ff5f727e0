//! JSON configuration with a hardcoded fallback
//!
//! The only recognized setting is `key_path`. A missing or unreadable config
//! never stops a run: [`load_config`] logs the problem and falls back to
//! [`DEFAULT_KEY_PATH`]. The value of `key_path` is not validated here; a
//! value that is not a string is kept as [`KeyPath::Unusable`] and fails the
//! key write later.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::error::ConfigError;

/// Key file used when the config does not name one
pub const DEFAULT_KEY_PATH: &str = "encryption_key.key";

/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Where the generated key goes, as named by the config
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPath {
    File(PathBuf),
    /// A `key_path` value that is not a JSON string, kept as JSON text
    Unusable(String),
}

impl KeyPath {
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Unusable(_) => None,
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Unusable(raw) => f.write_str(raw),
        }
    }
}

impl From<PathBuf> for KeyPath {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&PathBuf> for KeyPath {
    fn from(path: &PathBuf) -> Self {
        Self::File(path.clone())
    }
}

impl From<&Path> for KeyPath {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

impl From<&str> for KeyPath {
    fn from(path: &str) -> Self {
        Self::File(PathBuf::from(path))
    }
}

impl From<&KeyPath> for KeyPath {
    fn from(key_path: &KeyPath) -> Self {
        key_path.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where the generated key is written
    pub key_path: KeyPath,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_path: KeyPath::File(PathBuf::from(DEFAULT_KEY_PATH)),
        }
    }
}

impl Config {
    /// Parse a config document
    ///
    /// The document must be a JSON object; unknown keys are ignored. An
    /// object without `key_path` yields the default key path.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut raw: Map<String, Value> = serde_json::from_str(json)?;
        let key_path = match raw.remove("key_path") {
            Some(Value::String(path)) => KeyPath::File(PathBuf::from(path)),
            Some(other) => KeyPath::Unusable(other.to_string()),
            None => {
                warn!("Config has no key_path, using {}", DEFAULT_KEY_PATH);
                return Ok(Self::default());
            }
        };
        Ok(Self { key_path })
    }

    /// Read and parse the config file at `path`
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Load the config at `path`, falling back to the default on any error
///
/// The failure is logged, never returned.
pub fn load_config(path: impl AsRef<Path>) -> Config {
    Config::try_load(path).unwrap_or_else(|e| {
        error!("Config loading failed: {}", e);
        Config::default()
    })
}
