//! Error types for file encryption, configuration and logging setup
//!
//! None of these reach the command line as-is. Configuration errors are
//! replaced by the default config, encryption errors are folded into a
//! boolean by [`crate::encrypt_file`]; both are logged with their cause first.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::crypto::CryptoError;

/// Errors that can occur while encrypting a file and saving its key
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// The source file could not be read
    #[error("cannot read {}: {source}", .path.display())]
    ReadSource { path: PathBuf, source: io::Error },

    /// Token generation failed
    #[error("cipher error: {0}")]
    Cipher(#[from] CryptoError),

    /// The ciphertext could not be written
    #[error("cannot write ciphertext to {}: {source}", .path.display())]
    WriteOutput { path: PathBuf, source: io::Error },

    /// The key could not be written
    #[error("cannot write key to {}: {source}", .path.display())]
    WriteKey { path: PathBuf, source: io::Error },

    /// The configured key path is not a file path at all
    #[error("cannot write key: key_path {0} is not a file path")]
    UnusableKeyPath(String),

    /// A staged artifact could not be moved into place
    #[error("cannot move staged file into {}: {source}", .path.display())]
    Commit { path: PathBuf, source: io::Error },
}

/// Errors that can occur while loading the JSON config
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Errors that can occur while installing the log sink
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("global subscriber already set: {0}")]
    AlreadySet(#[from] tracing::subscriber::SetGlobalDefaultError),
}
