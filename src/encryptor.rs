//! Encrypt a file with a fresh key and save the key next to it
//!
//! # Example
//!
//! ```no_run
//! use encryption_tool::{CommitMode, FileEncryptor};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let written = FileEncryptor::new("report.pdf", "report.pdf.enc", "report.key")
//!     .commit_mode(CommitMode::Atomic)
//!     .run()?;
//! println!("{} bytes of ciphertext", written);
//! # Ok(())
//! # }
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, error, warn};
use zeroize::Zeroizing;

use crate::config::KeyPath;
use crate::crypto::Fernet;
use crate::error::EncryptionError;

/// How the ciphertext and key files are put in place
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// Write the ciphertext, then the key, straight to their destinations.
    ///
    /// If the key write fails the ciphertext file stays behind, and it
    /// cannot be decrypted.
    #[default]
    Direct,
    /// Stage both files beside their destinations, then rename the key
    /// into place followed by the ciphertext. The key is removed again if
    /// the ciphertext rename fails.
    Atomic,
}

/// Builder for a single encrypt-and-save-key operation
#[derive(Debug, Clone)]
pub struct FileEncryptor {
    source: PathBuf,
    output: PathBuf,
    key_path: KeyPath,
    commit_mode: CommitMode,
}

impl FileEncryptor {
    pub fn new(
        source: impl AsRef<Path>,
        output: impl AsRef<Path>,
        key_path: impl Into<KeyPath>,
    ) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            key_path: key_path.into(),
            commit_mode: CommitMode::default(),
        }
    }

    /// Set how the output files are committed (default: [`CommitMode::Direct`])
    #[must_use]
    pub fn commit_mode(mut self, mode: CommitMode) -> Self {
        self.commit_mode = mode;
        self
    }

    /// Generate a key, encrypt the source and write both artifacts
    ///
    /// Returns the number of ciphertext bytes written. The source is read
    /// before anything is written, so a missing source leaves no files.
    pub fn run(&self) -> Result<u64, EncryptionError> {
        let fernet = Fernet::generate();

        let plaintext = Zeroizing::new(fs::read(&self.source).map_err(|source| {
            EncryptionError::ReadSource {
                path: self.source.clone(),
                source,
            }
        })?);
        let token = fernet.encrypt(&plaintext)?;
        let key = fernet.key().to_base64();

        match self.commit_mode {
            CommitMode::Direct => self.write_direct(&token, key.as_bytes())?,
            CommitMode::Atomic => self.write_atomic(&token, key.as_bytes())?,
        }

        debug!(
            "Wrote {} plaintext bytes as {} token bytes ({:?})",
            plaintext.len(),
            token.len(),
            self.commit_mode
        );
        Ok(token.len() as u64)
    }

    fn write_direct(&self, token: &[u8], key: &[u8]) -> Result<(), EncryptionError> {
        fs::write(&self.output, token).map_err(|source| EncryptionError::WriteOutput {
            path: self.output.clone(),
            source,
        })?;
        let key_path = self.key_file()?;
        fs::write(key_path, key).map_err(|source| EncryptionError::WriteKey {
            path: key_path.to_path_buf(),
            source,
        })
    }

    fn write_atomic(&self, token: &[u8], key: &[u8]) -> Result<(), EncryptionError> {
        let key_path = self.key_file()?;
        let staged_key = stage(key_path, key).map_err(|source| EncryptionError::WriteKey {
            path: key_path.to_path_buf(),
            source,
        })?;
        let staged_output =
            stage(&self.output, token).map_err(|source| EncryptionError::WriteOutput {
                path: self.output.clone(),
                source,
            })?;

        staged_key
            .persist(key_path)
            .map_err(|e| EncryptionError::Commit {
                path: key_path.to_path_buf(),
                source: e.error,
            })?;

        if let Err(e) = staged_output.persist(&self.output) {
            if let Err(cleanup) = fs::remove_file(key_path) {
                warn!(
                    "Could not remove key {} after failed commit: {}",
                    key_path.display(),
                    cleanup
                );
            }
            return Err(EncryptionError::Commit {
                path: self.output.clone(),
                source: e.error,
            });
        }
        Ok(())
    }

    fn key_file(&self) -> Result<&Path, EncryptionError> {
        match &self.key_path {
            KeyPath::File(path) => Ok(path),
            KeyPath::Unusable(raw) => Err(EncryptionError::UnusableKeyPath(raw.clone())),
        }
    }
}

/// Write `contents` to a temp file in the directory of `destination`
fn stage(destination: &Path, contents: &[u8]) -> io::Result<NamedTempFile> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    Ok(file)
}

/// Encrypt `source_path` into `output_path` and save the key to `key_path`
///
/// Returns true only if the read, the encryption and both writes succeed.
/// Failures are logged with their cause and reported as `false`.
pub fn encrypt_file(
    source_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    key_path: impl Into<KeyPath>,
) -> bool {
    match FileEncryptor::new(source_path, output_path, key_path).run() {
        Ok(_) => true,
        Err(e) => {
            error!("Encryption failed: {}", e);
            false
        }
    }
}
