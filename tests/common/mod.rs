//! Common test utilities for encryption-tool integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use encryption_tool::{Fernet, FernetKey};
use tempfile::TempDir;

/// Test data for encryption
pub const TEST_PLAINTEXT: &[u8] = b"hello world";

/// A scratch directory holding an input file
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a workspace with `input.txt` containing `plaintext`
    pub fn with_input(plaintext: &[u8]) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        fs::write(dir.path().join("input.txt"), plaintext).expect("write input");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a config file naming `key_path`
    pub fn write_config(&self, name: &str, key_path: &Path) -> PathBuf {
        let path = self.path(name);
        let json = serde_json::json!({ "key_path": key_path });
        fs::write(&path, json.to_string()).expect("write config");
        path
    }
}

/// Decrypt `output` with the key stored at `key_path`
///
/// The tool itself has no decrypt command; this is the inverse used to
/// check what it wrote.
pub fn decrypt_file(
    output: impl AsRef<Path>,
    key_path: impl AsRef<Path>,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let key = FernetKey::from_base64(&fs::read_to_string(key_path)?)?;
    let token = fs::read(output)?;
    Ok(Fernet::new(key).decrypt(&token)?)
}
