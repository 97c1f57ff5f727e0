//! Encrypt a file with a freshly generated Fernet key and save the key
//!
//! # Example
//!
//! ```no_run
//! use encryption_tool::{encrypt_file, load_config};
//!
//! let config = load_config("config.json");
//! if encrypt_file("notes.txt", "notes.txt.enc", &config.key_path) {
//!     println!("key saved to {}", config.key_path);
//! }
//! ```

pub mod cli;
mod config;
mod crypto;
mod encryptor;
mod error;
mod hmac;
pub mod logging;
mod types;

pub use config::{load_config, Config, KeyPath, DEFAULT_CONFIG_PATH, DEFAULT_KEY_PATH};
pub use crypto::{CryptoError, Fernet};
pub use encryptor::{encrypt_file, CommitMode, FileEncryptor};
pub use error::{ConfigError, EncryptionError, LoggingError};
pub use types::{FernetKey, Iv128, KeyError, ENCODED_KEY_LEN, KEY_LEN};
