//! Zeroizing key types
//!
//! Key material lives in wrappers that clear their memory on drop, so the
//! generated key never outlives the encryption call that owns it.

use base64::{engine::general_purpose::URL_SAFE as BASE64_URL, Engine as _};
use rand::{rngs::OsRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Raw length of a Fernet key (signing half + encryption half)
pub const KEY_LEN: usize = 32;

/// Length of the URL-safe base64 encoding of a key, as written to key files
pub const ENCODED_KEY_LEN: usize = 44;

/// Fernet key (32 bytes) that zeroizes on drop
///
/// The first 16 bytes key HMAC-SHA256, the last 16 bytes key AES-128-CBC.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FernetKey(pub(crate) [u8; KEY_LEN]);

impl FernetKey {
    /// Generate a fresh random key from the OS RNG
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        FernetKey(key)
    }

    /// Create a key from a 32-byte slice
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != KEY_LEN {
            return Err(KeyError::InvalidLength {
                expected: KEY_LEN,
                got: bytes.len(),
            });
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(FernetKey(key))
    }

    /// Parse the URL-safe base64 form found in key files
    ///
    /// Surrounding whitespace (a trailing newline from an editor, say) is
    /// ignored.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let decoded = Zeroizing::new(BASE64_URL.decode(encoded.trim())?);
        Self::from_slice(&decoded)
    }

    /// URL-safe base64 encoding of the key, always [`ENCODED_KEY_LEN`] bytes
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(BASE64_URL.encode(self.0))
    }

    pub fn signing_key(&self) -> &[u8] {
        &self.0[..16]
    }

    pub fn encryption_key(&self) -> &[u8] {
        &self.0[16..]
    }

    /// Get a reference to the key bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for FernetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FernetKey(..)")
    }
}

/// 128-bit CBC initialization vector
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct Iv128(pub(crate) [u8; 16]);

impl Iv128 {
    /// Generate a random IV
    pub fn generate() -> Self {
        let mut iv = [0u8; 16];
        OsRng.fill_bytes(&mut iv);
        Iv128(iv)
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Iv128(bytes)
    }

    /// Get a reference to the IV bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

/// Key-related errors
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("Invalid key encoding: {0}")]
    Encoding(#[from] base64::DecodeError),
}
