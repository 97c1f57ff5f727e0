//! Fernet authenticated encryption
//!
//! A token is the URL-safe base64 encoding of
//!
//! ```text
//! version (0x80) | timestamp (u64 BE) | IV (16) | AES-128-CBC ciphertext | HMAC-SHA256 (32)
//! ```
//!
//! The HMAC covers every byte before it, so a token is decryptable from the
//! token and key alone and any modification is rejected.

use crate::hmac::{calculate_hmac, verify_hmac, HmacError, TAG_LEN};
use crate::types::{FernetKey, Iv128, KeyError};
use aes::Aes128;
use base64::{engine::general_purpose::URL_SAFE as BASE64_URL, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use chrono::Utc;
use std::time::Duration;
use thiserror::Error;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Version byte leading every token
pub const VERSION: u8 = 0x80;

const TIMESTAMP_LEN: usize = 8;
const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;
const HEADER_LEN: usize = 1 + TIMESTAMP_LEN + IV_LEN;

/// Tolerated clock difference for tokens stamped ahead of the local clock,
/// checked only when a ttl is given
const MAX_CLOCK_SKEW: u64 = 60;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
    #[error("Cipher initialization failed")]
    CipherInitFailed,
    #[error("Token is not valid base64: {0}")]
    Base64Error(#[from] base64::DecodeError),
    #[error("Malformed token: {0}")]
    MalformedToken(&'static str),
    #[error("Unsupported token version: {0:#04x}")]
    UnsupportedVersion(u8),
    #[error("Token authentication failed")]
    AuthenticationFailed,
    #[error("Invalid padding")]
    InvalidPadding,
    #[error("Token expired: issued {age}s ago, ttl {ttl}s")]
    Expired { age: u64, ttl: u64 },
    #[error("Token timestamp is ahead of the local clock")]
    FromTheFuture,
}

impl From<HmacError> for CryptoError {
    fn from(err: HmacError) -> Self {
        match err {
            HmacError::InitFailed => CryptoError::CipherInitFailed,
            HmacError::VerificationFailed => CryptoError::AuthenticationFailed,
        }
    }
}

impl CryptoError {
    /// Returns true if the token itself was rejected (bad encoding, tampering,
    /// wrong key, expiry), as opposed to a local setup failure
    pub fn is_invalid_token(&self) -> bool {
        !matches!(self, Self::Key(_) | Self::CipherInitFailed)
    }
}

/// Fernet cipher bound to a single key
pub struct Fernet {
    key: FernetKey,
}

impl Fernet {
    pub fn new(key: FernetKey) -> Self {
        Self { key }
    }

    /// Create a Fernet instance with a freshly generated key
    pub fn generate() -> Self {
        Self::new(FernetKey::generate())
    }

    pub fn key(&self) -> &FernetKey {
        &self.key
    }

    /// Encrypt data into a token stamped with the current time and a random IV
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.encrypt_at_time(data, current_time(), Iv128::generate())
    }

    /// Encrypt with an explicit timestamp and IV
    ///
    /// Reusing an IV under the same key leaks plaintext equality; outside of
    /// test vectors use [`Fernet::encrypt`].
    pub fn encrypt_at_time(
        &self,
        data: &[u8],
        timestamp: u64,
        iv: Iv128,
    ) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes128CbcEnc::new_from_slices(self.key.encryption_key(), iv.as_slice())
            .map_err(|_| CryptoError::CipherInitFailed)?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(data);

        let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len() + TAG_LEN);
        token.push(VERSION);
        token.extend_from_slice(&timestamp.to_be_bytes());
        token.extend_from_slice(iv.as_slice());
        token.extend_from_slice(&ciphertext);

        let tag = calculate_hmac(self.key.signing_key(), &token)?;
        token.extend_from_slice(&tag);

        Ok(BASE64_URL.encode(token).into_bytes())
    }

    /// Decrypt a token regardless of its age
    pub fn decrypt(&self, token: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.decrypt_at_time(token, None, current_time())
    }

    /// Decrypt a token, rejecting it if it is older than `ttl`
    pub fn decrypt_with_ttl(&self, token: &[u8], ttl: Duration) -> Result<Vec<u8>, CryptoError> {
        self.decrypt_at_time(token, Some(ttl), current_time())
    }

    /// Decrypt a token as of `now` (seconds since the Unix epoch)
    pub fn decrypt_at_time(
        &self,
        token: &[u8],
        ttl: Option<Duration>,
        now: u64,
    ) -> Result<Vec<u8>, CryptoError> {
        let raw = BASE64_URL.decode(token)?;
        let timestamp = self.verify(&raw)?;

        if let Some(ttl) = ttl {
            let ttl = ttl.as_secs();
            if timestamp.saturating_add(ttl) < now {
                return Err(CryptoError::Expired {
                    age: now - timestamp,
                    ttl,
                });
            }
            if now.saturating_add(MAX_CLOCK_SKEW) < timestamp {
                return Err(CryptoError::FromTheFuture);
            }
        }

        let iv = &raw[1 + TIMESTAMP_LEN..HEADER_LEN];
        let ciphertext = &raw[HEADER_LEN..raw.len() - TAG_LEN];
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Err(CryptoError::MalformedToken(
                "ciphertext is not a whole number of blocks",
            ));
        }

        let cipher = Aes128CbcDec::new_from_slices(self.key.encryption_key(), iv)
            .map_err(|_| CryptoError::CipherInitFailed)?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::InvalidPadding)
    }

    /// Return the timestamp a token was issued at, after authenticating it
    pub fn extract_timestamp(&self, token: &[u8]) -> Result<u64, CryptoError> {
        let raw = BASE64_URL.decode(token)?;
        self.verify(&raw)
    }

    /// Check structure and HMAC of a decoded token, returning its timestamp
    fn verify(&self, raw: &[u8]) -> Result<u64, CryptoError> {
        match raw.first() {
            None => return Err(CryptoError::MalformedToken("empty token")),
            Some(&version) if version != VERSION => {
                return Err(CryptoError::UnsupportedVersion(version))
            }
            Some(_) => {}
        }
        if raw.len() < HEADER_LEN + TAG_LEN {
            return Err(CryptoError::MalformedToken("token too short"));
        }

        let (signed, tag) = raw.split_at(raw.len() - TAG_LEN);
        verify_hmac(self.key.signing_key(), signed, tag)?;

        let mut timestamp = [0u8; TIMESTAMP_LEN];
        timestamp.copy_from_slice(&signed[1..1 + TIMESTAMP_LEN]);
        Ok(u64::from_be_bytes(timestamp))
    }
}

fn current_time() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    // Published Fernet test vector
    const VECTOR_KEY: &str = "cw_0x689RpI-jtRR7oE8h_eQsKImvJapLeSbXpwF4e4=";
    const VECTOR_TOKEN: &[u8] = b"gAAAAAAdwJ6wAAECAwQFBgcICQoLDA0ODy021cpGVWKZ_eEwCGM4BLLF_5CV9dOPmrhuVUPgJobwOz7JcbmrR64jVmpU4IwqDA==";
    const VECTOR_TIME: u64 = 499_162_800;

    fn vector_iv() -> Iv128 {
        let mut iv = [0u8; 16];
        for (i, b) in iv.iter_mut().enumerate() {
            *b = i as u8;
        }
        Iv128::from_bytes(iv)
    }

    fn vector_fernet() -> Fernet {
        Fernet::new(FernetKey::from_base64(VECTOR_KEY).unwrap())
    }

    #[test]
    fn test_known_vector_encrypt() -> Result<(), CryptoError> {
        let token = vector_fernet().encrypt_at_time(b"hello", VECTOR_TIME, vector_iv())?;
        assert_eq!(token, VECTOR_TOKEN);
        Ok(())
    }

    #[test]
    fn test_known_vector_decrypt() -> Result<(), CryptoError> {
        let ttl = Some(Duration::from_secs(60));
        let plaintext = vector_fernet().decrypt_at_time(VECTOR_TOKEN, ttl, VECTOR_TIME + 10)?;
        assert_eq!(plaintext, b"hello");
        Ok(())
    }

    #[test]
    fn test_encryption_decryption() -> Result<(), CryptoError> {
        let fernet = Fernet::generate();

        for len in [0usize, 1, 15, 16, 17, 1000] {
            let data: Vec<u8> = (0..len).map(|i| (i * 7) as u8).collect();
            let token = fernet.encrypt(&data)?;
            assert_eq!(fernet.decrypt(&token)?, data, "length {}", len);
        }
        Ok(())
    }

    #[test]
    fn test_token_starts_with_version() -> Result<(), CryptoError> {
        let token = Fernet::generate().encrypt(b"data")?;
        // 0x80 followed by the high timestamp bytes always encodes as "gAAAAA"
        assert!(token.starts_with(b"gAAAAA"));
        Ok(())
    }

    #[test]
    fn test_fresh_iv_per_encryption() -> Result<(), CryptoError> {
        let fernet = Fernet::generate();
        let first = fernet.encrypt(b"same input")?;
        let second = fernet.encrypt(b"same input")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn test_wrong_key_is_rejected() -> Result<(), CryptoError> {
        let token = Fernet::generate().encrypt(b"secret")?;
        let result = Fernet::generate().decrypt(&token);
        assert!(matches!(result, Err(CryptoError::AuthenticationFailed)));
        Ok(())
    }

    #[test]
    fn test_every_flipped_byte_is_rejected() -> Result<(), CryptoError> {
        let fernet = Fernet::generate();
        let token = fernet.encrypt(b"tamper target")?;

        for i in 0..token.len() {
            let mut tampered = token.clone();
            tampered[i] ^= 0x01;
            let err = fernet.decrypt(&tampered).unwrap_err();
            assert!(err.is_invalid_token(), "byte {} gave {:?}", i, err);
        }
        Ok(())
    }

    #[test]
    fn test_modified_ciphertext_fails_authentication() -> Result<(), CryptoError> {
        let fernet = Fernet::generate();
        let token = fernet.encrypt(b"authenticated")?;

        let mut raw = BASE64_URL.decode(&token)?;
        raw[HEADER_LEN] ^= 0xff;
        let tampered = BASE64_URL.encode(raw);

        let result = fernet.decrypt(tampered.as_bytes());
        assert!(matches!(result, Err(CryptoError::AuthenticationFailed)));
        Ok(())
    }

    #[test]
    fn test_unsupported_version() -> Result<(), CryptoError> {
        let fernet = Fernet::generate();
        let token = fernet.encrypt(b"data")?;

        let mut raw = BASE64_URL.decode(&token)?;
        raw[0] = 0x81;
        let result = fernet.decrypt(BASE64_URL.encode(raw).as_bytes());
        assert!(matches!(result, Err(CryptoError::UnsupportedVersion(0x81))));
        Ok(())
    }

    #[test]
    fn test_short_and_empty_tokens() {
        let fernet = Fernet::generate();
        assert!(matches!(
            fernet.decrypt(b""),
            Err(CryptoError::MalformedToken(_))
        ));
        let short = BASE64_URL.encode([VERSION, 0, 0, 0]);
        assert!(matches!(
            fernet.decrypt(short.as_bytes()),
            Err(CryptoError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_invalid_base64() {
        let result = Fernet::generate().decrypt(b"not*a*token");
        assert!(matches!(result, Err(CryptoError::Base64Error(_))));
    }

    #[test]
    fn test_ttl_accepts_fresh_token() -> Result<(), CryptoError> {
        let fernet = Fernet::generate();
        let token = fernet.encrypt_at_time(b"fresh", 1_000, Iv128::generate())?;
        let plaintext = fernet.decrypt_at_time(&token, Some(Duration::from_secs(100)), 1_050)?;
        assert_eq!(plaintext, b"fresh");
        Ok(())
    }

    #[test]
    fn test_decrypt_with_ttl_now() -> Result<(), CryptoError> {
        let fernet = Fernet::generate();
        let token = fernet.encrypt(b"just issued")?;
        assert_eq!(fernet.decrypt_with_ttl(&token, Duration::from_secs(60))?, b"just issued");
        Ok(())
    }

    #[test]
    fn test_ttl_rejects_old_token() -> Result<(), CryptoError> {
        let fernet = Fernet::generate();
        let token = fernet.encrypt_at_time(b"stale", 1_000, Iv128::generate())?;
        let result = fernet.decrypt_at_time(&token, Some(Duration::from_secs(100)), 1_200);
        assert!(matches!(
            result,
            Err(CryptoError::Expired { age: 200, ttl: 100 })
        ));
        Ok(())
    }

    #[test]
    fn test_rejects_token_from_the_future() -> Result<(), CryptoError> {
        let fernet = Fernet::generate();
        let token = fernet.encrypt_at_time(b"early", 10_000, Iv128::generate())?;
        let result = fernet.decrypt_at_time(&token, Some(Duration::from_secs(100)), 1_000);
        assert!(matches!(result, Err(CryptoError::FromTheFuture)));

        // Without a ttl the timestamp is not checked
        assert_eq!(fernet.decrypt_at_time(&token, None, 1_000)?, b"early");
        Ok(())
    }

    #[test]
    fn test_extract_timestamp() -> Result<(), CryptoError> {
        assert_eq!(vector_fernet().extract_timestamp(VECTOR_TOKEN)?, VECTOR_TIME);
        Ok(())
    }
}
