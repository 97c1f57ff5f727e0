//! HMAC operations with constant-time verification
//!
//! Fernet authenticates every token with HMAC-SHA256 over the version byte,
//! timestamp, IV and ciphertext. Verification compares tags in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA256 tag
pub const TAG_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum HmacError {
    #[error("HMAC initialization failed")]
    InitFailed,

    #[error("HMAC verification failed")]
    VerificationFailed,
}

/// Calculate HMAC-SHA256 over data
pub fn calculate_hmac(key: &[u8], data: &[u8]) -> Result<[u8; TAG_LEN], HmacError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| HmacError::InitFailed)?;
    mac.update(data);
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

/// Verify an HMAC-SHA256 tag using constant-time comparison
///
/// Returns Ok(()) if the tag matches, Err otherwise. A tag of the wrong
/// length fails verification rather than panicking.
pub fn verify_hmac(key: &[u8], data: &[u8], expected: &[u8]) -> Result<(), HmacError> {
    let calculated = calculate_hmac(key, data)?;

    if calculated.as_slice().ct_eq(expected).into() {
        Ok(())
    } else {
        Err(HmacError::VerificationFailed)
    }
}
