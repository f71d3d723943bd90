//! One-time-pad handling for root token generation
//!
//! The remote returns the generated token XOR-ed with the pad and base64
//! encoded. Two pad formats exist in the wild:
//! - legacy: the pad is 16 random bytes, base64 encoded, and the token is a
//!   UUID whose raw bytes were combined with it
//! - current: the pad is a printable string exactly as long as the token, and
//!   the token text itself was combined with the pad text
//!
//! Decoding is a pure function so it can be checked against fixed vectors.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use rand::RngCore;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::TokenDecodeError;

/// Raw pad length for the legacy format
pub const LEGACY_PAD_LEN: usize = 16;

/// A pad sent with the ceremony init request
#[derive(Clone)]
pub struct OneTimePad {
    encoded: Zeroizing<String>,
}

impl OneTimePad {
    /// Fresh random legacy-format pad
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; LEGACY_PAD_LEN]);
        rand::thread_rng().fill_bytes(&mut bytes[..]);
        Self::from_bytes(&bytes[..])
    }

    /// Pad built from known bytes, for deterministic tests
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            encoded: Zeroizing::new(STANDARD.encode(bytes)),
        }
    }

    /// Base64 form sent to the remote
    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl std::fmt::Debug for OneTimePad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OneTimePad(..)")
    }
}

fn decode_base64(input: &str) -> Result<Vec<u8>, TokenDecodeError> {
    let input = input.trim();
    STANDARD
        .decode(input)
        .or_else(|_| STANDARD_NO_PAD.decode(input))
        .map_err(TokenDecodeError::from)
}

fn xor(data: &[u8], pad: &[u8]) -> Result<Zeroizing<Vec<u8>>, TokenDecodeError> {
    if data.len() != pad.len() {
        return Err(TokenDecodeError::LengthMismatch {
            pad: pad.len(),
            token: data.len(),
        });
    }
    Ok(Zeroizing::new(
        data.iter().zip(pad).map(|(d, p)| d ^ p).collect(),
    ))
}

/// Recover the root token from its encoded form and the pad used
pub fn decode_token(encoded: &str, otp: &str) -> Result<Zeroizing<String>, TokenDecodeError> {
    let cipher = Zeroizing::new(decode_base64(encoded)?);

    // Current format: pad text is as long as the token text
    if otp.len() == cipher.len() {
        let plain = xor(&cipher, otp.as_bytes())?;
        let token = std::str::from_utf8(&plain)
            .map_err(|e| TokenDecodeError::Malformed(e.to_string()))?;
        return Ok(Zeroizing::new(token.to_string()));
    }

    let pad = Zeroizing::new(decode_base64(otp)?);
    let plain = xor(&cipher, &pad)?;
    let uuid =
        Uuid::from_slice(&plain).map_err(|e| TokenDecodeError::Malformed(e.to_string()))?;

    Ok(Zeroizing::new(uuid.hyphenated().to_string()))
}
