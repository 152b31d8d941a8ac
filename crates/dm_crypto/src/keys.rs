//! Key newtypes.
//!
//! `PublicKeyBytes` wraps a validated secp256k1 point and always serialises
//! to the 65-byte uncompressed SEC1 form (`0x04 || X || Y`), which is the
//! fixed-length prefix of every sealed invite.
//!
//! `ChatSecret` is the 32-byte symmetric key shared by every member of one
//! conversation. It is zeroized on drop and its `Debug` output is redacted.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::{rngs::OsRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{error::CryptoError, hash::keccak256};

/// Length of an uncompressed SEC1 secp256k1 public key.
pub const PUBLIC_KEY_LEN: usize = 65;

/// Length of a conversation secret.
pub const CHAT_SECRET_LEN: usize = 32;

// ── Public key ───────────────────────────────────────────────────────────────

/// secp256k1 public key, base64 (standard alphabet) on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKeyBytes(k256::PublicKey);

impl PublicKeyBytes {
    /// Parse a SEC1 encoded point (compressed or uncompressed).
    pub fn from_sec1(bytes: &[u8]) -> Result<Self, CryptoError> {
        k256::PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| {
                CryptoError::InvalidKey(format!(
                    "not a valid secp256k1 point ({} bytes)",
                    bytes.len()
                ))
            })
    }

    pub fn to_uncompressed(&self) -> [u8; PUBLIC_KEY_LEN] {
        let point = self.0.to_encoded_point(false);
        let mut out = [0u8; PUBLIC_KEY_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    pub fn to_b64(&self) -> String {
        STANDARD.encode(self.to_uncompressed())
    }

    pub fn from_b64(s: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD.decode(s.trim())?;
        Self::from_sec1(&bytes)
    }

    /// Ethereum-style wallet address: `0x` + hex of the last 20 bytes of
    /// Keccak-256 over the 64-byte point (SEC1 tag byte dropped).
    pub fn address(&self) -> String {
        let uncompressed = self.to_uncompressed();
        let digest = keccak256(&uncompressed[1..]);
        format!("0x{}", hex::encode(&digest[12..]))
    }

    pub(crate) fn as_point(&self) -> &k256::PublicKey {
        &self.0
    }
}

impl From<k256::PublicKey> for PublicKeyBytes {
    fn from(key: k256::PublicKey) -> Self {
        Self(key)
    }
}

// ── Conversation secret ──────────────────────────────────────────────────────

/// Symmetric key for one conversation. Drop clears memory via ZeroizeOnDrop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ChatSecret([u8; CHAT_SECRET_LEN]);

impl ChatSecret {
    /// Fresh random secret from the OS RNG. Called once per conversation.
    pub fn generate() -> Self {
        let mut bytes = [0u8; CHAT_SECRET_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; CHAT_SECRET_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "conversation secret must be {CHAT_SECRET_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; CHAT_SECRET_LEN] {
        &self.0
    }
}

impl PartialEq for ChatSecret {
    fn eq(&self, other: &Self) -> bool {
        // Constant-time comparison
        let mut diff = 0u8;
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            diff |= a ^ b;
        }
        diff == 0
    }
}

impl Eq for ChatSecret {}

impl fmt::Debug for ChatSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChatSecret(<redacted>)")
    }
}
