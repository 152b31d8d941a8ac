//! Keccak-256 helpers.
//!
//! Request signatures are taken over the Keccak-256 digest of the canonical
//! payload, and wallet addresses are the low 20 bytes of the Keccak-256 digest
//! of the 64-byte public point, so the relay can use Ethereum-style recovery.

use sha3::{Digest, Keccak256};

/// Keccak-256 (the pre-standard SHA-3 padding used by Ethereum).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}
