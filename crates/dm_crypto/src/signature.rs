//! Recoverable request signatures.
//!
//! Header format (base64, standard alphabet, padded):
//!   [ r || s (64 bytes) | recovery id (1 byte) ]
//!
//! The relay reconstructs the signer's public key (and from it the wallet
//! address) from the signature and the canonical payload alone, so no
//! separate identity header is sent. Any change to the payload after signing
//! recovers a different key, or none at all.

use base64::{engine::general_purpose::STANDARD, Engine};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use crate::{error::CryptoError, hash::keccak256, keys::PublicKeyBytes};

pub const SIGNATURE_LEN: usize = 64;
pub const HEADER_BYTES_LEN: usize = SIGNATURE_LEN + 1;

/// 64-byte compact ECDSA signature plus one-byte recovery indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    signature: [u8; SIGNATURE_LEN],
    recovery_id: u8,
}

impl RecoverableSignature {
    pub fn from_parts(signature: &[u8], recovery_id: u8) -> Result<Self, CryptoError> {
        let signature: [u8; SIGNATURE_LEN] = signature.try_into().map_err(|_| {
            CryptoError::Signing(format!(
                "signature must be {SIGNATURE_LEN} bytes, got {}",
                signature.len()
            ))
        })?;
        Ok(Self { signature, recovery_id })
    }

    pub fn signature(&self) -> &[u8; SIGNATURE_LEN] {
        &self.signature
    }

    pub fn recovery_id(&self) -> u8 {
        self.recovery_id
    }

    pub fn to_bytes(&self) -> [u8; HEADER_BYTES_LEN] {
        let mut out = [0u8; HEADER_BYTES_LEN];
        out[..SIGNATURE_LEN].copy_from_slice(&self.signature);
        out[SIGNATURE_LEN] = self.recovery_id;
        out
    }

    /// Base64 value for the signature header.
    pub fn to_header(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    pub fn from_header(header: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD.decode(header.trim())?;
        if bytes.len() != HEADER_BYTES_LEN {
            return Err(CryptoError::SignatureRecovery(format!(
                "signature header must decode to {HEADER_BYTES_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Self::from_parts(&bytes[..SIGNATURE_LEN], bytes[SIGNATURE_LEN])
    }
}

/// Recover the public key that produced `header` over `payload`.
pub fn recover_signer(payload: &[u8], header: &str) -> Result<PublicKeyBytes, CryptoError> {
    let sig = RecoverableSignature::from_header(header)?;
    recover(payload, &sig)
}

/// Recover the public key from a parsed signature.
pub fn recover(payload: &[u8], sig: &RecoverableSignature) -> Result<PublicKeyBytes, CryptoError> {
    let digest = keccak256(payload);
    let signature = Signature::from_slice(&sig.signature)
        .map_err(|e| CryptoError::SignatureRecovery(e.to_string()))?;
    // Wallets commonly emit v = 27/28; normalise to 0/1.
    let v = if sig.recovery_id >= 27 { sig.recovery_id - 27 } else { sig.recovery_id };
    let recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| CryptoError::SignatureRecovery(format!("bad recovery id {v}")))?;
    let key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|e| CryptoError::SignatureRecovery(e.to_string()))?;
    Ok(PublicKeyBytes::from(k256::PublicKey::from(&key)))
}

/// Recover the wallet address (`0x…`) that signed `payload`.
pub fn recover_address(payload: &[u8], header: &str) -> Result<String, CryptoError> {
    Ok(recover_signer(payload, header)?.address())
}
