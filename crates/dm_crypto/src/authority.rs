//! Signing authority.
//!
//! The authority owns the user's secp256k1 private key. Protocol code only
//! ever asks it for three things:
//!   - `public_key`    — the local public key (embedded in every sealed invite)
//!   - `sign`          — recoverable ECDSA over Keccak-256(payload)
//!   - `shared_secret` — ECDH with a counterparty key, returned as the
//!                       65-byte uncompressed shared point
//!
//! `LocalKeyAuthority` keeps the key in process memory. Hardware wallets or
//! remote signers implement the same trait without touching protocol code.

use async_trait::async_trait;
use k256::{
    ecdsa::SigningKey,
    elliptic_curve::sec1::ToEncodedPoint,
    SecretKey,
};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::{
    error::CryptoError,
    hash::keccak256,
    keys::PublicKeyBytes,
    signature::RecoverableSignature,
};

#[async_trait]
pub trait SigningAuthority: Send + Sync {
    /// The local participant's public key.
    fn public_key(&self) -> PublicKeyBytes;

    /// Sign `payload`, returning a 64-byte signature plus recovery id.
    async fn sign(&self, payload: &[u8]) -> Result<RecoverableSignature, CryptoError>;

    /// ECDH between the local private key and `counterparty`.
    async fn shared_secret(
        &self,
        counterparty: &PublicKeyBytes,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError>;
}

// ── In-process key ───────────────────────────────────────────────────────────

/// secp256k1 key held in memory. `SecretKey` zeroizes itself on drop.
pub struct LocalKeyAuthority {
    secret: SecretKey,
    public: PublicKeyBytes,
}

impl LocalKeyAuthority {
    pub fn generate() -> Self {
        Self::from_secret(SecretKey::random(&mut OsRng))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_slice(bytes).map_err(|_| {
            CryptoError::InvalidKey(format!(
                "private key must be a 32-byte non-zero scalar, got {} bytes",
                bytes.len()
            ))
        })?;
        Ok(Self::from_secret(secret))
    }

    /// Parse a hex private key, with or without `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = Zeroizing::new(hex::decode(digits)?);
        Self::from_bytes(&bytes)
    }

    /// Hex export for key backup (CLI `keygen`).
    pub fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.secret.to_bytes()))
    }

    fn from_secret(secret: SecretKey) -> Self {
        let public = PublicKeyBytes::from(secret.public_key());
        Self { secret, public }
    }
}

#[async_trait]
impl SigningAuthority for LocalKeyAuthority {
    fn public_key(&self) -> PublicKeyBytes {
        self.public
    }

    async fn sign(&self, payload: &[u8]) -> Result<RecoverableSignature, CryptoError> {
        let digest = keccak256(payload);
        let signing_key = SigningKey::from(&self.secret);
        let (signature, recovery_id) = signing_key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        RecoverableSignature::from_parts(&signature.to_bytes(), recovery_id.to_byte())
    }

    async fn shared_secret(
        &self,
        counterparty: &PublicKeyBytes,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let scalar = self.secret.to_nonzero_scalar();
        let shared = (counterparty.as_point().to_projective() * *scalar).to_affine();
        let encoded = shared.to_encoded_point(false);
        Ok(Zeroizing::new(encoded.as_bytes().to_vec()))
    }
}
