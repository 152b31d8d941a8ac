//! Sealed invites: how a conversation secret reaches each member.
//!
//! Wire format (base64 `invite_code` on the wire):
//!   [ sealer public key (65 bytes, uncompressed) | nonce (12) | enc(secret) + tag ]
//!
//! Sealing (creator side):
//!   K  = low 32 bytes of ECDH(sealer_sk, recipient_pk)
//!   ct = AES-256-GCM(K, secret)
//!
//! Opening (recipient side):
//!   K  = low 32 bytes of ECDH(recipient_sk, embedded sealer_pk)
//!   secret = AES-256-GCM-open(K, ct)
//!
//! Both sides derive the same K, so the relay stores blobs it cannot open.
//! The tag check is what rejects tampered or mis-addressed invites: another
//! participant can parse the blob but derives a different K.
//!
//! The public key length is fixed, so no length prefix is needed.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::{
    authority::SigningAuthority,
    cipher::{self, NONCE_LEN, TAG_LEN},
    error::CryptoError,
    keys::{ChatSecret, PublicKeyBytes, PUBLIC_KEY_LEN},
};

/// Smallest blob that can hold a key prefix, a nonce and a tag.
pub const MIN_INVITE_LEN: usize = PUBLIC_KEY_LEN + NONCE_LEN + TAG_LEN;

/// A structurally valid sealed invite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedInvite {
    sender: PublicKeyBytes,
    bytes: Vec<u8>,
}

impl SealedInvite {
    /// Split a raw blob at the fixed public key length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < MIN_INVITE_LEN {
            return Err(CryptoError::MalformedInvite(format!(
                "invite must be at least {MIN_INVITE_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let sender = PublicKeyBytes::from_sec1(&bytes[..PUBLIC_KEY_LEN])
            .map_err(|_| CryptoError::MalformedInvite("embedded sender key is not a valid point".into()))?;
        Ok(Self { sender, bytes: bytes.to_vec() })
    }

    pub fn from_b64(s: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD
            .decode(s.trim())
            .map_err(|e| CryptoError::MalformedInvite(format!("invite code is not base64: {e}")))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_b64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Public key of whoever sealed this invite.
    pub fn sender(&self) -> &PublicKeyBytes {
        &self.sender
    }

    fn ciphertext(&self) -> &[u8] {
        &self.bytes[PUBLIC_KEY_LEN..]
    }
}

/// Seal `secret` for `recipient` using the authority's private key.
pub async fn seal<A>(
    authority: &A,
    recipient: &PublicKeyBytes,
    secret: &ChatSecret,
) -> Result<SealedInvite, CryptoError>
where
    A: SigningAuthority + ?Sized,
{
    let shared = authority.shared_secret(recipient).await?;
    let key = cipher::key_from_shared(&shared)?;
    let ct = cipher::seal_bytes(&key, secret.as_bytes())?;

    let sender = authority.public_key();
    let mut bytes = Vec::with_capacity(PUBLIC_KEY_LEN + ct.len());
    bytes.extend_from_slice(&sender.to_uncompressed());
    bytes.extend_from_slice(&ct);
    Ok(SealedInvite { sender, bytes })
}

/// Recover the conversation secret from an invite addressed to the authority.
pub async fn open<A>(authority: &A, invite: &SealedInvite) -> Result<ChatSecret, CryptoError>
where
    A: SigningAuthority + ?Sized,
{
    let shared = authority.shared_secret(invite.sender()).await?;
    let key = cipher::key_from_shared(&shared)?;
    let plaintext = cipher::open_bytes(&key, invite.ciphertext())?;
    ChatSecret::from_bytes(&plaintext).map_err(|_| {
        CryptoError::MalformedInvite(format!(
            "invite decrypted to {} bytes, expected a conversation secret",
            plaintext.len()
        ))
    })
}
