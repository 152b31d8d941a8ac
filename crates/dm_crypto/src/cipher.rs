//! Authenticated payload encryption.
//!
//! Uses AES-256-GCM (96-bit nonce).
//! Key size: 32 bytes.  Nonce: 12 bytes (random, fresh per call).  Tag: 16 bytes.
//!
//! Ciphertext wire format:
//!   [ nonce (12 bytes) | ciphertext + tag ]
//!
//! Message bodies and the "last message" preview are UTF-8 encoded, encrypted
//! under the conversation secret and base64-encoded for JSON transport.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng as AeadOsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use zeroize::Zeroizing;

use crate::{error::CryptoError, keys::ChatSecret};

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Take the cipher key from key agreement output: the low (trailing) 32 bytes.
///
/// For an uncompressed shared point this is the Y coordinate; for a bare
/// 32-byte secret it is the whole secret.
pub fn key_from_shared(shared: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    if shared.len() < KEY_LEN {
        return Err(CryptoError::InvalidKey(format!(
            "shared secret must be at least {KEY_LEN} bytes, got {}",
            shared.len()
        )));
    }
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&shared[shared.len() - KEY_LEN..]);
    Ok(key)
}

/// Encrypt `plaintext` with a 32-byte key, prepending a random 12-byte nonce.
pub fn seal_bytes(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Encryption)?;

    let nonce = Aes256Gcm::generate_nonce(&mut AeadOsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::Encryption)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt wire-format bytes (nonce || ciphertext+tag).
pub fn open_bytes(key: &[u8; KEY_LEN], data: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if data.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Decryption);
    }
    let (nonce_bytes, ct) = data.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Decryption)?;

    let plaintext = cipher
        .decrypt(nonce, ct)
        .map_err(|_| CryptoError::Decryption)?;

    Ok(Zeroizing::new(plaintext))
}

/// Encrypt raw bytes under a conversation secret.
pub fn encrypt(secret: &ChatSecret, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key = key_from_shared(secret.as_bytes())?;
    seal_bytes(&key, plaintext)
}

/// Decrypt raw bytes under a conversation secret.
pub fn decrypt(secret: &ChatSecret, data: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let key = key_from_shared(secret.as_bytes())?;
    open_bytes(&key, data)
}

/// Encrypt a text payload and base64-encode it for the wire.
pub fn encrypt_text(secret: &ChatSecret, text: &str) -> Result<String, CryptoError> {
    let ct = encrypt(secret, text.as_bytes())?;
    Ok(STANDARD.encode(ct))
}

/// Decode a base64 wire payload and decrypt it back to text.
pub fn decrypt_text(secret: &ChatSecret, b64: &str) -> Result<String, CryptoError> {
    let ct = STANDARD.decode(b64)?;
    let pt = decrypt(secret, &ct)?;
    String::from_utf8(pt.to_vec()).map_err(|_| CryptoError::InvalidUtf8)
}

/// Decrypt the "last message" preview. An empty preview is not ciphertext and
/// is returned unchanged.
pub fn decrypt_preview(secret: &ChatSecret, b64: &str) -> Result<String, CryptoError> {
    if b64.is_empty() {
        return Ok(String::new());
    }
    decrypt_text(secret, b64)
}
