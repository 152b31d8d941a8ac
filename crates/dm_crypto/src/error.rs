use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Malformed invite: {0}")]
    MalformedInvite(String),

    #[error("AEAD encryption failed")]
    Encryption,

    #[error("AEAD decryption failed (authentication tag mismatch: wrong key or tampering)")]
    Decryption,

    #[error("Decrypted payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Signature recovery failed: {0}")]
    SignatureRecovery(String),

    #[error("Hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
