//! dm_crypto — cryptographic primitives for end-to-end encrypted direct messages
//!
//! # Design principles
//! - NO custom crypto; secp256k1, Keccak-256 and AES-256-GCM come from audited crates.
//! - Conversation secrets and private keys are zeroized on drop.
//! - The private key never leaves a [`SigningAuthority`]; protocol code only
//!   asks it to sign or to agree on a shared point.
//!
//! # Module layout
//! - `authority` — signing authority trait + in-process secp256k1 implementation
//! - `keys`      — public key and conversation secret newtypes
//! - `cipher`    — AES-256-GCM payload encryption (nonce || ct+tag)
//! - `invite`    — sealed invites: sender public key || encrypted conversation secret
//! - `signature` — recoverable request signatures and signer recovery
//! - `hash`      — Keccak-256 digests
//! - `error`     — unified error type

pub mod authority;
pub mod cipher;
pub mod error;
pub mod hash;
pub mod invite;
pub mod keys;
pub mod signature;

pub use authority::{LocalKeyAuthority, SigningAuthority};
pub use error::CryptoError;
pub use invite::SealedInvite;
pub use keys::{ChatSecret, PublicKeyBytes};
pub use signature::RecoverableSignature;
