//! Request signing.
//!
//! Reads sign the path plus query string; mutations sign the JSON body. In
//! both cases the relay recovers the wallet from `x-sig` and the exact bytes
//! it received.

use std::sync::Arc;

use dm_crypto::SigningAuthority;

use crate::{error::Result, transport::RelayRequest};

#[derive(Clone)]
pub struct RequestSigner {
    authority: Arc<dyn SigningAuthority>,
}

impl RequestSigner {
    pub fn new(authority: Arc<dyn SigningAuthority>) -> Self {
        Self { authority }
    }

    /// base64(64-byte signature || recovery id) over Keccak-256(`payload`).
    pub async fn sign_request(&self, payload: &[u8]) -> Result<String> {
        Ok(self.authority.sign(payload).await?.to_header())
    }

    pub async fn signed_get(&self, path_and_query: String) -> Result<RelayRequest> {
        let signature = self.sign_request(path_and_query.as_bytes()).await?;
        Ok(RelayRequest::get(path_and_query).signed(signature))
    }

    pub async fn signed_post(&self, path: &str, body: Vec<u8>) -> Result<RelayRequest> {
        let signature = self.sign_request(&body).await?;
        Ok(RelayRequest::post(path, body).signed(signature))
    }
}
