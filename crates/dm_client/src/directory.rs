//! Public key directory: `GET /comms/pubkey/{user_id}` (unsigned).

use std::sync::Arc;

use dm_crypto::PublicKeyBytes;
use dm_proto::api::PubkeyResponse;

use crate::{
    error::{ClientError, Result},
    transport::{RelayRequest, Transport},
};

#[derive(Clone)]
pub struct PublicKeyDirectory {
    transport: Arc<dyn Transport>,
}

impl PublicKeyDirectory {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Fetch the registered secp256k1 key for `user_id`.
    ///
    /// A 404 or an empty `data` field means the user never registered a key.
    pub async fn lookup(&self, user_id: &str) -> Result<PublicKeyBytes> {
        let path = format!("/comms/pubkey/{}", urlencoding::encode(user_id));
        let resp = self.transport.send(RelayRequest::get(path)).await?;
        if resp.status == 404 {
            return Err(ClientError::UnknownParticipant(user_id.to_owned()));
        }
        let resp = resp.error_for_status()?;

        let parsed: PubkeyResponse = serde_json::from_slice(&resp.body)?;
        match parsed.data.filter(|d| !d.is_empty()) {
            Some(b64) => Ok(PublicKeyBytes::from_b64(&b64)?),
            None => Err(ClientError::UnknownParticipant(user_id.to_owned())),
        }
    }
}
