//! `reqwest` implementation of [`Transport`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::{
    config::ClientConfig,
    error::TransportError,
    transport::{RelayMethod, RelayRequest, RelayResponse, Transport, SIGNATURE_HEADER},
};

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, base_url: config.base_url().to_owned() })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: RelayRequest) -> Result<RelayResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path_and_query);
        let mut builder = match request.method {
            RelayMethod::Get => self.client.get(&url),
            RelayMethod::Post => self.client.post(&url),
        };
        if let Some(sig) = request.signature {
            builder = builder.header(SIGNATURE_HEADER, sig);
        }
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();
        tracing::debug!(
            target: "dm_client",
            event = "relay_response",
            path = %request.path_and_query.split('?').next().unwrap_or_default(),
            status,
            body_bytes = body.len()
        );
        Ok(RelayResponse { status, body })
    }
}
