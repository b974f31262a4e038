use async_trait::async_trait;
use reqwest::Client;
use skyfollow_core::entities::{ApiRequest, ApiResponse, HttpMethod};
use skyfollow_core::ports::Transport;
use skyfollow_core::Error;
use tracing::{debug, instrument};

use crate::network::{build_api_client, xrpc_url};

/// Sends XRPC calls to a PDS over HTTPS
pub struct XrpcTransport {
    client: Client,
    base_url: String,
}

impl XrpcTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        Ok(Self::with_client(build_api_client()?, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Transport for XrpcTransport {
    #[instrument(skip(self, request, token), fields(endpoint = request.endpoint))]
    async fn send(&self, request: &ApiRequest, token: &str) -> Result<ApiResponse, Error> {
        let url = xrpc_url(&self.base_url, request.endpoint);

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        }
        .bearer_auth(token);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("{} request failed: {}", request.endpoint, e)))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            Error::Network(format!(
                "failed to read {} response: {}",
                request.endpoint, e
            ))
        })?;

        debug!(status, "received response");
        Ok(ApiResponse { status, body })
    }
}
