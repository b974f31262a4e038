use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use skyfollow_core::entities::{AccountId, Credentials, Session};
use skyfollow_core::ports::Authenticator;
use skyfollow_core::Error;
use tracing::{debug, instrument, warn};

use crate::network::{build_api_client, xrpc_url};

const CREATE_SESSION: &str = "com.atproto.server.createSession";

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    access_jwt: String,
    did: String,
}

/// Password login against `com.atproto.server.createSession`
pub struct XrpcAuthenticator {
    client: Client,
    base_url: String,
}

impl XrpcAuthenticator {
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
impl Authenticator for XrpcAuthenticator {
    #[instrument(skip(self, credentials), fields(identifier = %credentials.identifier))]
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, Error> {
        let payload = CreateSessionRequest {
            identifier: &credentials.identifier,
            password: &credentials.secret,
        };

        debug!("creating session");

        let response = self
            .client
            .post(xrpc_url(&self.base_url, CREATE_SESSION))
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Network(format!("session request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("failed to read session response: {}", e)))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "authentication rejected");
            return Err(Error::Authentication {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CreateSessionResponse = serde_json::from_str(&body).map_err(|e| {
            Error::InvalidServerResponse(format!("unexpected session response: {}", e))
        })?;

        Ok(Session {
            token: parsed.access_jwt,
            own_account_id: AccountId::new(parsed.did),
        })
    }
}
