//! Shared HTTP client configuration for XRPC calls.

use reqwest::Client;
use skyfollow_core::Error;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("skyfollow/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by the transport and the authenticator.
///
/// No request timeout is set: a call waits as long as the transport allows.
pub fn build_api_client() -> Result<Client, Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::Network(format!("failed to create HTTP client: {}", e)))
}

/// Normalize a configured service URL to the `<base>/xrpc/<nsid>` layout.
pub fn xrpc_url(base_url: &str, endpoint: &str) -> String {
    format!("{}/xrpc/{}", base_url.trim_end_matches('/'), endpoint)
}
