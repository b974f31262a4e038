use std::time::Duration;

use async_trait::async_trait;

use crate::entities::{ApiRequest, ApiResponse, Credentials, OutcomeRecord, Session, SourceRecord};
use crate::error::Error;

// ============================================================================
// Remote API Ports
// ============================================================================

/// Session creation against the remote API
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Exchange credentials for a fresh session.
    ///
    /// Any non-success status is `Error::Authentication`; no retry happens here.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, Error>;
}

/// Sends a single request without interpreting the status code
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connection-level failures map to `Error::Network`. Every HTTP status,
    /// including errors, is returned as an `ApiResponse`.
    async fn send(&self, request: &ApiRequest, token: &str) -> Result<ApiResponse, Error>;
}

/// Blocking pause on the single execution path
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

// ============================================================================
// Storage Ports
// ============================================================================

/// Supplier of the ordered input list
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn load_records(&self) -> Result<Vec<SourceRecord>, Error>;
}

/// Receiver of the completed outcome list
#[async_trait]
pub trait OutcomeSink: Send + Sync {
    async fn write_outcomes(&self, outcomes: &[OutcomeRecord]) -> Result<(), Error>;
}

/// Secure storage for the account password (keyring)
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn store_password(&self, identifier: &str, password: &str) -> Result<(), Error>;

    async fn get_password(&self, identifier: &str) -> Result<Option<String>, Error>;

    async fn delete_password(&self, identifier: &str) -> Result<(), Error>;
}
