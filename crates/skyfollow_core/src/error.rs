use thiserror::Error;

use crate::entities::OutcomeRecord;

#[derive(Debug, Error)]
pub enum Error {
    #[error("authentication failed with status {status}: {body}")]
    Authentication { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response from server: {0}")]
    InvalidServerResponse(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("credential storage error: {0}")]
    CredentialStorage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns true when the run cannot continue without a new process
    /// (bad credentials, unreachable server).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::Network(_))
    }
}

/// A batch stopped by a fatal error after authentication succeeded.
///
/// Carries every outcome recorded before the failure so the caller can
/// still persist them.
#[derive(Debug, Error)]
#[error("migration aborted after {} items: {source}", .outcomes.len())]
pub struct MigrationAborted {
    pub outcomes: Vec<OutcomeRecord>,
    pub source: Error,
}

impl From<Error> for MigrationAborted {
    fn from(source: Error) -> Self {
        Self {
            outcomes: Vec::new(),
            source,
        }
    }
}
