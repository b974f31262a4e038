use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable account identifier (a DID such as `did:plc:abc123`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Credentials for authentication (never persisted by the core)
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(identifier: String, secret: String) -> Self {
        Self { identifier, secret }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Authenticated context required by every protected call.
///
/// Owned by the migration loop and replaced wholesale on re-authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub own_account_id: AccountId,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("own_account_id", &self.own_account_id)
            .finish()
    }
}

/// One row of the input list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub source_identifier: String,
}

impl SourceRecord {
    pub fn new(source_identifier: impl Into<String>) -> Self {
        Self {
            source_identifier: source_identifier.into(),
        }
    }
}

/// Destination-network handle computed from a source identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivedIdentifier(String);

impl DerivedIdentifier {
    /// Appends `suffix` to the source identifier.
    pub fn derive(record: &SourceRecord, suffix: &str) -> Self {
        Self(format!("{}{}", record.source_identifier, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DerivedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-item result, serialized in the column layout of the results file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    #[serde(rename = "Twitter Handle")]
    pub source_identifier: String,
    #[serde(rename = "Bluesky Handle")]
    pub derived_identifier: String,
    #[serde(rename = "Followed")]
    pub followed: bool,
    #[serde(rename = "Message")]
    pub message: String,
}

impl OutcomeRecord {
    pub const NO_MATCH_MESSAGE: &'static str = "No matching account";

    pub fn not_found(source_identifier: &str) -> Self {
        Self {
            source_identifier: source_identifier.to_string(),
            derived_identifier: String::new(),
            followed: false,
            message: Self::NO_MATCH_MESSAGE.to_string(),
        }
    }

    pub fn from_follow(
        source_identifier: &str,
        derived: &DerivedIdentifier,
        outcome: FollowOutcome,
    ) -> Self {
        Self {
            source_identifier: source_identifier.to_string(),
            derived_identifier: derived.as_str().to_string(),
            followed: outcome.success,
            message: outcome.message,
        }
    }
}

/// Classified result of a follow write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowOutcome {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Protocol-neutral description of one XRPC call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Lexicon NSID, e.g. `com.atproto.identity.resolveHandle`
    pub endpoint: &'static str,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(endpoint: &'static str) -> Self {
        Self {
            method: HttpMethod::Get,
            endpoint,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(endpoint: &'static str, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            endpoint,
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

/// Raw response as seen by the retry engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Progress notification emitted after each item
#[derive(Debug, Clone)]
pub struct MigrationProgress {
    /// 1-based position of the item just processed
    pub index: usize,
    pub total: usize,
    pub outcome: OutcomeRecord,
}
