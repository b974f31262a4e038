use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::entities::{AccountId, ApiRequest, FollowOutcome, Session};
use crate::error::Error;
use crate::ports::{Authenticator, Sleeper, Transport};
use crate::retry::RateLimitedClient;

pub const CREATE_RECORD: &str = "com.atproto.repo.createRecord";
pub const FOLLOW_COLLECTION: &str = "app.bsky.graph.follow";

/// `createdAt` layout accepted by the record endpoint (UTC, second precision)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Build the `createRecord` body for a follow from `own` to `target`.
pub fn follow_record(own: &AccountId, target: &AccountId, created_at: DateTime<Utc>) -> Value {
    json!({
        "collection": FOLLOW_COLLECTION,
        "repo": own.as_str(),
        "record": {
            "subject": target.as_str(),
            "createdAt": created_at.format(TIMESTAMP_FORMAT).to_string(),
            "$type": FOLLOW_COLLECTION,
        }
    })
}

/// Writes follow records.
///
/// The write is not idempotent: calling it twice for the same target
/// creates two records.
pub struct FollowExecutor<T, A, S>
where
    T: Transport,
    A: Authenticator,
    S: Sleeper,
{
    client: Arc<RateLimitedClient<T, A, S>>,
}

impl<T, A, S> FollowExecutor<T, A, S>
where
    T: Transport,
    A: Authenticator,
    S: Sleeper,
{
    pub const SUCCESS_MESSAGE: &'static str = "Success";

    pub fn new(client: Arc<RateLimitedClient<T, A, S>>) -> Self {
        Self { client }
    }

    #[instrument(skip(self, own, target, session), fields(subject = %target))]
    pub async fn follow(
        &self,
        own: &AccountId,
        target: &AccountId,
        session: &mut Session,
    ) -> Result<FollowOutcome, Error> {
        let request = ApiRequest::post(CREATE_RECORD, follow_record(own, target, Utc::now()));
        let response = self.client.execute(&request, session).await?;

        if response.is_success() {
            Ok(FollowOutcome {
                success: true,
                message: Self::SUCCESS_MESSAGE.to_string(),
            })
        } else {
            debug!(status = response.status, "follow rejected");
            Ok(FollowOutcome {
                success: false,
                message: response.body,
            })
        }
    }
}
