use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::entities::{AccountId, ApiRequest, DerivedIdentifier, Session};
use crate::error::Error;
use crate::ports::{Authenticator, Sleeper, Transport};
use crate::retry::RateLimitedClient;

pub const RESOLVE_HANDLE: &str = "com.atproto.identity.resolveHandle";

#[derive(Debug, Deserialize)]
struct ResolveHandleResponse {
    did: Option<String>,
}

/// Maps a derived handle to the DID of the account that owns it.
///
/// Every terminal non-success answer is a miss, so a single bad handle
/// never stops the batch. Only fatal client errors are returned as `Err`.
pub struct HandleResolver<T, A, S>
where
    T: Transport,
    A: Authenticator,
    S: Sleeper,
{
    client: Arc<RateLimitedClient<T, A, S>>,
}

impl<T, A, S> HandleResolver<T, A, S>
where
    T: Transport,
    A: Authenticator,
    S: Sleeper,
{
    pub fn new(client: Arc<RateLimitedClient<T, A, S>>) -> Self {
        Self { client }
    }

    #[instrument(skip(self, handle, session), fields(handle = %handle))]
    pub async fn resolve(
        &self,
        handle: &DerivedIdentifier,
        session: &mut Session,
    ) -> Result<Option<AccountId>, Error> {
        let request = ApiRequest::get(RESOLVE_HANDLE).with_query("handle", handle.as_str());
        let response = self.client.execute(&request, session).await?;

        if !response.is_success() {
            debug!(status = response.status, "handle did not resolve");
            return Ok(None);
        }

        match serde_json::from_str::<ResolveHandleResponse>(&response.body) {
            Ok(parsed) => Ok(parsed.did.filter(|did| !did.is_empty()).map(AccountId::new)),
            Err(e) => {
                debug!(error = %e, "unreadable resolve response");
                Ok(None)
            }
        }
    }
}
