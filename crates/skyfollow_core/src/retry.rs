use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::StatusMap;
use crate::entities::{ApiRequest, ApiResponse, Credentials, Session};
use crate::error::Error;
use crate::ports::{Authenticator, Sleeper, Transport};

/// How the retry engine treats a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Success or hard failure; handed back to the caller
    Terminal,
    /// Pause, then resend the same request
    RateLimited,
    /// Replace the session, then resend the same request
    Unauthenticated,
}

/// Maps responses to retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    statuses: StatusMap,
    rate_limit_pause: Duration,
}

impl RetryPolicy {
    pub fn new(statuses: StatusMap, rate_limit_pause: Duration) -> Self {
        Self {
            statuses,
            rate_limit_pause,
        }
    }

    pub fn classify(&self, response: &ApiResponse) -> Classification {
        if response.status == self.statuses.rate_limited {
            Classification::RateLimited
        } else if response.status == self.statuses.unauthenticated {
            Classification::Unauthenticated
        } else {
            Classification::Terminal
        }
    }
}

/// Executes requests, absorbing rate limits and expired sessions.
///
/// The loop has no attempt cap: it keeps pausing or re-authenticating for as
/// long as the server keeps answering with a transient status. Transport
/// errors and re-authentication failures end it immediately.
pub struct RateLimitedClient<T, A, S>
where
    T: Transport,
    A: Authenticator,
    S: Sleeper,
{
    transport: Arc<T>,
    authenticator: Arc<A>,
    sleeper: Arc<S>,
    credentials: Credentials,
    policy: RetryPolicy,
}

impl<T, A, S> RateLimitedClient<T, A, S>
where
    T: Transport,
    A: Authenticator,
    S: Sleeper,
{
    pub fn new(
        transport: Arc<T>,
        authenticator: Arc<A>,
        sleeper: Arc<S>,
        credentials: Credentials,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            authenticator,
            sleeper,
            credentials,
            policy,
        }
    }

    /// Create the first session of a run.
    pub async fn authenticate(&self) -> Result<Session, Error> {
        let session = self.authenticator.authenticate(&self.credentials).await?;
        info!(did = %session.own_account_id, "authentication successful");
        Ok(session)
    }

    /// Replace `session` with a freshly created one.
    ///
    /// This is the only place a live session is overwritten.
    pub async fn reauthenticate(&self, session: &mut Session) -> Result<(), Error> {
        *session = self.authenticator.authenticate(&self.credentials).await?;
        debug!(did = %session.own_account_id, "session replaced");
        Ok(())
    }

    /// Send `request` until the server gives a terminal answer.
    pub async fn execute(
        &self,
        request: &ApiRequest,
        session: &mut Session,
    ) -> Result<ApiResponse, Error> {
        loop {
            let response = self.transport.send(request, &session.token).await?;

            match self.policy.classify(&response) {
                Classification::Terminal => return Ok(response),
                Classification::RateLimited => {
                    warn!(
                        endpoint = request.endpoint,
                        pause_secs = self.policy.rate_limit_pause.as_secs(),
                        "rate limit reached, pausing"
                    );
                    self.sleeper.sleep(self.policy.rate_limit_pause).await;
                }
                Classification::Unauthenticated => {
                    info!(endpoint = request.endpoint, "session expired, re-authenticating");
                    self.reauthenticate(session).await?;
                }
            }
        }
    }
}
