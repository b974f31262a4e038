//! In-memory port implementations shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::StatusMap;
use crate::entities::{
    AccountId, ApiRequest, ApiResponse, Credentials, OutcomeRecord, Session, SourceRecord,
};
use crate::error::Error;
use crate::ports::{Authenticator, OutcomeSink, RecordSource, Sleeper, Transport};
use crate::retry::{RateLimitedClient, RetryPolicy};

pub const OWN_DID: &str = "did:plc:me";
pub const PAUSE: Duration = Duration::from_secs(600);

pub type TestClient<T> = RateLimitedClient<T, CountingAuthenticator, RecordingSleeper>;

pub fn credentials() -> Credentials {
    Credentials::new("me.bsky.social".to_string(), "app-password".to_string())
}

pub fn session(token: &str) -> Session {
    Session {
        token: token.to_string(),
        own_account_id: AccountId::new(OWN_DID),
    }
}

pub fn client_with<T: Transport>(
    transport: T,
) -> (
    TestClient<T>,
    Arc<T>,
    Arc<CountingAuthenticator>,
    Arc<RecordingSleeper>,
) {
    let transport = Arc::new(transport);
    let auth = Arc::new(CountingAuthenticator::accepting());
    let sleeper = Arc::new(RecordingSleeper::default());
    let client = RateLimitedClient::new(
        transport.clone(),
        auth.clone(),
        sleeper.clone(),
        credentials(),
        RetryPolicy::new(StatusMap::default(), PAUSE),
    );
    (client, transport, auth, sleeper)
}

/// Issues `token-1`, `token-2`, ... or rejects every attempt
pub struct CountingAuthenticator {
    calls: AtomicUsize,
    accept: bool,
}

impl CountingAuthenticator {
    pub fn accepting() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            accept: true,
        }
    }

    pub fn rejecting() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            accept: false,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for CountingAuthenticator {
    async fn authenticate(&self, _credentials: &Credentials) -> Result<Session, Error> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.accept {
            Ok(session(&format!("token-{}", n)))
        } else {
            Err(Error::Authentication {
                status: 401,
                body: "{\"error\":\"AuthenticationRequired\"}".to_string(),
            })
        }
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}

/// Replays a fixed list of responses, then fails
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<ApiResponse, String>>>,
    requests: Mutex<Vec<(ApiRequest, String)>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<ApiResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from(vec![Err(message.to_string())])),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, token)| token.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest, token: &str) -> Result<ApiResponse, Error> {
        self.requests
            .lock()
            .unwrap()
            .push((request.clone(), token.to_string()));
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(Error::Network(message)),
            None => Err(Error::Network("script exhausted".to_string())),
        }
    }
}

/// Answers each request with a closure, for batch-level tests
pub struct HandlerTransport<F>
where
    F: Fn(&ApiRequest) -> Result<ApiResponse, Error> + Send + Sync,
{
    handler: F,
    calls: AtomicUsize,
}

impl<F> HandlerTransport<F>
where
    F: Fn(&ApiRequest) -> Result<ApiResponse, Error> + Send + Sync,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F> Transport for HandlerTransport<F>
where
    F: Fn(&ApiRequest) -> Result<ApiResponse, Error> + Send + Sync,
{
    async fn send(&self, request: &ApiRequest, _token: &str) -> Result<ApiResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.handler)(request)
    }
}

pub struct VecSource(pub Vec<SourceRecord>);

impl VecSource {
    pub fn of(identifiers: &[&str]) -> Self {
        Self(identifiers.iter().map(|id| SourceRecord::new(*id)).collect())
    }
}

#[async_trait]
impl RecordSource for VecSource {
    async fn load_records(&self) -> Result<Vec<SourceRecord>, Error> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
pub struct MemorySink {
    written: Mutex<Option<Vec<OutcomeRecord>>>,
}

impl MemorySink {
    pub fn written(&self) -> Option<Vec<OutcomeRecord>> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutcomeSink for MemorySink {
    async fn write_outcomes(&self, outcomes: &[OutcomeRecord]) -> Result<(), Error> {
        *self.written.lock().unwrap() = Some(outcomes.to_vec());
        Ok(())
    }
}

/// Rejects every write as if the disk were full
#[derive(Default)]
pub struct FailingSink {
    attempts: AtomicUsize,
}

impl FailingSink {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OutcomeSink for FailingSink {
    async fn write_outcomes(&self, _outcomes: &[OutcomeRecord]) -> Result<(), Error> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(Error::Io(std::io::Error::other("disk full")))
    }
}
