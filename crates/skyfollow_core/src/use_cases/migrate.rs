use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Pacing;
use crate::entities::{DerivedIdentifier, MigrationProgress, OutcomeRecord, Session, SourceRecord};
use crate::error::{Error, MigrationAborted};
use crate::ports::{Authenticator, OutcomeSink, RecordSource, Sleeper, Transport};
use crate::retry::RateLimitedClient;

use super::{FollowExecutor, HandleResolver};

/// Orchestrates the follow migration:
/// - Initial authentication
/// - Per-item derive, resolve and follow
/// - Inter-item pacing and the periodic throttle
/// - Hand-off of the outcome list to the sink
pub struct MigrateUseCase<T, A, S>
where
    T: Transport,
    A: Authenticator,
    S: Sleeper,
{
    client: Arc<RateLimitedClient<T, A, S>>,
    resolver: HandleResolver<T, A, S>,
    follower: FollowExecutor<T, A, S>,
    sleeper: Arc<S>,
    identifier_suffix: String,
    pacing: Pacing,
}

impl<T, A, S> MigrateUseCase<T, A, S>
where
    T: Transport,
    A: Authenticator,
    S: Sleeper,
{
    pub fn new(
        client: Arc<RateLimitedClient<T, A, S>>,
        sleeper: Arc<S>,
        identifier_suffix: String,
        pacing: Pacing,
    ) -> Self {
        Self {
            resolver: HandleResolver::new(client.clone()),
            follower: FollowExecutor::new(client.clone()),
            client,
            sleeper,
            identifier_suffix,
            pacing,
        }
    }

    /// Load the input, run the batch and write the outcomes.
    ///
    /// If the batch is aborted after some items were processed, those
    /// outcomes are still written before the error is returned. Nothing is
    /// written when the initial authentication fails. A failing sink returns
    /// the complete outcome list inside the error.
    pub async fn execute<R, O, F>(
        &self,
        source: &R,
        sink: &O,
        progress: F,
    ) -> Result<Vec<OutcomeRecord>, MigrationAborted>
    where
        R: RecordSource,
        O: OutcomeSink,
        F: Fn(MigrationProgress) + Send + Sync,
    {
        let records = source.load_records().await?;
        info!(count = records.len(), "loaded source records");

        match self.run(&records, progress).await {
            Ok(outcomes) => match sink.write_outcomes(&outcomes).await {
                Ok(()) => Ok(outcomes),
                Err(source) => {
                    warn!(error = %source, "failed to write outcomes");
                    Err(MigrationAborted { outcomes, source })
                }
            },
            Err(aborted) => {
                if !aborted.outcomes.is_empty() {
                    if let Err(e) = sink.write_outcomes(&aborted.outcomes).await {
                        warn!(error = %e, "failed to write partial outcomes");
                    }
                }
                Err(aborted)
            }
        }
    }

    /// Process `records` in order, producing one outcome per record.
    pub async fn run<F>(
        &self,
        records: &[SourceRecord],
        progress: F,
    ) -> Result<Vec<OutcomeRecord>, MigrationAborted>
    where
        F: Fn(MigrationProgress) + Send + Sync,
    {
        let mut session = self.client.authenticate().await?;
        let mut outcomes = Vec::with_capacity(records.len());
        let total = records.len();

        for (i, record) in records.iter().enumerate() {
            let index = i + 1;

            let outcome = match self.process(record, &mut session).await {
                Ok(outcome) => outcome,
                Err(source) => {
                    warn!(
                        index,
                        source_identifier = %record.source_identifier,
                        error = %source,
                        "aborting migration"
                    );
                    return Err(MigrationAborted { outcomes, source });
                }
            };

            outcomes.push(outcome.clone());
            progress(MigrationProgress {
                index,
                total,
                outcome,
            });

            self.sleeper.sleep(self.pacing.inter_item_delay).await;

            if self.pacing.is_throttle_point(index) {
                info!(
                    index,
                    pause_secs = self.pacing.rate_limit_pause.as_secs(),
                    "periodic throttle, pausing"
                );
                self.sleeper.sleep(self.pacing.rate_limit_pause).await;
            }
        }

        info!(count = outcomes.len(), "migration completed");
        Ok(outcomes)
    }

    async fn process(
        &self,
        record: &SourceRecord,
        session: &mut Session,
    ) -> Result<OutcomeRecord, Error> {
        let derived = DerivedIdentifier::derive(record, &self.identifier_suffix);

        let Some(target) = self.resolver.resolve(&derived, session).await? else {
            info!(
                source_identifier = %record.source_identifier,
                "no matching account"
            );
            return Ok(OutcomeRecord::not_found(&record.source_identifier));
        };

        let own = session.own_account_id.clone();
        let result = self.follower.follow(&own, &target, session).await?;

        if result.success {
            info!(handle = %derived, "followed");
        } else {
            warn!(handle = %derived, message = %result.message, "follow failed");
        }

        Ok(OutcomeRecord::from_follow(
            &record.source_identifier,
            &derived,
            result,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::config::StatusMap;
    use crate::entities::{ApiRequest, ApiResponse};
    use crate::retry::RetryPolicy;
    use crate::testing::{
        credentials, CountingAuthenticator, FailingSink, HandlerTransport, MemorySink,
        RecordingSleeper, VecSource, PAUSE,
    };
    use crate::use_cases::{CREATE_RECORD, RESOLVE_HANDLE};

    const DELAY: Duration = Duration::from_secs(1);

    fn pacing(every: usize) -> Pacing {
        Pacing {
            inter_item_delay: DELAY,
            rate_limit_pause: PAUSE,
            periodic_throttle_every: every,
        }
    }

    /// Resolves `<name>.example.net` to `did:<name>` unless the name starts
    /// with "missing"; follows succeed unless the target is `did:blocked`.
    fn directory(request: &ApiRequest) -> Result<ApiResponse, Error> {
        match request.endpoint {
            RESOLVE_HANDLE => {
                let handle = &request.query[0].1;
                let name = handle.trim_end_matches(".example.net");
                if name.starts_with("missing") {
                    Ok(ApiResponse::new(
                        400,
                        r#"{"error":"InvalidRequest","message":"Unable to resolve handle"}"#,
                    ))
                } else {
                    Ok(ApiResponse::new(200, format!(r#"{{"did":"did:{}"}}"#, name)))
                }
            }
            CREATE_RECORD => {
                let body = request.body.as_ref().expect("follow has a body");
                if body["record"]["subject"] == "did:blocked" {
                    Ok(ApiResponse::new(400, "blocked"))
                } else {
                    Ok(ApiResponse::new(200, "{}"))
                }
            }
            other => panic!("unexpected endpoint {}", other),
        }
    }

    type DirectoryTransport = HandlerTransport<fn(&ApiRequest) -> Result<ApiResponse, Error>>;

    struct Harness<T: Transport> {
        use_case: MigrateUseCase<T, CountingAuthenticator, RecordingSleeper>,
        transport: Arc<T>,
        auth: Arc<CountingAuthenticator>,
        sleeper: Arc<RecordingSleeper>,
    }

    fn harness_with<T: Transport>(
        transport: T,
        auth: CountingAuthenticator,
        every: usize,
    ) -> Harness<T> {
        let transport = Arc::new(transport);
        let auth = Arc::new(auth);
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = Arc::new(RateLimitedClient::new(
            transport.clone(),
            auth.clone(),
            sleeper.clone(),
            credentials(),
            RetryPolicy::new(StatusMap::default(), PAUSE),
        ));
        Harness {
            use_case: MigrateUseCase::new(
                client,
                sleeper.clone(),
                ".example.net".to_string(),
                pacing(every),
            ),
            transport,
            auth,
            sleeper,
        }
    }

    fn harness(every: usize) -> Harness<DirectoryTransport> {
        harness_with(
            HandlerTransport::new(directory as fn(&ApiRequest) -> Result<ApiResponse, Error>),
            CountingAuthenticator::accepting(),
            every,
        )
    }

    fn records(names: &[&str]) -> Vec<SourceRecord> {
        names.iter().map(|name| SourceRecord::new(*name)).collect()
    }

    #[tokio::test]
    async fn test_resolved_and_followed() {
        let h = harness(3000);

        let outcomes = h.use_case.run(&records(&["alice"]), |_| {}).await.unwrap();

        assert_eq!(
            outcomes,
            vec![OutcomeRecord {
                source_identifier: "alice".to_string(),
                derived_identifier: "alice.example.net".to_string(),
                followed: true,
                message: "Success".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_unresolved_records_no_match() {
        let h = harness(3000);

        let outcomes = h
            .use_case
            .run(&records(&["missing-bob"]), |_| {})
            .await
            .unwrap();

        assert_eq!(
            outcomes,
            vec![OutcomeRecord {
                source_identifier: "missing-bob".to_string(),
                derived_identifier: String::new(),
                followed: false,
                message: "No matching account".to_string(),
            }]
        );
        // Only the lookup was sent
        assert_eq!(h.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_follow_failure_is_recorded() {
        let h = harness(3000);

        let outcomes = h.use_case.run(&records(&["blocked"]), |_| {}).await.unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].followed);
        assert_eq!(outcomes[0].derived_identifier, "blocked.example.net");
        assert_eq!(outcomes[0].message, "blocked");
    }

    #[tokio::test]
    async fn test_one_outcome_per_record_in_order() {
        let h = harness(3000);
        let names = ["a", "missing-b", "c", "blocked", "missing-e", "f"];

        let outcomes = h.use_case.run(&records(&names), |_| {}).await.unwrap();

        assert_eq!(outcomes.len(), names.len());
        for (outcome, name) in outcomes.iter().zip(names) {
            assert_eq!(outcome.source_identifier, name);
        }
        assert_eq!(
            outcomes.iter().filter(|o| o.followed).count(),
            3,
            "a, c and f are followed"
        );
        assert_eq!(h.auth.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_input_still_authenticates() {
        let h = harness(3000);

        let outcomes = h.use_case.run(&[], |_| {}).await.unwrap();

        assert!(outcomes.is_empty());
        assert_eq!(h.auth.calls(), 1);
        assert!(h.sleeper.pauses().is_empty());
    }

    #[tokio::test]
    async fn test_inter_item_delay_after_every_item() {
        let h = harness(3000);

        h.use_case
            .run(&records(&["a", "b", "c"]), |_| {})
            .await
            .unwrap();

        assert_eq!(h.sleeper.pauses(), vec![DELAY, DELAY, DELAY]);
    }

    #[tokio::test]
    async fn test_periodic_throttle_at_threshold_only() {
        let h = harness(3000);
        let names: Vec<String> = (1..=3001).map(|i| format!("user{}", i)).collect();
        let input: Vec<SourceRecord> = names.iter().map(SourceRecord::new).collect();

        let seen = Mutex::new(Vec::new());
        h.use_case
            .run(&input, |p| {
                seen.lock().unwrap().push(p.index);
            })
            .await
            .unwrap();

        let pauses = h.sleeper.pauses();
        assert_eq!(pauses.iter().filter(|d| **d == PAUSE).count(), 1);
        // One delay per item, the long pause directly after item 3000
        assert_eq!(pauses.len(), 3002);
        assert_eq!(pauses[2999], DELAY);
        assert_eq!(pauses[3000], PAUSE);
        assert_eq!(pauses[3001], DELAY);
        assert_eq!(seen.lock().unwrap().len(), 3001);
    }

    #[tokio::test]
    async fn test_periodic_throttle_with_small_threshold() {
        let h = harness(2);

        h.use_case
            .run(&records(&["a", "b", "c", "d", "e"]), |_| {})
            .await
            .unwrap();

        assert_eq!(
            h.sleeper.pauses(),
            vec![DELAY, DELAY, PAUSE, DELAY, DELAY, PAUSE, DELAY]
        );
    }

    #[tokio::test]
    async fn test_initial_authentication_failure_produces_nothing() {
        let h = harness_with(
            HandlerTransport::new(directory as fn(&ApiRequest) -> Result<ApiResponse, Error>),
            CountingAuthenticator::rejecting(),
            3000,
        );
        let sink = MemorySink::default();

        let result = h
            .use_case
            .execute(&VecSource::of(&["alice", "bob"]), &sink, |_| {})
            .await;

        let aborted = result.unwrap_err();
        assert!(aborted.outcomes.is_empty());
        assert!(matches!(aborted.source, Error::Authentication { .. }));
        assert_eq!(h.transport.calls(), 0);
        assert!(sink.written().is_none());
    }

    #[tokio::test]
    async fn test_network_failure_keeps_completed_outcomes() {
        let transport = HandlerTransport::new(|request: &ApiRequest| {
            if request.query.first().map(|(_, v)| v.as_str()) == Some("down.example.net") {
                Err(Error::Network("connection reset".to_string()))
            } else {
                directory(request)
            }
        });
        let h = harness_with(transport, CountingAuthenticator::accepting(), 3000);
        let sink = MemorySink::default();

        let aborted = h
            .use_case
            .execute(&VecSource::of(&["alice", "down", "carol"]), &sink, |_| {})
            .await
            .unwrap_err();

        assert!(matches!(aborted.source, Error::Network(_)));
        assert_eq!(aborted.outcomes.len(), 1);
        assert_eq!(sink.written().unwrap(), aborted.outcomes);
    }

    #[tokio::test]
    async fn test_execute_writes_all_outcomes() {
        let h = harness(3000);
        let sink = MemorySink::default();

        let outcomes = h
            .use_case
            .execute(&VecSource::of(&["alice", "missing-bob"]), &sink, |_| {})
            .await
            .unwrap();

        assert_eq!(sink.written().unwrap(), outcomes);
        assert_eq!(outcomes.len(), 2);
    }

    #[tokio::test]
    async fn test_sink_failure_returns_every_outcome() {
        let h = harness(3000);
        let sink = FailingSink::default();

        let aborted = h
            .use_case
            .execute(&VecSource::of(&["alice", "bob", "carol"]), &sink, |_| {})
            .await
            .unwrap_err();

        assert!(matches!(aborted.source, Error::Io(_)));
        assert_eq!(aborted.outcomes.len(), 3);
        assert!(aborted.outcomes.iter().all(|o| o.followed));
        assert_eq!(sink.attempts(), 1);
        assert_eq!(
            aborted.to_string(),
            "migration aborted after 3 items: io error: disk full"
        );
    }

    #[tokio::test]
    async fn test_expired_session_mid_batch_is_replaced() {
        let expired_once = Mutex::new(false);
        let transport = HandlerTransport::new(move |request: &ApiRequest| {
            let mut expired = expired_once.lock().unwrap();
            if request.endpoint == CREATE_RECORD && !*expired {
                *expired = true;
                return Ok(ApiResponse::new(401, r#"{"error":"ExpiredToken"}"#));
            }
            directory(request)
        });
        let h = harness_with(transport, CountingAuthenticator::accepting(), 3000);

        let outcomes = h
            .use_case
            .run(&records(&["alice", "bob"]), |_| {})
            .await
            .unwrap();

        assert!(outcomes.iter().all(|o| o.followed));
        // Initial session plus one replacement
        assert_eq!(h.auth.calls(), 2);
    }
}
