//! Watcher polling the explorer validators API.
//!
//! Every tick, walks the configured validator set in order; for each
//! validator it fetches account info, validator state, and the delegator
//! count concurrently, then projects the decoded fields into the metric
//! registry. A failed fetch leaves its series at the previous value; the
//! next tick retries all three.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::api::types::{AccountInfo, DelegatorCount, ValidatorInfo};
use crate::api::{ApiClient, ApiError};
use crate::metrics::{MetricsRegistry, bool_to_f64};
use crate::types::TrackedValidator;

/// Error returned when a poll round fails for one validator.
///
/// Carries the first fetch failure observed; the remaining fetches still
/// ran to completion and published on their own if they succeeded.
#[derive(Debug)]
pub struct PollError {
    /// Account address of the validator whose poll failed.
    pub validator: String,
    /// The first fetch failure, in account, validator, delegators order.
    pub source: ApiError,
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "poll failed for validator {}: {}", self.validator, self.source)
    }
}

impl std::error::Error for PollError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Watcher that polls the explorer API for every tracked validator.
pub struct ValidatorsApiWatcher {
    metrics: Arc<MetricsRegistry>,
    validators: Vec<TrackedValidator>,
    api: ApiClient,
    interval: Duration,
}

impl ValidatorsApiWatcher {
    /// Constructs a watcher over the given validator set.
    pub fn new(
        metrics: Arc<MetricsRegistry>,
        validators: Vec<TrackedValidator>,
        api: ApiClient,
        interval: Duration,
    ) -> Self {
        Self {
            metrics,
            validators,
            api,
            interval,
        }
    }

    /// Runs the poll loop until `shutdown` is cancelled.
    ///
    /// The first round starts immediately; subsequent rounds follow one
    /// tick apart. An overrunning round delays the next tick's work but
    /// rounds never overlap. Cancellation is honoured during the tick
    /// wait and at every validator boundary within a round.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = time::interval(self.interval);
        info!(
            validators = self.validators.len(),
            interval_ms = self.interval.as_millis() as u64,
            "validators API watcher started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.poll_round(&shutdown).await;
        }

        info!("validators API watcher stopped");
    }

    /// Polls every validator once, sequentially in configuration order.
    ///
    /// A failed validator is logged and the round moves on to the next
    /// one; only cancellation stops the round early.
    async fn poll_round(&self, shutdown: &CancellationToken) {
        for validator in &self.validators {
            if shutdown.is_cancelled() {
                return;
            }
            if let Err(e) = self.poll_validator(shutdown, validator).await {
                error!(validator = %e.validator, error = %e.source, "validator poll failed");
            }
        }
    }

    /// Polls one validator: the three endpoint fetches start together and
    /// are all joined before returning. Each successful fetch publishes
    /// its own fields even when a sibling fetch fails.
    async fn poll_validator(
        &self,
        shutdown: &CancellationToken,
        validator: &TrackedValidator,
    ) -> Result<(), PollError> {
        debug!(validator = %validator.account, "polling validator");

        let (account, info, delegators) = tokio::join!(
            self.fetch_account(shutdown, validator),
            self.fetch_validator(shutdown, validator),
            self.fetch_delegators(shutdown, validator),
        );

        account
            .and(info)
            .and(delegators)
            .map_err(|source| PollError {
                validator: validator.account.clone(),
                source,
            })
    }

    async fn fetch_account(
        &self,
        shutdown: &CancellationToken,
        validator: &TrackedValidator,
    ) -> Result<(), ApiError> {
        let account = match self.api.account(shutdown, &validator.account).await {
            Ok(account) => account,
            Err(e) => {
                error!(validator = %validator.account, error = %e, "failed to fetch account info");
                return Err(e);
            }
        };

        debug!(
            validator = %validator.account,
            available = account.balance.available,
            "fetched account info"
        );
        self.publish_account(validator, &account);
        Ok(())
    }

    async fn fetch_validator(
        &self,
        shutdown: &CancellationToken,
        validator: &TrackedValidator,
    ) -> Result<(), ApiError> {
        let info = match self.api.validator(shutdown, &validator.operator_address).await {
            Ok(info) => info,
            Err(e) => {
                error!(validator = %validator.account, error = %e, "failed to fetch validator info");
                return Err(e);
            }
        };

        debug!(
            validator = %validator.account,
            status = info.status,
            tokens = info.tokens,
            "fetched validator info"
        );
        self.publish_validator(validator, &info);
        Ok(())
    }

    async fn fetch_delegators(
        &self,
        shutdown: &CancellationToken,
        validator: &TrackedValidator,
    ) -> Result<(), ApiError> {
        let delegators = match self.api.delegators(shutdown, &validator.operator_address).await {
            Ok(delegators) => delegators,
            Err(e) => {
                error!(validator = %validator.account, error = %e, "failed to fetch delegator info");
                return Err(e);
            }
        };

        self.publish_delegators(validator, &delegators);
        Ok(())
    }

    fn publish_account(&self, validator: &TrackedValidator, account: &AccountInfo) {
        let m = &self.metrics.validator_api;
        let labels = validator.label_values();
        let balance = &account.balance;

        m.balance_available
            .with_label_values(&labels)
            .set(balance.available as f64);
        m.balance_commission
            .with_label_values(&labels)
            .set(balance.commission as f64);
        m.balance_delegated
            .with_label_values(&labels)
            .set(balance.delegated as f64);
        m.balance_reward
            .with_label_values(&labels)
            .set(balance.reward as f64);
        m.balance_unbonding
            .with_label_values(&labels)
            .set(balance.unbonding as f64);
    }

    fn publish_validator(&self, validator: &TrackedValidator, info: &ValidatorInfo) {
        let m = &self.metrics.validator_api;
        let labels = validator.label_values();

        m.status.with_label_values(&labels).set(info.status as f64);
        m.tokens.with_label_values(&labels).set(info.tokens as f64);
        m.commission_rate
            .with_label_values(&labels)
            .set(parse_f64_or_zero(&info.commission.commission_rates.rate));
        m.delegator_shares
            .with_label_values(&labels)
            .set(parse_f64_or_zero(&info.delegator_shares));
        m.unbonding_time
            .with_label_values(&labels)
            .set(epoch_seconds(info.unbonding_time));
        m.min_self_delegation
            .with_label_values(&labels)
            .set(parse_f64_or_zero(&info.min_self_delegation));

        let participation = &info.participation;
        m.participation_rate
            .with_label_values(&labels)
            .set(participation.rate as f64);
        m.participation_total
            .with_label_values(&labels)
            .set(participation.total as f64);
        m.participation_voted
            .with_label_values(&labels)
            .set(participation.voted as f64);

        let signing = &info.signing_info;
        m.signing_info_bonded_height
            .with_label_values(&labels)
            .set(signing.bonded_height as f64);
        m.signing_info_tombstoned
            .with_label_values(&labels)
            .set(bool_to_f64(signing.tombstoned));

        let historical = &info.uptime.historical_uptime;
        m.uptime_historical_earliest_height
            .with_label_values(&labels)
            .set(historical.earliest_height as f64);
        m.uptime_historical_last_sync_height
            .with_label_values(&labels)
            .set(historical.last_sync_height as f64);
        m.uptime_historical_success_blocks
            .with_label_values(&labels)
            .set(historical.success_blocks as f64);

        let window = &info.uptime.window_uptime;
        m.uptime_window_uptime
            .with_label_values(&labels)
            .set(window.uptime);
        m.uptime_window_start
            .with_label_values(&labels)
            .set(window.window_start as f64);
        m.uptime_window_end
            .with_label_values(&labels)
            .set(window.window_end as f64);

        m.voting_power_percent
            .with_label_values(&labels)
            .set(info.voting_power_percent);
        m.cumulative_share
            .with_label_values(&labels)
            .set(info.cumulative_share);
    }

    fn publish_delegators(&self, validator: &TrackedValidator, delegators: &DelegatorCount) {
        self.metrics
            .validator_api
            .delegators
            .with_label_values(&validator.label_values())
            .set(delegators.validator_delegators as f64);
    }
}

/// Best-effort float parse for string-encoded decimal fields.
///
/// Unparseable input publishes as 0 rather than failing the fetch; a bad
/// sub-field degrades alone while the rest of the response still lands.
fn parse_f64_or_zero(value: &str) -> f64 {
    value.parse().unwrap_or(0.0)
}

/// Projects an optional timestamp as seconds since the Unix epoch, 0 when
/// absent.
fn epoch_seconds(timestamp: Option<DateTime<Utc>>) -> f64 {
    timestamp.map_or(0.0, |t| t.timestamp() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use chrono::TimeZone;
    use httpmock::{Method::GET, Mock, MockServer};
    use prometheus::GaugeVec;
    use serde_json::json;

    const LABELS: [&str; 2] = ["storyvaloper1test", "kiln"];
    const POLL: Duration = Duration::from_millis(50);

    fn test_registry() -> Arc<MetricsRegistry> {
        Arc::new(MetricsRegistry::new(None).expect("create metrics registry"))
    }

    fn test_validator() -> TrackedValidator {
        TrackedValidator::new("story1test", "storyvaloper1test", "kiln")
    }

    fn watcher_for(
        server: &MockServer,
        metrics: Arc<MetricsRegistry>,
        validators: Vec<TrackedValidator>,
        interval: Duration,
    ) -> ValidatorsApiWatcher {
        let cfg = ApiConfig {
            base_url: server.base_url(),
            timeout: Duration::from_secs(2),
        };
        let api = ApiClient::new(&cfg).expect("build API client");
        ValidatorsApiWatcher::new(metrics, validators, api, interval)
    }

    fn value(vec: &GaugeVec) -> f64 {
        vec.with_label_values(&LABELS).get()
    }

    fn account_json() -> serde_json::Value {
        json!({
            "address": "story1test",
            "balance": {
                "available": 1000,
                "vesting": 0,
                "delegated": 250,
                "unbonding": 10,
                "reward": 75,
                "commission": 50
            },
            "assets": [
                { "denom": "IP", "amount": "1335.75" }
            ]
        })
    }

    fn validator_json() -> serde_json::Value {
        json!({
            "status": 3,
            "tokens": 4200000,
            "delegator_shares": "4200000.5",
            "unbonding_time": "2024-06-01T00:00:00Z",
            "commission": {
                "commission_rates": {
                    "rate": "0.1",
                    "max_rate": "0.2",
                    "max_change_rate": "0.01"
                },
                "update_time": "2024-01-15T12:00:00Z"
            },
            "min_self_delegation": "1",
            "participation": { "rate": 98, "total": 120, "voted": 117 },
            "signingInfo": {
                "bondedHeight": 1024,
                "jailedUntil": "1970-01-01T00:00:00Z",
                "tombstoned": false
            },
            "uptime": {
                "historicalUptime": {
                    "earliestHeight": 1000,
                    "lastSyncHeight": 99000,
                    "successBlocks": 97500
                },
                "windowUptime": { "uptime": 0.995, "windowStart": 90000, "windowEnd": 99000 }
            },
            "votingPowerPercent": 0.0421,
            "cumulativeShare": 0.37
        })
    }

    fn delegators_json() -> serde_json::Value {
        json!({ "validatorDelegators": 321 })
    }

    async fn mock_endpoints<'a>(
        server: &'a MockServer,
        validator: &TrackedValidator,
        validator_body: serde_json::Value,
    ) -> (Mock<'a>, Mock<'a>, Mock<'a>) {
        let account_path = format!("/accounts/{}", validator.account);
        let validator_path = format!("/validators/{}", validator.operator_address);
        let delegators_path = format!("{validator_path}/delegators");

        let account = server
            .mock_async(move |when, then| {
                when.method(GET).path(account_path);
                then.status(200).json_body(account_json());
            })
            .await;
        let validator = server
            .mock_async(move |when, then| {
                when.method(GET).path(validator_path);
                then.status(200).json_body(validator_body);
            })
            .await;
        let delegators = server
            .mock_async(move |when, then| {
                when.method(GET).path(delegators_path);
                then.status(200).json_body(delegators_json());
            })
            .await;

        (account, validator, delegators)
    }

    #[test]
    fn parse_f64_or_zero_degrades_bad_input() {
        assert_eq!(parse_f64_or_zero("1335.75"), 1335.75);
        assert_eq!(parse_f64_or_zero("not-a-number"), 0.0);
        assert_eq!(parse_f64_or_zero(""), 0.0);
    }

    #[test]
    fn epoch_seconds_handles_missing_timestamps() {
        assert_eq!(epoch_seconds(None), 0.0);
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(epoch_seconds(Some(ts)), 1_717_200_000.0);
    }

    #[tokio::test]
    async fn one_poll_projects_every_fixture_field() {
        let server = MockServer::start_async().await;
        mock_endpoints(&server, &test_validator(), validator_json()).await;

        let metrics = test_registry();
        let watcher = watcher_for(&server, metrics.clone(), vec![test_validator()], POLL);
        let shutdown = CancellationToken::new();

        watcher
            .poll_validator(&shutdown, &test_validator())
            .await
            .expect("poll should succeed");

        let api = &metrics.validator_api;
        assert_eq!(value(&api.balance_available), 1000.0);
        assert_eq!(value(&api.balance_commission), 50.0);
        assert_eq!(value(&api.balance_delegated), 250.0);
        assert_eq!(value(&api.balance_reward), 75.0);
        assert_eq!(value(&api.balance_unbonding), 10.0);
        assert_eq!(value(&api.delegators), 321.0);
        assert_eq!(value(&api.status), 3.0);
        assert_eq!(value(&api.tokens), 4_200_000.0);
        assert_eq!(value(&api.commission_rate), 0.1);
        assert_eq!(value(&api.delegator_shares), 4_200_000.5);
        assert_eq!(value(&api.unbonding_time), 1_717_200_000.0);
        assert_eq!(value(&api.min_self_delegation), 1.0);
        assert_eq!(value(&api.participation_rate), 98.0);
        assert_eq!(value(&api.participation_total), 120.0);
        assert_eq!(value(&api.participation_voted), 117.0);
        assert_eq!(value(&api.signing_info_bonded_height), 1024.0);
        assert_eq!(value(&api.signing_info_tombstoned), 0.0);
        assert_eq!(value(&api.uptime_historical_earliest_height), 1000.0);
        assert_eq!(value(&api.uptime_historical_last_sync_height), 99_000.0);
        assert_eq!(value(&api.uptime_historical_success_blocks), 97_500.0);
        assert_eq!(value(&api.uptime_window_uptime), 0.995);
        assert_eq!(value(&api.uptime_window_start), 90_000.0);
        assert_eq!(value(&api.uptime_window_end), 99_000.0);
        assert_eq!(value(&api.voting_power_percent), 0.0421);
        assert_eq!(value(&api.cumulative_share), 0.37);
    }

    #[tokio::test]
    async fn polling_twice_with_identical_fixtures_is_idempotent() {
        let server = MockServer::start_async().await;
        let (account, validator, delegators) =
            mock_endpoints(&server, &test_validator(), validator_json()).await;

        let metrics = test_registry();
        let watcher = watcher_for(&server, metrics.clone(), vec![test_validator()], POLL);
        let shutdown = CancellationToken::new();

        for _ in 0..2 {
            watcher
                .poll_validator(&shutdown, &test_validator())
                .await
                .expect("poll should succeed");
        }

        let api = &metrics.validator_api;
        assert_eq!(value(&api.balance_available), 1000.0);
        assert_eq!(value(&api.delegators), 321.0);
        assert_eq!(value(&api.tokens), 4_200_000.0);
        assert_eq!(account.hits_async().await, 2);
        assert_eq!(validator.hits_async().await, 2);
        assert_eq!(delegators.hits_async().await, 2);
    }

    #[tokio::test]
    async fn failed_delegators_fetch_leaves_its_series_stale() {
        let server = MockServer::start_async().await;
        let validator = test_validator();
        server
            .mock_async(|when, then| {
                when.method(GET).path("/accounts/story1test");
                then.status(200).json_body(account_json());
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/validators/storyvaloper1test");
                then.status(200).json_body(validator_json());
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/validators/storyvaloper1test/delegators");
                then.status(500);
            })
            .await;

        let metrics = test_registry();
        // Value from an earlier successful poll.
        metrics
            .validator_api
            .delegators
            .with_label_values(&LABELS)
            .set(7.0);

        let watcher = watcher_for(&server, metrics.clone(), vec![validator.clone()], POLL);
        let shutdown = CancellationToken::new();
        let err = watcher
            .poll_validator(&shutdown, &validator)
            .await
            .expect_err("poll should report the failed fetch");

        assert_eq!(err.validator, "story1test");
        match err.source {
            ApiError::Status { status, .. } => assert_eq!(status.as_u16(), 500),
            other => panic!("unexpected error: {other:?}"),
        }

        let api = &metrics.validator_api;
        assert_eq!(value(&api.delegators), 7.0);
        assert_eq!(value(&api.balance_available), 1000.0);
        assert_eq!(value(&api.status), 3.0);
    }

    #[tokio::test]
    async fn unparseable_decimal_degrades_that_field_to_zero() {
        let server = MockServer::start_async().await;
        let mut body = validator_json();
        body["delegator_shares"] = json!("not-a-number");
        mock_endpoints(&server, &test_validator(), body).await;

        let metrics = test_registry();
        let watcher = watcher_for(&server, metrics.clone(), vec![test_validator()], POLL);
        let shutdown = CancellationToken::new();

        watcher
            .poll_validator(&shutdown, &test_validator())
            .await
            .expect("a bad decimal string must not fail the fetch");

        let api = &metrics.validator_api;
        assert_eq!(value(&api.delegator_shares), 0.0);
        assert_eq!(value(&api.tokens), 4_200_000.0);
        assert_eq!(value(&api.commission_rate), 0.1);
    }

    #[tokio::test]
    async fn completion_order_does_not_change_the_final_state() {
        for delay_delegators in [false, true] {
            let server = MockServer::start_async().await;
            server
                .mock_async(move |when, then| {
                    when.method(GET).path("/accounts/story1test");
                    let then = then.status(200).json_body(account_json());
                    if !delay_delegators {
                        then.delay(Duration::from_millis(80));
                    }
                })
                .await;
            server
                .mock_async(|when, then| {
                    when.method(GET).path("/validators/storyvaloper1test");
                    then.status(200).json_body(validator_json());
                })
                .await;
            server
                .mock_async(move |when, then| {
                    when.method(GET)
                        .path("/validators/storyvaloper1test/delegators");
                    let then = then.status(200).json_body(delegators_json());
                    if delay_delegators {
                        then.delay(Duration::from_millis(80));
                    }
                })
                .await;

            let metrics = test_registry();
            let watcher = watcher_for(&server, metrics.clone(), vec![test_validator()], POLL);
            let shutdown = CancellationToken::new();

            watcher
                .poll_validator(&shutdown, &test_validator())
                .await
                .expect("poll should succeed");

            let api = &metrics.validator_api;
            assert_eq!(value(&api.balance_available), 1000.0);
            assert_eq!(value(&api.delegators), 321.0);
            assert_eq!(value(&api.tokens), 4_200_000.0);
        }
    }

    #[tokio::test]
    async fn a_round_polls_every_validator() {
        let server = MockServer::start_async().await;
        let first = test_validator();
        let second = TrackedValidator::new("story1other", "storyvaloper1other", "backup");
        let (first_account, ..) = mock_endpoints(&server, &first, validator_json()).await;
        let (second_account, ..) = mock_endpoints(&server, &second, validator_json()).await;

        let metrics = test_registry();
        let watcher = watcher_for(
            &server,
            metrics.clone(),
            vec![first.clone(), second.clone()],
            POLL,
        );
        let shutdown = CancellationToken::new();

        watcher.poll_round(&shutdown).await;

        let api = &metrics.validator_api;
        assert_eq!(value(&api.status), 3.0);
        assert_eq!(
            api.status
                .with_label_values(&["storyvaloper1other", "backup"])
                .get(),
            3.0
        );
        assert_eq!(first_account.hits_async().await, 1);
        assert_eq!(second_account.hits_async().await, 1);
    }

    #[tokio::test]
    async fn already_cancelled_token_stops_the_scheduler_before_any_request() {
        let server = MockServer::start_async().await;
        let (account, validator, delegators) =
            mock_endpoints(&server, &test_validator(), validator_json()).await;

        let metrics = test_registry();
        let watcher = watcher_for(&server, metrics, vec![test_validator()], POLL);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        time::timeout(Duration::from_secs(1), watcher.run(shutdown))
            .await
            .expect("watcher should stop immediately");

        assert_eq!(account.hits_async().await, 0);
        assert_eq!(validator.hits_async().await, 0);
        assert_eq!(delegators.hits_async().await, 0);
    }

    #[tokio::test]
    async fn cancellation_between_ticks_stops_the_next_round() {
        let server = MockServer::start_async().await;
        let (account, validator, delegators) =
            mock_endpoints(&server, &test_validator(), validator_json()).await;

        let metrics = test_registry();
        let watcher = watcher_for(
            &server,
            metrics,
            vec![test_validator()],
            Duration::from_millis(300),
        );
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { watcher.run(shutdown).await }
        });

        // Let the immediate first round finish, then cancel well before
        // the second tick fires.
        time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();
        time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("watcher should stop after cancellation")
            .expect("watcher task should not panic");

        assert_eq!(account.hits_async().await, 1);
        assert_eq!(validator.hits_async().await, 1);
        assert_eq!(delegators.hits_async().await, 1);

        // Nothing further lands once the watcher has stopped.
        time::sleep(Duration::from_millis(400)).await;
        assert_eq!(account.hits_async().await, 1);
    }

    #[tokio::test]
    async fn minimal_balance_fixture_projects_available_and_commission() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/accounts/story1test");
                then.status(200)
                    .json_body(json!({ "balance": { "available": 1000, "commission": 50 } }));
            })
            .await;

        let metrics = test_registry();
        let watcher = watcher_for(&server, metrics.clone(), vec![test_validator()], POLL);
        let shutdown = CancellationToken::new();

        watcher
            .fetch_account(&shutdown, &test_validator())
            .await
            .expect("account fetch should succeed");

        let api = &metrics.validator_api;
        assert_eq!(value(&api.balance_available), 1000.0);
        assert_eq!(value(&api.balance_commission), 50.0);
        assert_eq!(value(&api.balance_delegated), 0.0);
    }
}
