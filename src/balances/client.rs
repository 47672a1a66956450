// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Balance Fetch Client
//!
//! Queries the upstream balance API for tracked addresses.
//!
//! ## Rate limiting
//!
//! Consecutive outbound calls from one client are spaced by at least
//! `min_interval` (default 1500 ms). The last-call marker sits behind a fair
//! async mutex that is held for the whole call, so concurrent callers are
//! serviced one at a time in the order they arrived.
//!
//! ## Retry
//!
//! HTTP 429 and transport errors are retried up to `max_attempts` total
//! attempts, sleeping `2^attempt × backoff_base` between them (attempt starts
//! at 1, so 4 s then 8 s with the defaults).
//!
//! ## Failure
//!
//! `fetch_balances` never fails. Any degraded outcome is logged, recorded in
//! [`BalanceFetchClient::last_failure`], and reported as an empty list.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::prices::PriceSource;
use super::types::{AddressBalance, BalanceResponseBody, UpstreamFailure, ValuationResult};
use super::valuation::{valuate, AllocationSplit};
use crate::http::{join_url, HttpFetch};

/// Default upstream: Jupiter Ultra balances.
pub const DEFAULT_BALANCE_API_BASE_URL: &str = "https://lite-api.jup.ag/ultra/v1/balances";

/// Spacing and retry parameters for [`BalanceFetchClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub min_interval: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(1500),
            max_attempts: 3,
            backoff_base: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    /// Sleep after a failed `attempt` (1-based) before the next one.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt)
    }
}

pub struct BalanceFetchClient {
    http: Arc<dyn HttpFetch>,
    base_url: String,
    policy: RetryPolicy,
    prices: PriceSource,
    last_call: Mutex<Option<Instant>>,
    last_failure: StdMutex<Option<UpstreamFailure>>,
}

impl BalanceFetchClient {
    pub fn new(http: Arc<dyn HttpFetch>, base_url: impl Into<String>, prices: PriceSource) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            policy: RetryPolicy::default(),
            prices,
            last_call: Mutex::new(None),
            last_failure: StdMutex::new(None),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Outcome of the most recent fetch: `None` after a success.
    pub fn last_failure(&self) -> Option<UpstreamFailure> {
        self.last_failure.lock().ok().and_then(|f| f.clone())
    }

    /// Fetch the balances held by `address`. Degrades to an empty list.
    pub async fn fetch_balances(&self, address: &str) -> Vec<AddressBalance> {
        self.fetch_balances_reporting(address).await.0
    }

    /// Like [`fetch_balances`](Self::fetch_balances), also returning this
    /// call's own failure rather than whatever the last caller recorded.
    pub async fn fetch_balances_reporting(
        &self,
        address: &str,
    ) -> (Vec<AddressBalance>, Option<UpstreamFailure>) {
        let address = address.trim();
        if address.is_empty() {
            warn!("Balance fetch skipped for empty address");
            let failure = UpstreamFailure::Malformed("empty address".to_string());
            self.record(Some(failure.clone()));
            return (Vec::new(), Some(failure));
        }

        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.policy.min_interval {
                let wait = self.policy.min_interval - elapsed;
                debug!(address, wait_ms = wait.as_millis() as u64, "Spacing balance request");
                tokio::time::sleep(wait).await;
            }
        }
        *last_call = Some(Instant::now());

        let url = join_url(&self.base_url, address);
        let outcome = self.request_with_retry(address, &url).await;
        drop(last_call);

        match outcome {
            Ok(balances) => {
                info!(address, count = balances.len(), "Fetched balances");
                self.record(None);
                (balances, None)
            }
            Err(failure) => {
                warn!(address, error = %failure, "Balance fetch degraded to empty result");
                self.record(Some(failure.clone()));
                (Vec::new(), Some(failure))
            }
        }
    }

    /// Prices for `token_ids`; see [`PriceSource::price_for`].
    pub async fn price_for(&self, token_ids: &[String]) -> HashMap<String, Decimal> {
        self.prices.price_for(token_ids).await
    }

    /// Fetch, price and value one address in a single call.
    pub async fn valuate_address(
        &self,
        address: &str,
        split: AllocationSplit,
    ) -> (Vec<AddressBalance>, ValuationResult) {
        let balances = self.fetch_balances(address).await;
        let ids: Vec<String> = balances
            .iter()
            .map(|b| b.mint_or_token_id.clone())
            .collect();
        let prices = self.price_for(&ids).await;
        let valuation = valuate(&balances, &prices, split);
        (balances, valuation)
    }

    async fn request_with_retry(
        &self,
        address: &str,
        url: &str,
    ) -> Result<Vec<AddressBalance>, UpstreamFailure> {
        let mut attempt: u32 = 1;
        loop {
            let failure = match self.http.get(url).await {
                Ok(response) if response.status == 429 => {
                    if attempt >= self.policy.max_attempts {
                        return Err(UpstreamFailure::RateLimited { attempts: attempt });
                    }
                    UpstreamFailure::RateLimited { attempts: attempt }
                }
                Ok(response) if !response.is_success() => {
                    return Err(UpstreamFailure::Status(response.status));
                }
                Ok(response) => {
                    let body: BalanceResponseBody = serde_json::from_str(&response.body)
                        .map_err(|e| UpstreamFailure::Malformed(e.to_string()))?;
                    return body.into_balances();
                }
                Err(e) => {
                    let failure = UpstreamFailure::Transport(e.to_string());
                    if attempt >= self.policy.max_attempts {
                        return Err(failure);
                    }
                    failure
                }
            };

            let backoff = self.policy.backoff(attempt);
            warn!(
                address,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %failure,
                "Balance request failed, retrying"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    fn record(&self, failure: Option<UpstreamFailure>) {
        if let Ok(mut slot) = self.last_failure.lock() {
            *slot = failure;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balances::prices::{SOL_MINT, USDC_MINT};
    use crate::http::testing::{ok, status, ScriptedFetch};
    use crate::http::TransportError;

    const EMPTY: &str = r#"{"balances":[]}"#;

    fn client(http: Arc<ScriptedFetch>) -> BalanceFetchClient {
        let prices = PriceSource::fallback_only(http.clone());
        BalanceFetchClient::new(http, "https://balances.example/v1", prices)
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_calls_are_spaced() {
        let http = Arc::new(ScriptedFetch::always(ok(EMPTY)));
        let client = client(http.clone());

        for address in ["a1", "a2", "a3"] {
            client.fetch_balances(address).await;
        }

        let times = http.call_times();
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(1500));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn no_wait_when_interval_already_elapsed() {
        let http = Arc::new(ScriptedFetch::always(ok(EMPTY)));
        let client = client(http.clone());

        client.fetch_balances("a1").await;
        tokio::time::advance(Duration::from_secs(5)).await;
        let before = Instant::now();
        client.fetch_balances("a2").await;
        assert_eq!(Instant::now() - before, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn three_rate_limits_yield_empty_list() {
        let http = Arc::new(ScriptedFetch::always(status(429, "")));
        let client = client(http.clone());

        let start = Instant::now();
        let balances = client.fetch_balances("addr").await;

        assert!(balances.is_empty());
        assert_eq!(http.call_count(), 3);
        assert_eq!(
            client.last_failure(),
            Some(UpstreamFailure::RateLimited { attempts: 3 })
        );
        // 2^1 × 2 s + 2^2 × 2 s
        assert_eq!(Instant::now() - start, Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_then_success_returns_balances() {
        let body = format!(
            r#"{{"balances":[{{"mint_or_token_id":"{USDC_MINT}","raw_amount":"5000000","decimals":6,"ui_amount":5.0,"frozen":false}}]}}"#
        );
        let http = Arc::new(ScriptedFetch::new(vec![status(429, "")], ok(&body)));
        let client = client(http.clone());

        let balances = client.fetch_balances("addr").await;
        assert_eq!(balances.len(), 1);
        assert_eq!(http.call_count(), 2);
        assert_eq!(client.last_failure(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_are_retried_then_degrade() {
        let http = Arc::new(ScriptedFetch::always(Err(TransportError("reset".into()))));
        let client = client(http.clone());

        assert!(client.fetch_balances("addr").await.is_empty());
        assert_eq!(http.call_count(), 3);
        assert!(matches!(client.last_failure(), Some(UpstreamFailure::Transport(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn server_error_is_not_retried() {
        let http = Arc::new(ScriptedFetch::always(status(503, "")));
        let client = client(http.clone());

        assert!(client.fetch_balances("addr").await.is_empty());
        assert_eq!(http.call_count(), 1);
        assert_eq!(client.last_failure(), Some(UpstreamFailure::Status(503)));
    }

    #[tokio::test(start_paused = true)]
    async fn error_body_and_garbage_degrade() {
        let http = Arc::new(ScriptedFetch::new(
            vec![ok(r#"{"error":"bad address"}"#)],
            ok("not json"),
        ));
        let client = client(http.clone());

        assert!(client.fetch_balances("a").await.is_empty());
        assert!(matches!(client.last_failure(), Some(UpstreamFailure::Upstream(_))));
        assert!(client.fetch_balances("b").await.is_empty());
        assert!(matches!(client.last_failure(), Some(UpstreamFailure::Malformed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn address_is_appended_to_base_url() {
        let http = Arc::new(ScriptedFetch::always(ok(EMPTY)));
        let client = client(http.clone());

        client.fetch_balances(" 7xKXtg ").await;
        assert_eq!(http.urls(), vec!["https://balances.example/v1/7xKXtg".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_serialized() {
        let http = Arc::new(ScriptedFetch::always(ok(EMPTY)));
        let client = Arc::new(client(http.clone()));

        let first = tokio::spawn({
            let client = client.clone();
            async move { client.fetch_balances("first").await }
        });
        tokio::task::yield_now().await;
        let second = tokio::spawn({
            let client = client.clone();
            async move { client.fetch_balances("second").await }
        });
        first.await.unwrap();
        second.await.unwrap();

        let urls = http.urls();
        assert!(urls[0].ends_with("/first"));
        assert!(urls[1].ends_with("/second"));
        let times = http.call_times();
        assert!(times[1] - times[0] >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn valuate_address_prices_with_fallback_table() {
        let body = format!(
            r#"{{"{SOL_MINT}":{{"amount":"2000000000","uiAmount":2.0,"slot":1,"isFrozen":false}}}}"#
        );
        let http = Arc::new(ScriptedFetch::always(ok(&body)));
        let client = client(http);

        let (balances, valuation) = client
            .valuate_address("addr", AllocationSplit::default())
            .await;
        assert_eq!(balances.len(), 1);
        assert_eq!(valuation.total_value, Decimal::new(200, 0));
        assert_eq!(valuation.withdrawable_value, Decimal::new(140, 0));
        assert_eq!(valuation.deposit_value, Decimal::new(60, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_see_their_own_failure() {
        let body = format!(
            r#"{{"{USDC_MINT}":{{"amount":"1000000","uiAmount":1.0,"slot":1,"isFrozen":false}}}}"#
        );
        let http = Arc::new(ScriptedFetch::new(
            vec![ok(r#"{"error":"bad address"}"#)],
            ok(&body),
        ));
        let client = client(http);

        let ((bad, bad_failure), (good, good_failure)) = tokio::join!(
            client.fetch_balances_reporting("a1"),
            client.fetch_balances_reporting("a2"),
        );

        assert!(bad.is_empty());
        assert!(bad_failure.unwrap().to_string().contains("bad address"));
        assert_eq!(good.len(), 1);
        assert!(good_failure.is_none());
        assert!(client.last_failure().is_none());
    }
}
