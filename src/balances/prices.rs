// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token price lookup.
//!
//! Prices come from an optional external price API and are cached in an LRU
//! with a per-entry TTL. Anything the API does not answer resolves through a
//! built-in fallback table, and unknown tokens price at zero.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lru::LruCache;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::http::{join_url, HttpFetch};

pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
pub const USDT_MINT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";
pub const BONK_MINT: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";
pub const JUP_MINT: &str = "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN";

const DEFAULT_CACHE_CAPACITY: usize = 256;
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Built-in USD price for well-known tokens.
pub fn fallback_price(token_id: &str) -> Option<Decimal> {
    match token_id {
        SOL_MINT => Some(Decimal::new(100, 0)),
        USDC_MINT | USDT_MINT => Some(Decimal::ONE),
        BONK_MINT => Some(Decimal::new(1, 5)),
        JUP_MINT => Some(Decimal::new(5, 1)),
        _ => None,
    }
}

struct CachedPrice {
    price: Decimal,
    inserted_at: Instant,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[serde(default)]
    data: HashMap<String, Option<PriceEntry>>,
}

#[derive(Debug, Deserialize)]
struct PriceEntry {
    price: Option<PriceValue>,
}

/// Price APIs disagree on number vs string encoding.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceValue {
    Number(f64),
    Text(String),
}

impl PriceValue {
    fn to_decimal(&self) -> Option<Decimal> {
        match self {
            PriceValue::Number(n) => Decimal::from_f64(*n),
            PriceValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Resolves token ids to USD prices. Never fails.
pub struct PriceSource {
    http: Arc<dyn HttpFetch>,
    base_url: Option<String>,
    cache: Mutex<LruCache<String, CachedPrice>>,
    ttl: Duration,
}

impl PriceSource {
    /// A price source that only consults the fallback table.
    pub fn fallback_only(http: Arc<dyn HttpFetch>) -> Self {
        Self::new(http, None)
    }

    pub fn new(http: Arc<dyn HttpFetch>, base_url: Option<String>) -> Self {
        Self::with_cache(http, base_url, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL)
    }

    pub fn with_cache(
        http: Arc<dyn HttpFetch>,
        base_url: Option<String>,
        capacity: usize,
        ttl: Duration,
    ) -> Self {
        Self {
            http,
            base_url,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Price every id in `token_ids`. Every input id is present in the result.
    pub async fn price_for(&self, token_ids: &[String]) -> HashMap<String, Decimal> {
        let mut prices = HashMap::with_capacity(token_ids.len());
        let mut misses = Vec::new();

        for id in token_ids {
            match self.cached(id) {
                Some(price) => {
                    prices.insert(id.clone(), price);
                }
                None if !misses.contains(id) => misses.push(id.clone()),
                None => {}
            }
        }

        if let Some(base_url) = &self.base_url {
            if !misses.is_empty() {
                for (id, price) in self.fetch_remote(base_url, &misses).await {
                    self.store(&id, price);
                    prices.insert(id, price);
                }
            }
        }

        for id in misses {
            prices
                .entry(id)
                .or_insert_with_key(|id| fallback_price(id).unwrap_or(Decimal::ZERO));
        }

        prices
    }

    fn cached(&self, token_id: &str) -> Option<Decimal> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(token_id) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.price);
            }
            cache.pop(token_id);
        }
        None
    }

    fn store(&self, token_id: &str, price: Decimal) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                token_id.to_string(),
                CachedPrice {
                    price,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    async fn fetch_remote(&self, base_url: &str, ids: &[String]) -> HashMap<String, Decimal> {
        let url = format!("{}?ids={}", join_url(base_url, "price"), ids.join(","));

        let response = match self.http.get(&url).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                warn!(status = response.status, "Price API returned non-success status");
                return HashMap::new();
            }
            Err(e) => {
                warn!(error = %e, "Price API request failed");
                return HashMap::new();
            }
        };

        let parsed: PriceResponse = match serde_json::from_str(&response.body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Price API returned malformed body");
                return HashMap::new();
            }
        };

        let prices: HashMap<String, Decimal> = parsed
            .data
            .into_iter()
            .filter_map(|(id, entry)| {
                let price = entry?.price?.to_decimal()?;
                Some((id, price))
            })
            .collect();

        debug!(requested = ids.len(), priced = prices.len(), "Fetched token prices");
        prices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{ok, status, ScriptedFetch};

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn fallback_table_covers_known_tokens() {
        let http = Arc::new(ScriptedFetch::always(ok("{}")));
        let source = PriceSource::fallback_only(http.clone());

        let prices = source
            .price_for(&ids(&[SOL_MINT, USDC_MINT, BONK_MINT, JUP_MINT, "unknown"]))
            .await;

        assert_eq!(prices[SOL_MINT], Decimal::new(100, 0));
        assert_eq!(prices[USDC_MINT], Decimal::ONE);
        assert_eq!(prices[BONK_MINT], Decimal::new(1, 5));
        assert_eq!(prices[JUP_MINT], Decimal::new(5, 1));
        assert_eq!(prices["unknown"], Decimal::ZERO);
        assert_eq!(http.call_count(), 0);
    }

    #[tokio::test]
    async fn remote_prices_override_fallback() {
        let body = format!(r#"{{"data":{{"{SOL_MINT}":{{"id":"{SOL_MINT}","price":"142.5"}},"mintX":{{"price":2.25}}}}}}"#);
        let http = Arc::new(ScriptedFetch::always(ok(&body)));
        let source = PriceSource::new(http.clone(), Some("https://prices.example/v2".into()));

        let prices = source.price_for(&ids(&[SOL_MINT, "mintX", USDC_MINT])).await;

        assert_eq!(prices[SOL_MINT], Decimal::new(1425, 1));
        assert_eq!(prices["mintX"], Decimal::new(225, 2));
        assert_eq!(prices[USDC_MINT], Decimal::ONE);
        assert!(http.urls()[0].starts_with("https://prices.example/v2/price?ids="));
    }

    #[tokio::test]
    async fn api_failure_degrades_to_fallback() {
        let http = Arc::new(ScriptedFetch::always(status(500, "")));
        let source = PriceSource::new(http, Some("https://prices.example".into()));

        let prices = source.price_for(&ids(&[SOL_MINT])).await;
        assert_eq!(prices[SOL_MINT], Decimal::new(100, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn cached_prices_expire_after_ttl() {
        let http = Arc::new(ScriptedFetch::always(ok(r#"{"data":{"m":{"price":3}}}"#)));
        let source = PriceSource::with_cache(
            http.clone(),
            Some("https://prices.example".into()),
            8,
            Duration::from_secs(60),
        );

        source.price_for(&ids(&["m"])).await;
        source.price_for(&ids(&["m"])).await;
        assert_eq!(http.call_count(), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        let prices = source.price_for(&ids(&["m"])).await;
        assert_eq!(http.call_count(), 2);
        assert_eq!(prices["m"], Decimal::new(3, 0));
    }
}
