// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound HTTP seam shared by the balance, price and attestation clients.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failure (connect, timeout, body read).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Minimal GET capability. Non-2xx statuses are returned, not raised.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// [`HttpFetch`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestFetch {
    http: Client,
}

impl ReqwestFetch {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetch {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| TransportError(format!("GET {url} failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(format!("GET {url} body read failed: {e}")))?;

        Ok(HttpResponse { status, body })
    }
}

/// Join a base URL and a path segment without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_normalises_slashes() {
        assert_eq!(join_url("https://a.example/", "/b"), "https://a.example/b");
        assert_eq!(join_url("https://a.example", "b/c"), "https://a.example/b/c");
    }

    #[test]
    fn success_range_is_2xx() {
        let ok = HttpResponse { status: 204, body: String::new() };
        let limited = HttpResponse { status: 429, body: String::new() };
        assert!(ok.is_success());
        assert!(!limited.is_success());
    }
}
