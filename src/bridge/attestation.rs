// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed-message (VAA) lookup for submitted transfers.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::http::{join_url, HttpFetch};

/// Default public attestation API (Wormholescan).
pub const DEFAULT_ATTESTATION_API_BASE_URL: &str = "https://api.wormholescan.io";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttestationError {
    /// Worth polling again.
    #[error("attestation lookup failed: {0}")]
    Transient(String),

    /// Polling again will not help.
    #[error("attestation service rejected the lookup: {0}")]
    Rejected(String),
}

/// Source of signed attestations keyed by (wormhole chain id, tx hash, sequence).
#[async_trait]
pub trait AttestationSource: Send + Sync {
    /// `Ok(None)` while the attestation is not yet available.
    async fn fetch(
        &self,
        wormhole_chain_id: u16,
        tx_hash: &str,
        sequence: u64,
    ) -> Result<Option<String>, AttestationError>;
}

/// HTTP attestation client: `GET {base}/api/v1/vaas/{chain}/{tx}/{sequence}`.
pub struct HttpAttestationSource {
    http: Arc<dyn HttpFetch>,
    base_url: String,
}

impl HttpAttestationSource {
    pub fn new(http: Arc<dyn HttpFetch>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AttestationSource for HttpAttestationSource {
    async fn fetch(
        &self,
        wormhole_chain_id: u16,
        tx_hash: &str,
        sequence: u64,
    ) -> Result<Option<String>, AttestationError> {
        let url = join_url(
            &self.base_url,
            &format!("api/v1/vaas/{wormhole_chain_id}/{tx_hash}/{sequence}"),
        );

        let response = self
            .http
            .get(&url)
            .await
            .map_err(|e| AttestationError::Transient(e.to_string()))?;

        match response.status {
            404 => {
                debug!(wormhole_chain_id, tx_hash, sequence, "Attestation not yet available");
                Ok(None)
            }
            429 | 500..=599 => Err(AttestationError::Transient(format!(
                "HTTP {}",
                response.status
            ))),
            status if !response.is_success() => {
                Err(AttestationError::Rejected(format!("HTTP {status}")))
            }
            _ => {
                let json: Value = serde_json::from_str(&response.body)
                    .map_err(|e| AttestationError::Rejected(format!("malformed body: {e}")))?;
                Ok(extract_vaa(&json))
            }
        }
    }
}

/// Read `vaa` from the top level or from `data`.
fn extract_vaa(json: &Value) -> Option<String> {
    json.pointer("/vaa")
        .or_else(|| json.pointer("/data/vaa"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
